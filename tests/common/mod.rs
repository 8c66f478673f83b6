//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use dev_mirror::config::MirrorConfig;
use dev_mirror::{MirrorServer, Shutdown};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Text frame that makes the mock upstream close the connection.
pub const CLOSE_COMMAND: &str = "bye-from-upstream";

/// A frame as the mock upstream saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Text(String),
    Binary(Vec<u8>),
}

/// What the mock WebSocket upstream observed.
#[derive(Debug, Default)]
pub struct WsUpstream {
    next_id: AtomicUsize,
    pub paths: Mutex<Vec<String>>,
    pub received: Mutex<HashMap<usize, Vec<Recorded>>>,
    pub closed: AtomicUsize,
}

impl WsUpstream {
    pub fn connections(&self) -> usize {
        self.paths.lock().unwrap().len()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<Vec<Recorded>> {
        let received = self.received.lock().unwrap();
        let mut ids: Vec<_> = received.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| received[&id].clone()).collect()
    }
}

/// Start an echoing, recording WebSocket upstream on an ephemeral port.
pub async fn start_ws_upstream() -> (SocketAddr, Arc<WsUpstream>) {
    let log = Arc::new(WsUpstream::default());
    let app = Router::new()
        .route("/{*path}", any(ws_handler))
        .with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, log)
}

async fn ws_handler(State(log): State<Arc<WsUpstream>>, uri: Uri, ws: WebSocketUpgrade) -> Response {
    let path = uri.path().to_string();
    ws.on_upgrade(move |socket| echo(log, path, socket))
}

async fn echo(log: Arc<WsUpstream>, path: String, mut socket: WebSocket) {
    let id = log.next_id.fetch_add(1, Ordering::SeqCst);
    log.paths.lock().unwrap().push(path);
    log.received.lock().unwrap().insert(id, Vec::new());

    while let Some(Ok(message)) = socket.recv().await {
        let recorded = match &message {
            Message::Text(text) if text.as_str() == CLOSE_COMMAND => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Message::Text(text) => Recorded::Text(text.as_str().to_string()),
            Message::Binary(data) => Recorded::Binary(data.to_vec()),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        log.received.lock().unwrap().entry(id).or_default().push(recorded);
        if socket.send(message).await.is_err() {
            break;
        }
    }
    log.closed.fetch_add(1, Ordering::SeqCst);
}

/// Start a TCP listener that accepts connections and never answers.
pub async fn start_silent_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held: Vec<TcpStream> = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// A port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Raw requests seen by a mock HTTP backend.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock HTTP backend that records each raw request and returns a
/// fixed status and body.
pub async fn start_http_backend(status: u16, body: &'static str) -> (SocketAddr, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::default();

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let raw = read_request(&mut socket).await;
                        requests.lock().unwrap().push(raw);

                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/javascript\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    (addr, log)
}

/// Read one request: head up to the blank line, then `Content-Length` bytes.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Default config pointed at `127.0.0.1:<upstream_port>`.
pub fn config_for(upstream_port: u16) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.upstream.host = "127.0.0.1".into();
    config.upstream.port = upstream_port;
    config
}

/// Start a mirror on an ephemeral port.
pub async fn start_mirror(config: MirrorConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = MirrorServer::new(&config).unwrap();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    (addr, shutdown)
}

/// Poll `condition` until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
