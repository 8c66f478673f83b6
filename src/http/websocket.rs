//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete upgrade handshake with client
//! - Run the client leg: reader loop plus outbound writer
//! - Hand frames and lifecycle events to the WebSocket mirror
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - WebSocket handled separately from HTTP request/response
//! - Frame-level forwarding (no message buffering)
//! - Reader stops as soon as the session is closed from the other side
//! - Ping/pong answered locally, never relayed

use axum::body::Body;
use axum::extract::ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use crate::mirror::relay::{drive_outbound, Inbound};
use crate::mirror::{Leg, SessionHandle, WebSocketMirror};
use crate::observability::metrics;

/// Accept a WebSocket upgrade on a mirror path.
///
/// Requests that are not valid upgrades get the extractor's rejection.
pub async fn upgrade(mirror: WebSocketMirror, request: Request<Body>) -> Response {
    let (mut parts, _body) = request.into_parts();
    let path = parts.uri.path().to_owned();

    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => ws.on_upgrade(move |socket| mirror_socket(mirror, socket, path)),
        Err(rejection) => {
            tracing::debug!(path = %path, "Rejected non-upgrade request on WebSocket path");
            rejection.into_response()
        }
    }
}

/// Drive one accepted client socket until either leg closes.
pub async fn mirror_socket(mirror: WebSocketMirror, socket: WebSocket, path: String) {
    let (client, outbound) = SessionHandle::new(Leg::Client, path);
    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(drive_outbound(
        client.clone(),
        outbound,
        sink,
        ClientMessage::Close(None),
    ));
    metrics::record_ws_session_opened();

    if mirror.on_established(&client).await.is_ok() {
        loop {
            let message = tokio::select! {
                message = stream.next() => message,
                _ = client.closed() => break,
            };

            match message.map(|m| m.map(Inbound::from)) {
                Some(Ok(Inbound::Frame(frame))) => {
                    if mirror.on_frame(&client, frame).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Inbound::Control)) => {}
                Some(Ok(Inbound::Close)) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(session_id = %client.id(), error = %e, "Client read failed");
                    break;
                }
            }
        }
    }

    mirror.on_client_closed(&client);
    metrics::record_ws_session_closed();
    let _ = writer.await;
}
