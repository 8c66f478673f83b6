//! Frame relay between the two legs of a pairing.
//!
//! # Data Flow
//! ```text
//! client socket ──▶ client reader ──▶ upstream.send() ──▶ upstream writer ──▶ upstream socket
//! upstream socket ──▶ UpstreamRelay ──▶ client.send() ──▶ client writer ──▶ client socket
//! ```
//!
//! # Design Decisions
//! - Text stays text and binary stays binary; payloads are never inspected
//! - Ping/pong are answered by each transport and not forwarded
//! - A close or read error on either leg ends that leg's reader, which hands
//!   off to the lifecycle hooks

use axum::body::Bytes;
use axum::extract::ws::{Message as ClientMessage, Utf8Bytes as ClientText};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::{Message as UpstreamMessage, Utf8Bytes};

use crate::mirror::error::RelayError;
use crate::mirror::session::{Frame, Outbound, OutboundRx, SessionHandle, SessionId};
use crate::observability::metrics;

/// What a reader saw on the wire, reduced to what the relay cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    Control,
    Close,
}

impl From<ClientMessage> for Inbound {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Text(text) => Inbound::Frame(Frame::Text(from_client_text(text))),
            ClientMessage::Binary(data) => Inbound::Frame(Frame::Binary(data)),
            ClientMessage::Ping(_) | ClientMessage::Pong(_) => Inbound::Control,
            ClientMessage::Close(_) => Inbound::Close,
        }
    }
}

impl From<UpstreamMessage> for Inbound {
    fn from(msg: UpstreamMessage) -> Self {
        match msg {
            UpstreamMessage::Text(text) => Inbound::Frame(Frame::Text(text)),
            UpstreamMessage::Binary(data) => Inbound::Frame(Frame::Binary(data)),
            UpstreamMessage::Ping(_) | UpstreamMessage::Pong(_) | UpstreamMessage::Frame(_) => {
                Inbound::Control
            }
            UpstreamMessage::Close(_) => Inbound::Close,
        }
    }
}

impl From<Frame> for ClientMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => ClientMessage::Text(to_client_text(text)),
            Frame::Binary(data) => ClientMessage::Binary(data),
        }
    }
}

impl From<Frame> for UpstreamMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => UpstreamMessage::Text(text),
            Frame::Binary(data) => UpstreamMessage::Binary(data),
        }
    }
}

// axum wraps tungstenite's `Utf8Bytes` in its own newtype. Both sides hold
// validated UTF-8, so these hand the shared buffer across; the copying
// fallback is unreachable.
fn from_client_text(text: ClientText) -> Utf8Bytes {
    Utf8Bytes::try_from(Bytes::from(text.clone()))
        .unwrap_or_else(|_| Utf8Bytes::from(text.as_str()))
}

fn to_client_text(text: Utf8Bytes) -> ClientText {
    ClientText::try_from(Bytes::from(text.clone()))
        .unwrap_or_else(|_| ClientText::from(text.as_str()))
}

/// Drain a session's outbound queue into its socket.
///
/// Ends after sending `close_msg`, when the queue closes, or on the first
/// write error. A write error closes the session so the next relay attempt
/// observes it and tears the pairing down.
pub async fn drive_outbound<S, M>(
    session: Arc<SessionHandle>,
    mut outbound: OutboundRx,
    mut sink: S,
    close_msg: M,
) where
    S: Sink<M> + Unpin,
    S::Error: fmt::Display,
    M: From<Frame>,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(e) = sink.send(M::from(frame)).await {
                    tracing::debug!(
                        session_id = %session.id(),
                        leg = %session.leg(),
                        error = %e,
                        "Write failed, closing session"
                    );
                    session.close();
                    break;
                }
            }
            Outbound::Close => {
                // The peer may have closed first; a failed close frame is expected then.
                let _ = sink.send(close_msg).await;
                let _ = sink.close().await;
                break;
            }
        }
    }
}

/// Invoked with the client session ID once the upstream leg has ended.
pub type CloseHook = Arc<dyn Fn(SessionId) + Send + Sync>;

/// Upstream → client half of the relay.
///
/// Bound to exactly one client session when the upstream connection is
/// created; inbound upstream frames are never routed by lookup.
#[derive(Clone)]
pub struct UpstreamRelay {
    client: Arc<SessionHandle>,
    on_closed: CloseHook,
}

impl UpstreamRelay {
    pub fn new(client: Arc<SessionHandle>, on_closed: CloseHook) -> Self {
        Self { client, on_closed }
    }

    /// The client session this relay delivers to.
    pub fn client(&self) -> &Arc<SessionHandle> {
        &self.client
    }

    /// Forward one upstream frame to the client verbatim.
    pub fn deliver(&self, frame: Frame) -> Result<(), RelayError> {
        tracing::trace!(
            session_id = %self.client.id(),
            kind = frame.kind(),
            len = frame.len(),
            "WebSocket frame from upstream to client"
        );
        self.client.send(frame)?;
        metrics::record_frame(metrics::UPSTREAM_TO_CLIENT);
        Ok(())
    }

    /// The upstream leg is gone: close the client and release the pairing.
    pub fn finish(&self) {
        self.client.close();
        (self.on_closed)(self.client.id());
    }

    /// Read the upstream socket until it ends, relaying every data frame.
    pub async fn run<S, M, E>(self, upstream: Arc<SessionHandle>, mut stream: S)
    where
        S: Stream<Item = Result<M, E>> + Unpin,
        Inbound: From<M>,
        E: fmt::Display,
    {
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = upstream.closed() => break,
            };
            match next.map(|r| r.map(Inbound::from)) {
                Some(Ok(Inbound::Frame(frame))) => {
                    if let Err(e) = self.deliver(frame) {
                        tracing::debug!(session_id = %self.client.id(), error = %e, "Client unreachable, dropping upstream");
                        break;
                    }
                }
                Some(Ok(Inbound::Control)) => {}
                Some(Ok(Inbound::Close)) | None => {
                    tracing::debug!(session_id = %self.client.id(), "Upstream closed the connection");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(session_id = %self.client.id(), error = %e, "Upstream read failed");
                    break;
                }
            }
        }
        upstream.close();
        self.finish();
    }
}

impl fmt::Debug for UpstreamRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamRelay")
            .field("client", &self.client.id())
            .finish_non_exhaustive()
    }
}
