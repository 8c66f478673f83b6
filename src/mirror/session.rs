//! Session handles shared by both legs of a pairing.
//!
//! # Responsibilities
//! - Allocate process-unique session IDs for tracing and registry keys
//! - Represent a single WebSocket frame as it is relayed
//! - Expose the session operations the relay needs (`id`, `path`, `send`,
//!   `close`, `is_open`) independent of the transport behind them
//!
//! # Design Decisions
//! - Sends never block: frames go into an unbounded queue drained by the
//!   session's writer task, so queue order is wire order
//! - `close` is guarded by a single-shot flag; only the first call enqueues a
//!   close frame, every later call is a no-op
//! - The handle does not own the socket, the transport layer does

use axum::body::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::mirror::error::RelayError;

/// Global counter for session IDs. Relaxed is enough, we only need uniqueness.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next session ID.
    pub fn next() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

/// A single data frame. Payloads are carried untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl Frame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame type label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }
}

/// Which side of a pairing a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Connection accepted from a browser or tool.
    Client,
    /// Connection dialed to the frontend dev server.
    Upstream,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Client => f.write_str("client"),
            Leg::Upstream => f.write_str("upstream"),
        }
    }
}

/// Work item for a session's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Frame),
    Close,
}

/// Receiving end of a session's outbound queue, owned by its writer task.
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// One leg of a pairing.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    leg: Leg,
    path: String,
    open: AtomicBool,
    closed: watch::Sender<bool>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl SessionHandle {
    /// Create an open session and the queue its writer task must drain.
    pub fn new(leg: Leg, path: impl Into<String>) -> (Arc<Self>, OutboundRx) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let handle = Arc::new(Self {
            id: SessionId::next(),
            leg,
            path: path.into(),
            open: AtomicBool::new(true),
            closed,
            outbound,
        });
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    /// Request path this session was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue a frame for delivery on this session.
    pub fn send(&self, frame: Frame) -> Result<(), RelayError> {
        if !self.is_open() {
            return Err(RelayError::SessionClosed(self.id));
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| RelayError::Io(self.id))
    }

    /// Close the session.
    ///
    /// Returns `true` only for the call that actually performed the close.
    pub fn close(&self) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }
        // The writer may already be gone if the socket broke first.
        let _ = self.outbound.send(Outbound::Close);
        self.closed.send_replace(true);
        tracing::debug!(
            session_id = %self.id,
            leg = %self.leg,
            path = %self.path,
            "Session closed"
        );
        true
    }

    /// Resolve once the session has been closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("ws-"));
    }

    #[test]
    fn send_queues_frames_in_order() {
        let (session, mut rx) = SessionHandle::new(Leg::Client, "/ws");
        session.send(Frame::Text("one".into())).unwrap();
        session.send(Frame::Binary(Bytes::from_static(&[0, 1, 2]))).unwrap();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Frame(Frame::Text("one".into())));
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Frame(Frame::Binary(Bytes::from_static(&[0, 1, 2])))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_is_single_shot() {
        let (session, mut rx) = SessionHandle::new(Leg::Upstream, "/ws");
        assert!(session.close());
        assert!(!session.close());
        assert!(!session.is_open());

        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_close_is_rejected() {
        let (session, _rx) = SessionHandle::new(Leg::Client, "/ws");
        session.close();
        let err = session.send(Frame::Text("late".into())).unwrap_err();
        assert!(matches!(err, RelayError::SessionClosed(id) if id == session.id()));
    }

    #[test]
    fn send_without_writer_is_io_error() {
        let (session, rx) = SessionHandle::new(Leg::Client, "/ws");
        drop(rx);
        let err = session.send(Frame::Text("lost".into())).unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let (session, _rx) = SessionHandle::new(Leg::Client, "/ws");
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.closed().await })
        };
        session.close();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("closed() should resolve")
            .unwrap();
    }
}
