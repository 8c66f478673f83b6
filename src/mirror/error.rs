//! Error types for WebSocket mirroring.

use thiserror::Error;

use crate::mirror::session::SessionId;

/// Why a pairing attempt failed.
///
/// Cloneable so every caller waiting on the same connect observes the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectFailure {
    /// Handshake did not complete within the connect timeout.
    #[error("upstream handshake to {url} timed out after {timeout_ms} ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },

    /// Upstream refused the connection or the handshake failed.
    #[error("upstream connection to {url} failed: {reason}")]
    ConnectError { url: String, reason: String },

    /// The connect task panicked before it produced a result.
    #[error("connect to upstream for {path} aborted: connect task panicked")]
    Aborted { path: String },

    /// The connect task was cancelled before it produced a result.
    #[error("connect to upstream for {path} was interrupted")]
    Interrupted { path: String },
}

impl ConnectFailure {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ConnectFailure::ConnectTimeout { .. } => "timeout",
            ConnectFailure::ConnectError { .. } | ConnectFailure::Aborted { .. } => "error",
            ConnectFailure::Interrupted { .. } => "interrupted",
        }
    }
}

/// Errors while relaying frames on an established session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The session was already closed.
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    /// The session's writer has gone away (socket broke).
    #[error("session {0} is no longer writable")]
    Io(SessionId),
}

/// Any failure surfaced by the mirror to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Connect(#[from] ConnectFailure),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;
