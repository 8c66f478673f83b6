//! Outbound WebSocket connections to the frontend dev server.
//!
//! # Responsibilities
//! - Build the upstream URL from the fixed upstream address and the client path
//! - Dial with a bounded handshake timeout
//! - Start the upstream writer and reader tasks for the new connection
//!
//! # Design Decisions
//! - Connector is a trait so the registry can be driven by in-process fakes
//! - Only the client's path is carried over, not its query string
//! - No retries; one attempt either pairs or fails

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::mirror::error::ConnectFailure;
use crate::mirror::relay::{drive_outbound, UpstreamRelay};
use crate::mirror::session::{Leg, SessionHandle};

/// Result of one connect attempt.
pub type ConnectResult = Result<Arc<SessionHandle>, ConnectFailure>;

/// Opens upstream sessions on behalf of client sessions.
pub trait UpstreamConnector: Send + Sync + 'static {
    /// Dial upstream for `relay.client()` and return the ready upstream session.
    ///
    /// The returned future must be `'static` so it can outlive every caller
    /// waiting on it.
    fn connect(&self, relay: UpstreamRelay) -> BoxFuture<'static, ConnectResult>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base: Url,
    connect_timeout: Duration,
}

impl WsConnector {
    /// Create a connector for the configured upstream.
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, url::ParseError> {
        let base = Url::parse(&upstream.websocket_base())?;
        Ok(Self::from_base(base, Duration::from_millis(timeouts.connect_ms)))
    }

    pub fn from_base(base: Url, connect_timeout: Duration) -> Self {
        Self { base, connect_timeout }
    }

    /// Upstream URL for a client request path.
    pub fn target_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl UpstreamConnector for WsConnector {
    fn connect(&self, relay: UpstreamRelay) -> BoxFuture<'static, ConnectResult> {
        let url = self.target_url(relay.client().path());
        let limit = self.connect_timeout;

        Box::pin(async move {
            tracing::debug!(
                session_id = %relay.client().id(),
                upstream = %url,
                "Dialing upstream WebSocket"
            );

            let (socket, _response) = match tokio::time::timeout(limit, connect_async(url.as_str())).await {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => {
                    return Err(ConnectFailure::ConnectError {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    return Err(ConnectFailure::ConnectTimeout {
                        url: url.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            };

            let (upstream, outbound) = SessionHandle::new(Leg::Upstream, url.path());
            let (sink, stream) = socket.split();

            tokio::spawn(drive_outbound(
                upstream.clone(),
                outbound,
                sink,
                UpstreamMessage::Close(None),
            ));
            tokio::spawn(relay.run(upstream.clone(), stream));

            tracing::debug!(
                session_id = %upstream.id(),
                upstream = %url,
                "Upstream WebSocket connected"
            );
            Ok(upstream)
        })
    }
}
