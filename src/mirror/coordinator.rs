//! Lifecycle coordination for mirrored WebSocket sessions.
//!
//! # Responsibilities
//! - Pair a client with its upstream on connection-established or first frame
//! - Forward client frames to the paired upstream
//! - Close the other leg whenever one leg closes, then deregister
//!
//! # Lifecycle
//! ```text
//! Unpaired → Connecting → Paired → Closing → Closed
//!                 │                             ▲
//!                 └────── connect failed ───────┘
//! ```
//!
//! Upstream-initiated closes arrive through the close hook installed by the
//! registry on every `UpstreamRelay`; client-initiated closes through
//! [`WebSocketMirror::on_client_closed`].

use std::sync::Arc;

use crate::mirror::connector::UpstreamConnector;
use crate::mirror::error::{MirrorError, MirrorResult, RelayError};
use crate::mirror::registry::SessionRegistry;
use crate::mirror::session::{Frame, SessionHandle};
use crate::observability::metrics;

/// Client-facing WebSocket handler.
#[derive(Debug, Clone)]
pub struct WebSocketMirror {
    registry: Arc<SessionRegistry>,
}

impl WebSocketMirror {
    pub fn new(connector: Arc<dyn UpstreamConnector>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(connector)),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// A client connected: dial its upstream right away.
    ///
    /// On failure the client session is closed; it is never left open
    /// without an upstream.
    pub async fn on_established(&self, client: &Arc<SessionHandle>) -> MirrorResult<Arc<SessionHandle>> {
        tracing::debug!(session_id = %client.id(), path = %client.path(), "Mirror WebSocket connection");
        self.pair(client).await
    }

    /// A client sent a frame: relay it verbatim to its upstream.
    pub async fn on_frame(&self, client: &Arc<SessionHandle>, frame: Frame) -> MirrorResult<()> {
        let upstream = self.pair(client).await?;

        tracing::trace!(
            session_id = %client.id(),
            kind = frame.kind(),
            len = frame.len(),
            "WebSocket frame from client to upstream"
        );

        if let Err(e) = upstream.send(frame) {
            tracing::debug!(session_id = %client.id(), error = %e, "Upstream unreachable, tearing down pairing");
            self.on_client_closed(client);
            return Err(e.into());
        }
        metrics::record_frame(metrics::CLIENT_TO_UPSTREAM);
        Ok(())
    }

    /// The client leg ended: close it, close the upstream, deregister.
    pub fn on_client_closed(&self, client: &SessionHandle) {
        let closed_here = client.close();
        let released = self.registry.release(client.id());
        if closed_here || released {
            tracing::debug!(session_id = %client.id(), released, "WebSocket client connection closed");
        }
    }

    async fn pair(&self, client: &Arc<SessionHandle>) -> MirrorResult<Arc<SessionHandle>> {
        if !client.is_open() {
            return Err(RelayError::SessionClosed(client.id()).into());
        }
        match self.registry.get_or_create_upstream(client).await {
            Ok(upstream) => Ok(upstream),
            Err(e) => {
                tracing::warn!(
                    session_id = %client.id(),
                    path = %client.path(),
                    error = %e,
                    "Error establishing WebSocket connection to upstream"
                );
                metrics::record_connect_failure(e.reason());
                self.on_client_closed(client);
                Err(MirrorError::Connect(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::error::ConnectFailure;
    use crate::mirror::registry::tests::{FakeConnector, SharedFake};
    use crate::mirror::registry::PairingPhase;
    use crate::mirror::session::{Leg, Outbound, OutboundRx};
    use axum::body::Bytes;
    use std::time::Duration;

    fn mirror_with(fake: &Arc<FakeConnector>) -> WebSocketMirror {
        WebSocketMirror::new(Arc::new(SharedFake(fake.clone())))
    }

    fn drain(rx: &mut OutboundRx) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn ping_reaches_upstream_as_text() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, _client_rx) = SessionHandle::new(Leg::Client, "/ws");

        let upstream = mirror.on_established(&client).await.unwrap();
        assert_eq!(upstream.path(), "/ws");
        mirror.on_frame(&client, Frame::Text("ping".into())).await.unwrap();

        let (_, mut upstream_rx, _) = fake.take(0);
        assert_eq!(drain(&mut upstream_rx), vec![Outbound::Frame(Frame::Text("ping".into()))]);
    }

    #[tokio::test]
    async fn first_frame_pairs_without_established_event() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, _client_rx) = SessionHandle::new(Leg::Client, "/sockjs-node");

        let payload = Bytes::from_static(&[0, 159, 146, 150]);
        mirror.on_frame(&client, Frame::Binary(payload.clone())).await.unwrap();

        assert_eq!(fake.calls(), 1);
        let (_, mut upstream_rx, _) = fake.take(0);
        assert_eq!(drain(&mut upstream_rx), vec![Outbound::Frame(Frame::Binary(payload))]);
    }

    #[tokio::test]
    async fn frames_keep_their_order() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, _client_rx) = SessionHandle::new(Leg::Client, "/ws");

        for i in 0..100 {
            mirror.on_frame(&client, Frame::Text(i.to_string().into())).await.unwrap();
        }

        let (_, mut upstream_rx, _) = fake.take(0);
        let expected: Vec<Outbound> = (0..100).map(|i| Outbound::Frame(Frame::Text(i.to_string().into()))).collect();
        assert_eq!(drain(&mut upstream_rx), expected);
    }

    #[tokio::test]
    async fn client_close_closes_upstream_exactly_once() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, _client_rx) = SessionHandle::new(Leg::Client, "/ws");

        let upstream = mirror.on_established(&client).await.unwrap();
        mirror.on_client_closed(&client);
        mirror.on_client_closed(&client);

        assert!(!upstream.is_open());
        assert_eq!(mirror.registry().phase(client.id()), PairingPhase::Unpaired);

        let (_, mut upstream_rx, relay) = fake.take(0);
        // The upstream reader noticing its own close must not close anything twice.
        relay.finish();
        assert_eq!(drain(&mut upstream_rx), vec![Outbound::Close]);
    }

    #[tokio::test]
    async fn upstream_close_closes_client_exactly_once() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, mut client_rx) = SessionHandle::new(Leg::Client, "/ws");

        mirror.on_established(&client).await.unwrap();
        let (upstream, _upstream_rx, relay) = fake.take(0);

        upstream.close();
        relay.finish();
        // Client reader then sees its socket end.
        mirror.on_client_closed(&client);

        assert!(!client.is_open());
        assert_eq!(drain(&mut client_rx), vec![Outbound::Close]);
        assert!(mirror.registry().is_empty());
    }

    #[tokio::test]
    async fn upstream_frames_go_to_their_own_client() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (a, mut a_rx) = SessionHandle::new(Leg::Client, "/ws");
        let (b, mut b_rx) = SessionHandle::new(Leg::Client, "/ws");

        mirror.on_established(&a).await.unwrap();
        mirror.on_established(&b).await.unwrap();
        let (_, _, relay_a) = fake.take(0);
        let (_, _, relay_b) = fake.take(0);

        relay_a.deliver(Frame::Text("for a".into())).unwrap();
        relay_b.deliver(Frame::Text("for b".into())).unwrap();

        assert_eq!(drain(&mut a_rx), vec![Outbound::Frame(Frame::Text("for a".into()))]);
        assert_eq!(drain(&mut b_rx), vec![Outbound::Frame(Frame::Text("for b".into()))]);
    }

    #[tokio::test]
    async fn connect_failure_closes_client() {
        let failure = ConnectFailure::ConnectTimeout {
            url: "ws://localhost:3000/ws".into(),
            timeout_ms: 1000,
        };
        let fake = FakeConnector::failing(failure.clone());
        let mirror = mirror_with(&fake);
        let (client, mut client_rx) = SessionHandle::new(Leg::Client, "/ws");

        let err = mirror.on_established(&client).await.unwrap_err();
        assert_eq!(err, MirrorError::Connect(failure));
        assert!(!client.is_open());
        assert_eq!(drain(&mut client_rx), vec![Outbound::Close]);
        assert_eq!(mirror.registry().phase(client.id()), PairingPhase::Unpaired);

        // A closed client never silently pairs later.
        let err = mirror.on_frame(&client, Frame::Text("late".into())).await.unwrap_err();
        assert_eq!(err, MirrorError::Relay(RelayError::SessionClosed(client.id())));
        assert_eq!(fake.calls(), 1);
        assert!(mirror.registry().is_empty());
    }

    #[tokio::test]
    async fn broken_upstream_tears_down_pairing() {
        let fake = FakeConnector::new(Duration::ZERO);
        let mirror = mirror_with(&fake);
        let (client, mut client_rx) = SessionHandle::new(Leg::Client, "/ws");

        mirror.on_established(&client).await.unwrap();
        // Dropping the queue simulates a dead upstream writer.
        let (upstream, upstream_rx, _) = fake.take(0);
        drop(upstream_rx);

        let err = mirror.on_frame(&client, Frame::Text("x".into())).await.unwrap_err();
        assert_eq!(err, MirrorError::Relay(RelayError::Io(upstream.id())));
        assert!(!client.is_open());
        assert_eq!(drain(&mut client_rx), vec![Outbound::Close]);
        assert!(mirror.registry().is_empty());
    }
}
