//! Session registry: client session → upstream session.
//!
//! # Responsibilities
//! - Create the upstream pairing for a client lazily, exactly once
//! - Share one connect outcome (success or failure) with every waiter
//! - Drop pairings when either leg closes so later activity starts fresh
//!
//! # Pairing States
//! ```text
//! (absent) ──get_or_create──▶ Connecting ──connect ok──▶ Paired
//!     ▲                            │                        │
//!     └──── connect failed ────────┘                        │
//!     └──── release (either leg closed) ◀───────────────────┘
//! ```
//!
//! # Design Decisions
//! - Get-or-insert happens under the map's entry lock, never check-then-act
//! - The connect runs in its own task so it finishes (or times out) even if
//!   every waiter goes away; a result nobody wants any more is closed
//! - Every pairing carries a generation so a late event from an old pairing
//!   cannot tear down a newer one for the same client ID

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::mirror::connector::{ConnectResult, UpstreamConnector};
use crate::mirror::error::ConnectFailure;
use crate::mirror::relay::{CloseHook, UpstreamRelay};
use crate::mirror::session::{SessionHandle, SessionId};

type SharedConnect = Shared<BoxFuture<'static, ConnectResult>>;

/// Registry entry for one client session.
enum Pairing {
    /// Upstream handshake in flight.
    Connecting { generation: u64, ready: SharedConnect },
    /// Both legs open.
    Paired { generation: u64, upstream: Arc<SessionHandle> },
}

impl Pairing {
    fn generation(&self) -> u64 {
        match self {
            Pairing::Connecting { generation, .. } | Pairing::Paired { generation, .. } => *generation,
        }
    }
}

/// Externally observable state of a client's pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingPhase {
    /// No pairing; either never created or already closed.
    Unpaired,
    Connecting,
    Paired,
}

/// Concurrency-safe compute-once map of pairings.
pub struct SessionRegistry {
    pairings: DashMap<SessionId, Pairing>,
    connector: Arc<dyn UpstreamConnector>,
    generations: AtomicU64,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn UpstreamConnector>) -> Self {
        Self {
            pairings: DashMap::new(),
            connector,
            generations: AtomicU64::new(1),
        }
    }

    /// Return the client's upstream session, dialing it if needed.
    ///
    /// Concurrent callers for the same client share one connector
    /// invocation and observe the same result.
    pub async fn get_or_create_upstream(self: &Arc<Self>, client: &Arc<SessionHandle>) -> ConnectResult {
        let ready = match self.pairings.entry(client.id()) {
            Entry::Occupied(entry) => match entry.get() {
                Pairing::Paired { upstream, .. } => return Ok(upstream.clone()),
                Pairing::Connecting { ready, .. } => ready.clone(),
            },
            Entry::Vacant(entry) => {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                let ready = self.spawn_connect(client.clone(), generation);
                entry.insert(Pairing::Connecting {
                    generation,
                    ready: ready.clone(),
                });
                ready
            }
        };
        ready.await
    }

    /// Start the connect task for a new pairing.
    fn spawn_connect(self: &Arc<Self>, client: Arc<SessionHandle>, generation: u64) -> SharedConnect {
        let id = client.id();
        let path = client.path().to_owned();

        let hook: CloseHook = {
            let registry = Arc::downgrade(self);
            Arc::new(move |id| {
                if let Some(registry) = registry.upgrade() {
                    registry.release_generation(id, generation);
                }
            })
        };
        let connecting = self.connector.connect(UpstreamRelay::new(client.clone(), hook));

        let registry = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let result = connecting.await;
            if let Some(registry) = registry.upgrade() {
                registry.settle(&client, generation, &result);
            } else if let Ok(upstream) = &result {
                upstream.close();
            }
            result
        });

        let registry: Weak<Self> = Arc::downgrade(self);
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    if let Some(registry) = registry.upgrade() {
                        registry.release_generation(id, generation);
                    }
                    if e.is_panic() {
                        Err(ConnectFailure::Aborted { path })
                    } else {
                        Err(ConnectFailure::Interrupted { path })
                    }
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Publish a finished connect: Connecting → Paired, or drop the entry.
    fn settle(&self, client: &SessionHandle, generation: u64, result: &ConnectResult) {
        let id = client.id();
        match result {
            Ok(upstream) => {
                let paired = match self.pairings.get_mut(&id) {
                    Some(mut pairing) if pairing.generation() == generation => {
                        *pairing = Pairing::Paired {
                            generation,
                            upstream: upstream.clone(),
                        };
                        true
                    }
                    _ => false,
                };

                // The client may have left while we were dialing.
                if !paired || !client.is_open() {
                    tracing::debug!(session_id = %id, "Closing orphaned upstream session");
                    self.release_generation(id, generation);
                    upstream.close();
                } else {
                    tracing::debug!(session_id = %id, upstream_id = %upstream.id(), "Pairing established");
                }
            }
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "Pairing attempt failed");
                self.release_generation(id, generation);
            }
        }
    }

    /// Remove the client's pairing and close its upstream leg.
    ///
    /// Returns whether a pairing was present. A pairing still connecting is
    /// removed here and its upstream closed once the connect finishes.
    pub fn release(&self, id: SessionId) -> bool {
        match self.pairings.remove(&id) {
            Some((_, pairing)) => {
                Self::close_pairing(id, pairing);
                true
            }
            None => false,
        }
    }

    /// Like [`release`](Self::release), but only if the entry is still the
    /// given generation.
    fn release_generation(&self, id: SessionId, generation: u64) -> bool {
        match self.pairings.remove_if(&id, |_, p| p.generation() == generation) {
            Some((_, pairing)) => {
                Self::close_pairing(id, pairing);
                true
            }
            None => false,
        }
    }

    fn close_pairing(id: SessionId, pairing: Pairing) {
        if let Pairing::Paired { upstream, .. } = pairing {
            upstream.close();
        }
        tracing::debug!(session_id = %id, "Pairing released");
    }

    /// Current phase of a client's pairing.
    pub fn phase(&self, id: SessionId) -> PairingPhase {
        match self.pairings.get(&id).as_deref() {
            Some(Pairing::Connecting { .. }) => PairingPhase::Connecting,
            Some(Pairing::Paired { .. }) => PairingPhase::Paired,
            None => PairingPhase::Unpaired,
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.pairings.contains_key(&id)
    }

    /// Number of live pairings, including those still connecting.
    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }

    /// Release every pairing. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let ids: Vec<SessionId> = self.pairings.iter().map(|entry| *entry.key()).collect();
        ids.into_iter().filter(|id| self.release(*id)).count()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("pairings", &self.pairings.len())
            .finish_non_exhaustive()
    }
}
