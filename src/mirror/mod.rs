//! WebSocket mirroring subsystem.
//!
//! # Data Flow
//! ```text
//! client connects (http/websocket.rs)
//!     → coordinator.rs (connection-established)
//!     → registry.rs (get or create the pairing, exactly once per client)
//!     → connector.rs (dial ws://upstream/<same path>, bounded by connect timeout)
//!     → relay.rs (frames both ways, verbatim)
//!
//! either leg closes
//!     → coordinator.rs / relay close hook
//!     → close the other leg (idempotent)
//!     → registry entry removed
//! ```
//!
//! # Design Decisions
//! - One reader and one writer task per leg; sends are queue pushes
//! - The registry map is the only shared mutable state
//! - Failures stay local to the pairing that hit them

pub mod connector;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod relay;
pub mod session;

pub use connector::{UpstreamConnector, WsConnector};
pub use coordinator::WebSocketMirror;
pub use error::{ConnectFailure, MirrorError, RelayError};
pub use registry::{PairingPhase, SessionRegistry};
pub use session::{Frame, Leg, SessionHandle, SessionId};
