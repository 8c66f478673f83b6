//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, upgrade header)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: WebSocket, Http or NoMatch
//!
//! Route Compilation (at startup):
//!     PathsConfig
//!     → Compile Ant patterns into segment lists
//!     → Freeze as immutable MirrorRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;

pub use router::{MirrorRouter, Route};
