//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID)
//!     → routing layer classifies the path
//!         → websocket.rs (upgrade, client leg of a WebSocket pairing)
//!         → mirror.rs (forward plain HTTP upstream)
//!     → response.rs (strip hop-by-hop headers, map failures)
//!     → Send to client
//! ```

pub mod mirror;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use mirror::HttpMirror;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::HttpMirrorError;
pub use server::{MirrorServer, ServerError};
