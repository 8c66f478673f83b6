//! Dev-time reverse proxy mirroring a frontend dev server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                      DEV MIRROR                       │
//!                      │                                                       │
//!   Browser            │  ┌─────────┐    ┌──────────┐    ┌────────────────┐    │
//!   ───────────────────┼─▶│  http   │───▶│ routing  │─┬─▶│  http::mirror  │────┼──▶ Dev server
//!                      │  │ server  │    │ (paths)  │ │  └────────────────┘    │    (HTTP)
//!                      │  └─────────┘    └──────────┘ │  ┌────────────────┐    │
//!                      │                              └─▶│ http::websocket│    │
//!                      │                                 └───────┬────────┘    │
//!                      │                                         ▼             │
//!                      │  ┌────────────┐   ┌──────────┐   ┌─────────────┐      │
//!   ◀──────────────────┼──│   relay    │◀──│ registry │◀──│ coordinator │      │
//!                      │  └─────┬──────┘   └────┬─────┘   └─────────────┘      │
//!                      │        └──────────────▶│ connector ───────────────────┼──▶ Dev server
//!                      │                                                       │    (WebSocket)
//!                      │  config · observability · lifecycle                   │
//!                      └──────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod mirror;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::MirrorConfig;
pub use http::MirrorServer;
pub use lifecycle::Shutdown;
pub use mirror::WebSocketMirror;
