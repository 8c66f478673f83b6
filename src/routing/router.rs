//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Classify each request as WebSocket, plain HTTP or unmatched
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) pattern scan (acceptable for a handful of dev-server paths)
//! - Explicit NoMatch rather than silent default
//! - A WebSocket path without an upgrade header still routes to the
//!   WebSocket handler, which rejects it; it never falls through to HTTP
//!   unless an HTTP pattern also covers it

use axum::body::Body;
use axum::http::Request;

use crate::config::PathsConfig;
use crate::routing::matcher::{AndMatcher, AnyMatcher, Matcher, UpgradeMatcher};

/// How a request is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Accept as a WebSocket and relay to the upstream.
    WebSocket,
    /// Forward as a plain HTTP request.
    Http,
    /// Not mirrored.
    NoMatch,
}

/// Compiled, ordered route table.
#[derive(Debug)]
pub struct MirrorRouter {
    routes: Vec<(Box<dyn Matcher>, Route)>,
}

impl MirrorRouter {
    /// Compile the configured path patterns.
    pub fn from_config(paths: &PathsConfig) -> Result<Self, globset::Error> {
        let routes: Vec<(Box<dyn Matcher>, Route)> = vec![
            (
                Box::new(AndMatcher::new(vec![
                    Box::new(AnyMatcher::paths(&paths.websocket)?),
                    Box::new(UpgradeMatcher),
                ])),
                Route::WebSocket,
            ),
            (Box::new(AnyMatcher::paths(&paths.http)?), Route::Http),
            (Box::new(AnyMatcher::paths(&paths.websocket)?), Route::WebSocket),
        ];
        Ok(Self { routes })
    }

    /// Find the route for a request. First match wins.
    pub fn route(&self, req: &Request<Body>) -> Route {
        self.routes
            .iter()
            .find(|(matcher, _)| matcher.matches(req))
            .map(|(_, route)| *route)
            .unwrap_or(Route::NoMatch)
    }
}
