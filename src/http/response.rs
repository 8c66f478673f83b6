//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Map mirror failures to HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Upstream unreachable results in 502 Bad Gateway, with no fallback body
//!   pretending to be the dev server

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Failure while mirroring a plain HTTP request.
#[derive(Debug, Error)]
pub enum HttpMirrorError {
    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl HttpMirrorError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpMirrorError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            HttpMirrorError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for HttpMirrorError {
    fn into_response(self) -> Response {
        let message = match self {
            HttpMirrorError::InvalidUri(_) => "Invalid request URI",
            HttpMirrorError::Upstream(_) => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}
