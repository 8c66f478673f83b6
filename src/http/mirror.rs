//! Plain HTTP mirroring.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the fixed upstream, keeping path and query
//! - Forward method, end-to-end headers and body
//! - Return the upstream status, headers and body bytes as they arrived
//!
//! # Design Decisions
//! - Stateless: nothing is kept between requests
//! - Bodies stream through in both directions; nothing is buffered
//! - No retries and no fallback content; a dead dev server is a 502

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, Uri, Version};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::UpstreamConfig;
use crate::http::request::RequestIdExt;
use crate::http::response::{strip_hop_by_hop, HttpMirrorError};

/// Forwards requests to the upstream dev server.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client<HttpConnector, Body>,
    scheme: String,
    authority: String,
}

impl HttpMirror {
    pub fn new(upstream: &UpstreamConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            scheme: upstream.http_scheme.clone(),
            authority: upstream.authority(),
        }
    }

    /// Upstream URI for an inbound one: same path and query, upstream origin.
    pub fn target_uri(&self, uri: &Uri) -> Result<Uri, HttpMirrorError> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let target = Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()?;
        Ok(target)
    }

    /// Forward one request and hand back the raw upstream response.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, HttpMirrorError> {
        let target = self.target_uri(request.uri())?;
        let request_id = request.request_id().to_owned();
        let (parts, body) = request.into_parts();

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if let Ok(host) = HeaderValue::from_str(&self.authority) {
            headers.insert(header::HOST, host);
        }

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            upstream = %target,
            "Mirroring HTTP request"
        );

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(target)
            .version(Version::HTTP_11)
            .body(body)?;
        *outbound.headers_mut() = headers;

        let response = self.client.request(outbound).await.map_err(|e| {
            tracing::warn!(request_id = %request_id, error = %e, "Upstream HTTP request failed");
            HttpMirrorError::from(e)
        })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
