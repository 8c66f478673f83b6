//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener
//! - Dispatch requests to the WebSocket or HTTP mirror
//! - Close every WebSocket pairing on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::MirrorConfig;
use crate::http::mirror::HttpMirror;
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::http::websocket;
use crate::mirror::{UpstreamConnector, WebSocketMirror, WsConnector};
use crate::observability::metrics;
use crate::routing::{MirrorRouter, Route};

/// Error building the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream WebSocket URL: {0}")]
    InvalidUpstream(#[from] url::ParseError),

    #[error("invalid path pattern: {0}")]
    InvalidPattern(#[from] globset::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MirrorRouter>,
    pub http: HttpMirror,
    pub websocket: WebSocketMirror,
}

/// HTTP server for the dev mirror.
pub struct MirrorServer {
    router: Router,
    websocket: WebSocketMirror,
}

impl MirrorServer {
    /// Create a server dialing the configured upstream.
    pub fn new(config: &MirrorConfig) -> Result<Self, ServerError> {
        let connector = WsConnector::new(&config.upstream, &config.timeouts)?;
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create a server with a custom upstream WebSocket connector.
    pub fn with_connector(
        config: &MirrorConfig,
        connector: Arc<dyn UpstreamConnector>,
    ) -> Result<Self, ServerError> {
        let websocket = WebSocketMirror::new(connector);
        let state = AppState {
            router: Arc::new(MirrorRouter::from_config(&config.paths)?),
            http: HttpMirror::new(&config.upstream),
            websocket: websocket.clone(),
        };

        let router = Self::build_router(config, state);
        Ok(Self { router, websocket })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MirrorConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            // Timeout wraps the router directly: it requires a `Default` response body.
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(middleware)
    }

    /// The configured router, for serving or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn websocket(&self) -> &WebSocketMirror {
        &self.websocket
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let websocket = self.websocket.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                let closed = websocket.registry().close_all();
                tracing::info!(pairings = closed, "Shutdown signal received, closed WebSocket pairings");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Route the request to the matching mirror.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.router.route(&request) {
        Route::WebSocket => websocket::upgrade(state.websocket, request).await,
        Route::Http => {
            let start = Instant::now();
            let method = request.method().clone();
            let response = match state.http.forward(request).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            };
            metrics::record_http_request(method.as_str(), response.status().as_u16(), start);
            response
        }
        Route::NoMatch => {
            tracing::debug!(
                request_id = %request.request_id(),
                path = %request.uri().path(),
                "No mirror path matched"
            );
            (StatusCode::NOT_FOUND, "No mirror path matched").into_response()
        }
    }
}
