//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mirror.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dev mirror.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The frontend dev server everything is mirrored to.
    pub upstream: UpstreamConfig,

    /// Which request paths are mirrored, and how.
    pub paths: PathsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Fixed upstream address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme for mirrored HTTP requests.
    pub http_scheme: String,

    /// Scheme for mirrored WebSocket connections.
    pub ws_scheme: String,

    /// Upstream host name or IP.
    pub host: String,

    /// Upstream port.
    pub port: u16,
}

impl UpstreamConfig {
    /// `host:port` as used in the Host header and URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for mirrored HTTP requests, without a path.
    pub fn http_base(&self) -> String {
        format!("{}://{}", self.http_scheme, self.authority())
    }

    /// Base URL for mirrored WebSocket connections, without a path.
    pub fn websocket_base(&self) -> String {
        format!("{}://{}", self.ws_scheme, self.authority())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            http_scheme: "http".to_string(),
            ws_scheme: "ws".to_string(),
            host: "localhost".to_string(),
            port: 3000,
        }
    }
}

/// Path patterns (Ant style: `**`, `*`, `?`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Patterns forwarded as plain HTTP requests.
    pub http: Vec<String>,

    /// Patterns accepted as WebSocket connections and relayed upstream.
    pub websocket: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            http: [
                "/frontend/**",
                "/static/**",
                "/fonts/**",
                "/logo*.png",
                "/favicon.ico",
                "/manifest.json",
                "/*.hot-update.*",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            websocket: vec!["/sockjs-node".to_string(), "/ws".to_string()],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream WebSocket handshake timeout in milliseconds.
    pub connect_ms: u64,

    /// Mirrored HTTP request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 1000,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum mirrored request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
