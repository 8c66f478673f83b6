//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, ports and timeouts
//! - Reject path patterns that can never match
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MirrorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::MirrorConfig;
use crate::routing::matcher::PathPattern;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.host must not be empty")]
    EmptyHost,

    #[error("upstream.port must not be 0")]
    ZeroPort,

    #[error("{field}: unsupported scheme '{value}' (expected '{expected}')")]
    UnsupportedScheme {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field}: pattern '{pattern}' must start with '/'")]
    RelativePattern { field: &'static str, pattern: String },

    #[error("{field}: pattern '{pattern}' is not a valid glob: {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("{field} must be greater than 0")]
    ZeroTimeout { field: &'static str },

    #[error("paths: no HTTP or WebSocket paths configured")]
    NothingToMirror,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &MirrorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let upstream = &config.upstream;
    if upstream.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if upstream.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    // TLS is out of scope, so only the plain schemes are accepted.
    if upstream.http_scheme != "http" {
        errors.push(ValidationError::UnsupportedScheme {
            field: "upstream.http_scheme",
            value: upstream.http_scheme.clone(),
            expected: "http",
        });
    }
    if upstream.ws_scheme != "ws" {
        errors.push(ValidationError::UnsupportedScheme {
            field: "upstream.ws_scheme",
            value: upstream.ws_scheme.clone(),
            expected: "ws",
        });
    }

    let patterns = config
        .paths
        .http
        .iter()
        .map(|p| ("paths.http", p))
        .chain(config.paths.websocket.iter().map(|p| ("paths.websocket", p)));
    for (field, pattern) in patterns {
        if !pattern.starts_with('/') {
            errors.push(ValidationError::RelativePattern {
                field,
                pattern: pattern.clone(),
            });
        }
        if let Err(e) = PathPattern::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                field,
                pattern: pattern.clone(),
                reason: e.kind().to_string(),
            });
        }
    }
    if config.paths.http.is_empty() && config.paths.websocket.is_empty() {
        errors.push(ValidationError::NothingToMirror);
    }

    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.connect_ms" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.request_secs" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&MirrorConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = MirrorConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.port = 0;
        config.upstream.ws_scheme = "wss".into();
        config.paths.http.push("static/**".into());
        config.timeouts.connect_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::ZeroTimeout { field: "timeouts.connect_ms" }));
        assert!(errors.contains(&ValidationError::RelativePattern {
            field: "paths.http",
            pattern: "static/**".into(),
        }));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = MirrorConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unbalanced_glob_rejected() {
        let mut config = MirrorConfig::default();
        config.paths.websocket.push("/ws/{a,b".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidPattern { field: "paths.websocket", pattern, .. } if pattern == "/ws/{a,b"
        ));
    }

    #[test]
    fn empty_paths_rejected() {
        let mut config = MirrorConfig::default();
        config.paths.http.clear();
        config.paths.websocket.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NothingToMirror]));
    }
}
