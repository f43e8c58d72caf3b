//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (timeouts > 0, tokens non-empty)
//! - Keep the route pattern syntax unambiguous
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrameworkConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FrameworkConfig;
use crate::http::middleware::MAX_SESSION_TTL;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &FrameworkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than zero"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    let routing = &config.routing;
    if routing.separator.is_empty() {
        errors.push(ValidationError::new("routing.separator", "must not be empty"));
    }
    if routing.wildcard.is_empty() {
        errors.push(ValidationError::new("routing.wildcard", "must not be empty"));
    } else if !routing.separator.is_empty() && routing.wildcard.contains(routing.separator.as_str()) {
        errors.push(ValidationError::new(
            "routing.wildcard",
            format!("must not contain the separator '{}'", routing.separator),
        ));
    }

    let session = &config.session;
    if session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    } else if session
        .cookie_name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '='))
    {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must not contain whitespace, ';', ',' or '='",
        ));
    }
    if session.expiration_secs == 0 {
        errors.push(ValidationError::new("session.expiration_secs", "must be greater than zero"));
    } else if session.expiration_secs > MAX_SESSION_TTL.as_secs() {
        errors.push(ValidationError::new(
            "session.expiration_secs",
            format!("must be at most {}", MAX_SESSION_TTL.as_secs()),
        ));
    }
    if session.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new("session.cleanup_interval_secs", "must be greater than zero"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
