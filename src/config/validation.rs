//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, retry bound >= 1)
//! - Check addresses parse and the store URI names a mongodb scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

fn err(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(err("listener.request_timeout_secs", "must be > 0"));
    }

    let db = &config.database;
    if !db.uri.starts_with("mongodb://") && !db.uri.starts_with("mongodb+srv://") {
        errors.push(err("database.uri", "must use a mongodb:// or mongodb+srv:// scheme"));
    }
    if db.max_retries == 0 {
        errors.push(err("database.max_retries", "must be >= 1"));
    }
    if db.retry_delay_ms == 0 {
        errors.push(err("database.retry_delay_ms", "must be > 0"));
    }
    if db.server_selection_timeout_ms == 0 {
        errors.push(err("database.server_selection_timeout_ms", "must be > 0"));
    }
    if db.socket_idle_timeout_ms == 0 {
        errors.push(err("database.socket_idle_timeout_ms", "must be > 0"));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(err("auth.jwt_secret", "must not be empty"));
    }
    if !(4..=31).contains(&config.auth.bcrypt_cost) {
        errors.push(err("auth.bcrypt_cost", "must be in 4..=31"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(err(
            "observability.metrics_address",
            format!(
                "not a socket address: {}",
                config.observability.metrics_address
            ),
        ));
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
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.database.uri = "postgres://localhost".into();
        config.database.max_retries = 0;
        config.auth.jwt_secret = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"database.max_retries"));
        assert!(fields.contains(&"auth.jwt_secret"));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = ServerConfig::default();
        config.database.retry_delay_ms = 0;
        config.database.server_selection_timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
