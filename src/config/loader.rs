//! Configuration loading from disk and environment.

use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: ServerConfig = toml::from_str(&content)?;

    apply_env(&mut config);
    normalize(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration: `ZIPLY_CONFIG` (or `ziply.toml` if
/// present) layered under environment overrides.
pub fn load() -> Result<ServerConfig, ConfigError> {
    if let Ok(path) = std::env::var("ZIPLY_CONFIG") {
        return load_config(Path::new(&path));
    }

    let default_path = Path::new("ziply.toml");
    if default_path.exists() {
        return load_config(default_path);
    }

    let mut config = ServerConfig::default();
    apply_env(&mut config);
    normalize(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Environment overrides, matching the deployment's conventional names.
fn apply_env(config: &mut ServerConfig) {
    if let Ok(uri) = std::env::var("MONGODB_URI") {
        config.database.uri = uri;
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse::<u16>() {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        } else {
            tracing::warn!(port = %port, "ignoring unparseable PORT override");
        }
    }
    if let Ok(origin) = std::env::var("CLIENT_URL") {
        config.cors.allowed_origin = origin;
    }
    if let Ok(dir) = std::env::var("STATIC_DIR") {
        config.static_files.enabled = true;
        config.static_files.dir = dir;
    }
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
}

/// Post-load fixups that depend on more than one field.
fn normalize(config: &mut ServerConfig) {
    // The driver exposes no address-family preference; pinning the
    // loopback host keeps resolution on IPv4.
    if config.database.ipv4_only && config.database.uri.contains("//localhost") {
        config.database.uri = config
            .database
            .uri
            .replacen("//localhost", "//127.0.0.1", 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_pins_localhost_to_ipv4() {
        let mut config = ServerConfig::default();
        assert!(config.database.uri.contains("localhost"));

        normalize(&mut config);
        assert_eq!(config.database.uri, "mongodb://127.0.0.1:27017/ziply");
    }

    #[test]
    fn normalize_respects_ipv4_opt_out() {
        let mut config = ServerConfig::default();
        config.database.ipv4_only = false;

        normalize(&mut config);
        assert!(config.database.uri.contains("localhost"));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
            [database]
            uri = "mongodb://db.internal:27017/shop"
            [listener]
            bind_address = "127.0.0.1:8080"
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.database.uri, "mongodb://db.internal:27017/shop");
        assert_eq!(config.database.max_retries, 5);
        assert_eq!(config.database.retry_delay_ms, 5_000);
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert!(!config.static_files.enabled);
    }
}
