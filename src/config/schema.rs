//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! server. All types derive Serde traits for deserialization from config
//! files, and every section has defaults so a minimal (or absent) config
//! file still yields a runnable server.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Backing store connection settings.
    pub database: DatabaseConfig,

    /// Authentication settings (JWT, password hashing).
    pub auth: AuthConfig,

    /// Cross-origin settings for the browser client.
    pub cors: CorsConfig,

    /// Static serving of the built client app.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Backing store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MongoDB connection string. The path component selects the
    /// database; "ziply" is used when none is given.
    pub uri: String,

    /// Bring-up attempts allowed before the failure is terminal.
    pub max_retries: u32,

    /// Fixed delay between bring-up attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Server selection timeout in milliseconds.
    pub server_selection_timeout_ms: u64,

    /// Close pooled sockets idle past this window, in milliseconds.
    pub socket_idle_timeout_ms: u64,

    /// Prefer IPv4: a `localhost` seed host is pinned to 127.0.0.1 so
    /// resolution never wanders to ::1.
    pub ipv4_only: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/ziply".to_string(),
            max_retries: 5,
            retry_delay_ms: 5_000,
            server_selection_timeout_ms: 5_000,
            socket_idle_timeout_ms: 45_000,
            ipv4_only: true,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing JWTs.
    pub jwt_secret: String,

    /// Token lifetime in hours.
    pub token_ttl_hours: u64,

    /// bcrypt cost factor (4..=31).
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            token_ttl_hours: 24 * 30,
            bcrypt_cost: 12,
        }
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origin of the browser client; "*" allows any origin.
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:5173".to_string(),
        }
    }
}

/// Static serving of the built client app.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Serve the client build alongside the API.
    pub enabled: bool,

    /// Directory holding the client build.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: "client/dist".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
