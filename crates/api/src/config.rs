//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL URL; unset means in-memory backends
/// - `INVENTORY_STRICT` — reject deductions past zero (default: `false`)
/// - `PRODUCTION_URL` — production queue middleware base URL
/// - `IMAGE_PROVIDER_URL` / `MESSAGE_PROVIDER_URL` — content vendors
/// - `PROVIDER_TIMEOUT_MS` — per-provider timeout (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub inventory_strict: bool,
    pub production_url: Option<String>,
    pub image_provider_url: Option<String>,
    pub message_provider_url: Option<String>,
    pub provider_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            inventory_strict: std::env::var("INVENTORY_STRICT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            production_url: std::env::var("PRODUCTION_URL").ok(),
            image_provider_url: std::env::var("IMAGE_PROVIDER_URL").ok(),
            message_provider_url: std::env::var("MESSAGE_PROVIDER_URL").ok(),
            provider_timeout: std::env::var("PROVIDER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(5000)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            inventory_strict: false,
            production_url: None,
            image_provider_url: None,
            message_provider_url: None,
            provider_timeout: Duration::from_millis(5000),
        }
    }
}
