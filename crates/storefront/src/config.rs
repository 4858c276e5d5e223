//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MUSMUS_DATABASE_URL` - SQLite connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `MUSMUS_HOST` - Bind address (default: 127.0.0.1)
//! - `MUSMUS_PORT` - Listen port (default: 5000)
//! - `MUSMUS_BASE_URL` - Public URL; `https://` enables secure cookies (default: `http://localhost:5000`)
//! - `MUSMUS_CATALOG_PATH` - Catalog JSON file (default: data.json)
//! - `MUSMUS_STATIC_DIR` - Static assets directory (default: crates/storefront/static)
//! - `MUSMUS_COMPLETED_WINDOW_DAYS` - Days of completed orders shown to admins (default: 30, 1-365)
//! - `MUSMUS_BOOTSTRAP_ADMIN` - Existing username promoted to admin at startup
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use musmus_core::Username;

/// Bounds for `MUSMUS_COMPLETED_WINDOW_DAYS`.
const COMPLETED_WINDOW_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// SQLite database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Path of the catalog JSON file
    pub catalog_path: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// How many days of completed orders the admin console lists
    pub completed_window_days: u32,
    /// Account promoted to admin at startup, if any
    pub bootstrap_admin: Option<Username>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get_database_url(&env, "MUSMUS_DATABASE_URL")?;
        let host = parse_env(&env, "MUSMUS_HOST", "127.0.0.1")?;
        let port = parse_env(&env, "MUSMUS_PORT", "5000")?;
        let base_url = get_env_or_default(&env, "MUSMUS_BASE_URL", "http://localhost:5000");
        let catalog_path = get_env_or_default(&env, "MUSMUS_CATALOG_PATH", "data.json").into();
        let static_dir =
            get_env_or_default(&env, "MUSMUS_STATIC_DIR", "crates/storefront/static").into();

        let completed_window_days: u32 = parse_env(&env, "MUSMUS_COMPLETED_WINDOW_DAYS", "30")?;
        if !COMPLETED_WINDOW_RANGE.contains(&completed_window_days) {
            return Err(ConfigError::InvalidEnvVar(
                "MUSMUS_COMPLETED_WINDOW_DAYS".to_string(),
                format!(
                    "must be between {} and {}",
                    COMPLETED_WINDOW_RANGE.start(),
                    COMPLETED_WINDOW_RANGE.end()
                ),
            ));
        }

        let bootstrap_admin = get_optional_env(&env, "MUSMUS_BOOTSTRAP_ADMIN")
            .map(|name| {
                Username::parse(&name).map_err(|e| {
                    ConfigError::InvalidEnvVar("MUSMUS_BOOTSTRAP_ADMIN".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            catalog_path,
            static_dir,
            completed_window_days,
            bootstrap_admin,
            sentry_dsn: get_optional_env(&env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&env, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env(&env, "SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env(&env, "SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// The admin console's "recently completed" window.
    #[must_use]
    pub fn completed_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.completed_window_days))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &impl Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("MUSMUS_DATABASE_URL", "sqlite://test.db")]).unwrap();

        assert_eq!(config.database_url.expose_secret(), "sqlite://test.db");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.catalog_path, PathBuf::from("data.json"));
        assert_eq!(config.completed_window_days, 30);
        assert_eq!(config.completed_window(), chrono::Duration::days(30));
        assert!(config.bootstrap_admin.is_none());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "MUSMUS_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "sqlite://fallback.db")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "sqlite://fallback.db");
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("MUSMUS_DATABASE_URL", "sqlite://x.db"), ("MUSMUS_PORT", "http")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "MUSMUS_PORT"));
    }

    #[test]
    fn test_window_bounds() {
        for bad in ["0", "366", "-1"] {
            assert!(
                load(&[
                    ("MUSMUS_DATABASE_URL", "sqlite://x.db"),
                    ("MUSMUS_COMPLETED_WINDOW_DAYS", bad),
                ])
                .is_err()
            );
        }
        let config = load(&[
            ("MUSMUS_DATABASE_URL", "sqlite://x.db"),
            ("MUSMUS_COMPLETED_WINDOW_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(config.completed_window_days, 7);
    }

    #[test]
    fn test_bootstrap_admin_and_https() {
        let config = load(&[
            ("MUSMUS_DATABASE_URL", "sqlite://x.db"),
            ("MUSMUS_BOOTSTRAP_ADMIN", "admin"),
            ("MUSMUS_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();
        assert_eq!(config.bootstrap_admin.as_ref().unwrap().as_str(), "admin");
        assert!(config.secure_cookies());

        assert!(
            load(&[
                ("MUSMUS_DATABASE_URL", "sqlite://x.db"),
                ("MUSMUS_BOOTSTRAP_ADMIN", "two words"),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("MUSMUS_DATABASE_URL", "sqlite://secret-path.db")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-path"));
    }
}
