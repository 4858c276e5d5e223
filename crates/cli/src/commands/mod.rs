//! CLI subcommands.

pub mod admin;
pub mod migrate;

use sqlx::SqlitePool;
use thiserror::Error;

use musmus_core::UsernameError;
use musmus_storefront::config::{ConfigError, StorefrontConfig};
use musmus_storefront::db::{self, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration error: {0}")]
    SessionStore(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("No account named {0}")]
    AccountNotFound(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Load configuration from the environment and open the database.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the connection fails.
pub async fn connect() -> Result<SqlitePool, CommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&config.database_url).await?)
}
