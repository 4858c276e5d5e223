//! Database migration command.
//!
//! Applies the embedded storefront migrations, then creates the session
//! table used by `tower-sessions-sqlx-store`. Both steps are idempotent.

use sqlx::SqlitePool;
use tower_sessions_sqlx_store::SqliteStore;

use musmus_storefront::db;

use super::CommandError;

/// Run all migrations against `pool`.
///
/// # Errors
///
/// Returns an error if either migration step fails.
pub async fn run(pool: &SqlitePool) -> Result<(), CommandError> {
    tracing::info!("Running storefront migrations...");
    db::migrate(pool).await?;

    tracing::info!("Creating session table...");
    SqliteStore::new(pool.clone())
        .migrate()
        .await
        .map_err(|e| CommandError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete");
    Ok(())
}
