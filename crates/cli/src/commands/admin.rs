//! Administrator account commands.
//!
//! Accounts are created through the storefront's registration page; these
//! commands only flip the admin flag and inspect the account list.

use sqlx::SqlitePool;

use musmus_core::Username;
use musmus_storefront::db::{AccountRepository, RepositoryError};

use super::CommandError;

/// Grant (`is_admin = true`) or revoke admin rights.
///
/// # Errors
///
/// Returns an error if the username is invalid or no such account exists.
pub async fn set_admin(pool: &SqlitePool, username: &str, is_admin: bool) -> Result<(), CommandError> {
    let username = Username::parse(username)?;

    match AccountRepository::new(pool).set_admin(&username, is_admin).await {
        Ok(()) => {
            if is_admin {
                tracing::info!(%username, "Admin rights granted");
            } else {
                tracing::info!(%username, "Admin rights revoked");
            }
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(CommandError::AccountNotFound(username.into_inner())),
        Err(e) => Err(e.into()),
    }
}

/// Print every account, oldest first.
///
/// # Errors
///
/// Returns an error if the accounts cannot be read.
pub async fn list(pool: &SqlitePool) -> Result<(), CommandError> {
    let accounts = AccountRepository::new(pool).list_all().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<6} {:<24} {:<6} CREATED", "ID", "USERNAME", "ADMIN");
        for account in &accounts {
            println!(
                "{:<6} {:<24} {:<6} {}",
                account.id.as_i64(),
                account.username,
                if account.is_admin { "yes" } else { "no" },
                account.created_at.format("%Y-%m-%d %H:%M:%S"),
            );
        }
        println!("{} account(s)", accounts.len());
    }

    Ok(())
}
