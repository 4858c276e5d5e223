//! Musmus CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the schema (orders, accounts, sessions)
//! musmus-cli migrate
//!
//! # Grant or revoke admin rights
//! musmus-cli admin grant alice
//! musmus-cli admin revoke alice
//!
//! # List accounts
//! musmus-cli admin list
//! ```
//!
//! The database is taken from `MUSMUS_DATABASE_URL` (or `DATABASE_URL`),
//! with `.env` support.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "musmus-cli")]
#[command(author, version, about = "Musmus store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin rights to an existing account
    Grant {
        /// Account username
        username: String,
    },
    /// Revoke admin rights from an account
    Revoke {
        /// Account username
        username: String,
    },
    /// List all accounts
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { username } => {
                commands::admin::set_admin(&pool, &username, true).await?;
            }
            AdminAction::Revoke { username } => {
                commands::admin::set_admin(&pool, &username, false).await?;
            }
            AdminAction::List => commands::admin::list(&pool).await?,
        },
    }
    Ok(())
}
