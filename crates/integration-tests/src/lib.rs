//! End-to-end tests for the Musmus store.
//!
//! Each test starts the full application on an ephemeral port with an
//! in-memory database and session store, then drives it over HTTP with a
//! cookie-keeping client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p musmus-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;

use reqwest::{Client, Response, redirect};
use sqlx::SqlitePool;
use tower_sessions::MemoryStore;

use musmus_core::Username;
use musmus_storefront::catalog::Catalog;
use musmus_storefront::config::StorefrontConfig;
use musmus_storefront::db::{self, AccountRepository};
use musmus_storefront::state::AppState;

/// Catalog served by every test server.
pub const TEST_CATALOG: &str = r#"{"games": [
    {
        "name": "Genshin Impact",
        "description": "Genesis Crystals",
        "items": [
            {"name": "60 Genesis Crystals", "price": 6},
            {"name": "Blessing of the Welkin Moon", "price": 30}
        ]
    },
    {
        "name": "Arknights",
        "items": [{"name": "Monthly Card", "price": 30}]
    }
]}"#;

/// A running storefront plus a handle on its database.
pub struct TestContext {
    pub base_url: String,
    pub pool: SqlitePool,
}

impl TestContext {
    /// Start a fresh server on [`TEST_CATALOG`].
    ///
    /// # Panics
    ///
    /// Panics if the database, catalog or listener cannot be set up.
    #[allow(clippy::unwrap_used)]
    pub async fn new() -> Self {
        Self::with_catalog(Catalog::from_json_str(TEST_CATALOG).unwrap()).await
    }

    /// Start a fresh server on `catalog`.
    ///
    /// # Panics
    ///
    /// Panics if the database or listener cannot be set up.
    #[allow(clippy::unwrap_used)]
    pub async fn with_catalog(catalog: Catalog) -> Self {
        let pool = db::create_memory_pool().await.unwrap();
        db::migrate(&pool).await.unwrap();

        let vars = HashMap::from([(
            "MUSMUS_DATABASE_URL".to_string(),
            "sqlite::memory:".to_string(),
        )]);
        let config = StorefrontConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let state = AppState::new(config, pool.clone(), catalog);
        let app = musmus_storefront::app(state, MemoryStore::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            pool,
        }
    }

    /// A new browser: its own cookie jar, redirects left to the test.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .unwrap()
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register `username` and log the browser in.
    ///
    /// # Panics
    ///
    /// Panics if registration or login does not redirect as expected.
    #[allow(clippy::unwrap_used)]
    pub async fn sign_up(&self, browser: &Client, username: &str, password: &str) {
        let response = browser
            .post(self.url("/register"))
            .form(&[
                ("username", username),
                ("password", password),
                ("password_confirm", password),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(location(&response), "/login?success=registered");

        let response = browser
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .unwrap();
        assert_eq!(location(&response), "/");
    }

    /// Flip the admin flag directly in the database.
    ///
    /// # Panics
    ///
    /// Panics if the account does not exist.
    #[allow(clippy::unwrap_used)]
    pub async fn make_admin(&self, username: &str) {
        AccountRepository::new(&self.pool)
            .set_admin(&Username::parse(username).unwrap(), true)
            .await
            .unwrap();
    }
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
