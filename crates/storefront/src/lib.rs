//! Musmus storefront library.
//!
//! Game catalog, session cart, checkout and the admin order console, built
//! as a library so the binary, the CLI and the integration tests share one
//! router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use sqlx::SqlitePool;
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::config::StorefrontConfig;
use crate::db::{AccountRepository, RepositoryError};
use crate::state::AppState;

/// Build the full application router over `store` for sessions.
///
/// The server passes the SQLite session store; tests pass a memory store.
pub fn app<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(store, state.config());
    let static_dir = ServeDir::new(&state.config().static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Grant admin rights to the configured bootstrap account, if any.
///
/// A missing account is logged and skipped so a fresh database can still
/// start; the flag is applied on the next start after the account registers.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn promote_bootstrap_admin(
    pool: &SqlitePool,
    config: &StorefrontConfig,
) -> Result<(), RepositoryError> {
    let Some(username) = &config.bootstrap_admin else {
        return Ok(());
    };

    match AccountRepository::new(pool).set_admin(username, true).await {
        Ok(()) => {
            tracing::info!(%username, "Bootstrap admin granted");
            Ok(())
        }
        Err(RepositoryError::NotFound) => {
            tracing::warn!(%username, "Bootstrap admin account does not exist yet");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
