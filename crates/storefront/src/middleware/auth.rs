//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in account, or an
//! administrator, in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::{AccountRepository, RepositoryError};
use crate::error::AppError;
use crate::models::{Account, CurrentUser, session::keys};
use crate::state::AppState;

/// Extractor that requires a logged-in account.
///
/// If nobody is logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl AuthRejection {
    fn for_path(path: &str) -> Self {
        if path.starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| AuthRejection::for_path(parts.uri.path()))
    }
}

/// Extractor that optionally gets the current account.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Extractor that requires a logged-in administrator.
///
/// The admin flag is read from the database on every request, so revoking
/// it takes effect immediately for existing sessions.
pub struct RequireAdmin(pub Account);

/// Error returned when an admin route is accessed without admin rights.
#[derive(Debug)]
pub enum AdminRejection {
    /// Nobody is logged in.
    NotLoggedIn(AuthRejection),
    /// Logged in, but not an administrator.
    Forbidden,
    /// The account could not be loaded.
    Database(RepositoryError),
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotLoggedIn(rejection) => rejection.into_response(),
            Self::Forbidden => {
                AppError::Forbidden("admin access required".to_string()).into_response()
            }
            Self::Database(e) => AppError::Database(e).into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::NotLoggedIn)?;

        let account = AccountRepository::new(state.pool())
            .get_by_id(user.id)
            .await
            .map_err(AdminRejection::Database)?
            // The account behind this session no longer exists.
            .ok_or(AdminRejection::NotLoggedIn(AuthRejection::RedirectToLogin))?;

        if !account.is_admin {
            tracing::warn!(username = %account.username, path = %parts.uri.path(), "Non-admin denied");
            return Err(AdminRejection::Forbidden);
        }

        Ok(Self(account))
    }
}

/// Helper to log an account into the session.
///
/// Rotates the session ID first so a pre-login session ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to log out: discards the whole session, cart included.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
