//! Authentication route handlers.
//!
//! Handles registration, login and logout with username and password.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_session, set_current_user};
use crate::models::CurrentUser;
use crate::routes::views::{error_message, success_message};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub username: Option<String>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub username: Option<String>,
    pub error: Option<&'static str>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        username: user.map(|u| u.username.into_inner()),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
    }
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let account = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(account) => account,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            return Redirect::to("/login?error=credentials").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Login error");
            return Redirect::to("/login?error=unknown").into_response();
        }
    };

    let current_user = CurrentUser {
        id: account.id,
        username: account.username,
    };

    if let Err(e) = set_current_user(&session, &current_user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/login?error=session").into_response();
    }

    set_sentry_user(&current_user.id, current_user.username.as_str());
    tracing::info!("Logged in");

    Redirect::to("/").into_response()
}

/// Handle logout. Discards the session, including the cart.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_session(&session).await {
        tracing::error!("Failed to flush session on logout: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip_all)]
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        username: user.map(|u| u.username.into_inner()),
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle registration form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let result = AuthService::new(state.pool())
        .register(&form.username, &form.password, &form.password_confirm)
        .await;

    let code = match result {
        Ok(account) => {
            tracing::info!(account_id = %account.id, "Account registered");
            return Redirect::to("/login?success=registered").into_response();
        }
        Err(AuthError::UsernameTaken) => "username_taken",
        Err(AuthError::InvalidUsername(_)) => "invalid_username",
        Err(AuthError::WeakPassword(_)) => "weak_password",
        Err(AuthError::PasswordMismatch) => "password_mismatch",
        Err(e) => {
            tracing::error!(error = %e, "Registration error");
            "unknown"
        }
    };

    tracing::info!(reason = code, "Registration rejected");
    Redirect::to(&format!("/register?error={code}")).into_response()
}
