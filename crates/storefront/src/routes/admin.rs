//! Admin console route handlers.
//!
//! Every handler takes [`RequireAdmin`], so non-admins get 403 and anonymous
//! visitors are sent to the login page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use musmus_core::{OrderId, OrderStatus, Username};

use crate::db::{AccountRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Account;
use crate::routes::auth::MessageQuery;
use crate::routes::views::{OrderView, error_message, format_timestamp, order_views};
use crate::services::OrderService;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Dashboard counters.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub accounts: i64,
    pub pending_orders: i64,
    pub completed_recently: i64,
    pub window_days: u32,
}

/// Account row on the users page.
#[derive(Debug, Clone)]
pub struct AccountView {
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.to_string(),
            is_admin: account.is_admin,
            created_at: format_timestamp(account.created_at),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub username: Option<String>,
    pub metrics: DashboardMetrics,
}

/// Account list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub username: Option<String>,
    pub users: Vec<AccountView>,
    pub user_count: usize,
}

/// One account's order history.
#[derive(Template, WebTemplate)]
#[template(path = "admin/user_orders.html")]
pub struct UserOrdersTemplate {
    pub username: Option<String>,
    pub customer: String,
    pub orders: Vec<OrderView>,
}

/// Order queue template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub username: Option<String>,
    pub pending: Vec<OrderView>,
    pub completed: Vec<OrderView>,
    pub window_days: u32,
    pub error: Option<&'static str>,
}

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusForm {
    pub status: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the admin dashboard.
///
/// # Errors
///
/// Returns an error if the counters cannot be read.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<DashboardTemplate> {
    let since = Utc::now() - state.config().completed_window();
    let orders = OrderRepository::new(state.pool());

    let metrics = DashboardMetrics {
        accounts: AccountRepository::new(state.pool()).count().await?,
        pending_orders: orders.count_pending().await?,
        completed_recently: orders.count_completed_since(since).await?,
        window_days: state.config().completed_window_days,
    };

    Ok(DashboardTemplate {
        username: Some(admin.username.into_inner()),
        metrics,
    })
}

/// List all accounts.
///
/// # Errors
///
/// Returns an error if the accounts cannot be read.
#[instrument(skip_all)]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<UsersTemplate> {
    let accounts = AccountRepository::new(state.pool()).list_all().await?;
    let users: Vec<AccountView> = accounts.iter().map(AccountView::from).collect();

    Ok(UsersTemplate {
        username: Some(admin.username.into_inner()),
        user_count: users.len(),
        users,
    })
}

/// Show one account's orders, newest first.
///
/// # Errors
///
/// Returns 404 for a malformed username, or an error if the orders cannot be read.
#[instrument(skip(state, admin))]
pub async fn user_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(customer): Path<String>,
) -> Result<UserOrdersTemplate> {
    let customer = Username::parse(&customer)
        .map_err(|_| AppError::NotFound(format!("account {customer}")))?;

    let orders = OrderService::new(state.pool(), state.order_codes())
        .orders_for(&customer)
        .await?;

    Ok(UserOrdersTemplate {
        username: Some(admin.username.into_inner()),
        customer: customer.into_inner(),
        orders: order_views(&orders),
    })
}

/// Show open orders and recently completed ones.
///
/// # Errors
///
/// Returns an error if the orders cannot be read.
#[instrument(skip_all)]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Result<OrdersTemplate> {
    let service = OrderService::new(state.pool(), state.order_codes());
    let pending = service.pending().await?;
    let completed = service
        .recently_completed(state.config().completed_window())
        .await?;

    Ok(OrdersTemplate {
        username: Some(admin.username.into_inner()),
        pending: order_views(&pending),
        completed: order_views(&completed),
        window_days: state.config().completed_window_days,
        error: query.error.as_deref().map(error_message),
    })
}

/// Apply a status change and go back to the order queue.
///
/// Transitions the lifecycle does not allow are dropped without a message;
/// the service logs them.
///
/// # Errors
///
/// Returns 404 if the order does not exist, or an error if it cannot be updated.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn update_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Form(form): Form<UpdateStatusForm>,
) -> Result<Redirect> {
    let Ok(requested) = OrderStatus::parse(&form.status) else {
        return Ok(Redirect::to("/admin/orders?error=invalid_status"));
    };

    // Applied and rejected changes both land back on the queue
    OrderService::new(state.pool(), state.order_codes())
        .update_status(OrderId::new(id), &requested)
        .await?;

    Ok(Redirect::to("/admin/orders"))
}
