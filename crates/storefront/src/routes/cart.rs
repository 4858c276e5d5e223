//! Cart and checkout route handlers.
//!
//! The cart lives in the session (see [`CartSession`]); checkout turns it
//! into a persisted order.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use musmus_core::Price;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::routes::auth::MessageQuery;
use crate::routes::views::{CartView, LineView, OrderView, error_message, order_views};
use crate::services::{CartSession, CartSessionError, CheckoutError, OrderService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub game_name: String,
    pub item_name: String,
    pub price: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template: current cart plus the account's order history.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub username: Option<String>,
    pub cart: CartView,
    pub past_orders: Vec<OrderView>,
    pub error: Option<&'static str>,
}

/// Checkout review template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub username: Option<String>,
    pub cart: CartView,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "order_confirm.html")]
pub struct OrderConfirmTemplate {
    pub username: Option<String>,
    pub order_code: String,
    pub member_name: String,
    pub lines: Vec<LineView>,
    pub total: i64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Where to send the browser after adding to the cart.
///
/// Only same-site targets are followed: a relative path, or an absolute URL
/// under `base_url`. Anything else falls back to `/cart`.
fn redirect_target(headers: &HeaderMap, base_url: &str) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| {
            if referer.starts_with('/') {
                return local_path(referer);
            }
            let path = referer.strip_prefix(base_url.trim_end_matches('/'))?;
            if path.is_empty() {
                Some("/".to_owned())
            } else {
                local_path(path)
            }
        })
        .unwrap_or_else(|| "/cart".to_owned())
}

/// `path` if it stays on this host.
///
/// Browsers treat `\` like `/`, so `/\host` and `//host` both leave the site.
fn local_path(path: &str) -> Option<String> {
    let mut bytes = path.bytes();
    let stays_local = bytes.next() == Some(b'/')
        && !matches!(bytes.next(), Some(b'/' | b'\\'))
        && !path.contains('\\');
    stays_local.then(|| path.to_owned())
}

// =============================================================================
// Cart Routes
// =============================================================================

/// Display the cart and the account's past orders.
///
/// # Errors
///
/// Returns an error if the session or the order history cannot be read.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<CartTemplate> {
    let cart = CartSession::new(&session).load().await?;
    let past_orders = OrderService::new(state.pool(), state.order_codes())
        .orders_for(&user.username)
        .await?;

    Ok(CartTemplate {
        username: Some(user.username.into_inner()),
        cart: CartView::from(&cart),
        past_orders: order_views(&past_orders),
        error: query.error.as_deref().map(error_message),
    })
}

/// Add a line to the cart, then go back to the page the form was on.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let Ok(price) = Price::parse(&form.price) else {
        tracing::info!(price = %form.price, "Rejected cart line with invalid price");
        return Ok(Redirect::to("/cart?error=invalid_item").into_response());
    };

    match CartSession::new(&session)
        .add_line(&form.game_name, &form.item_name, price)
        .await
    {
        Ok(cart) => {
            tracing::info!(lines = cart.len(), "Added to cart");
            let target = redirect_target(&headers, &state.config().base_url);
            Ok(Redirect::to(&target).into_response())
        }
        Err(CartSessionError::Cart(e)) => {
            tracing::info!(error = %e, "Rejected cart line");
            Ok(Redirect::to("/cart?error=invalid_item").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all)]
pub async fn clear(RequireAuth(_user): RequireAuth, session: Session) -> Result<Redirect> {
    CartSession::new(&session).clear().await?;
    Ok(Redirect::to("/cart"))
}

// =============================================================================
// Checkout Routes
// =============================================================================

/// Display the checkout review page.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
#[instrument(skip(session))]
pub async fn checkout_page(RequireAuth(user): RequireAuth, session: Session) -> Result<Response> {
    let cart = CartSession::new(&session).load().await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }

    Ok(CheckoutTemplate {
        username: Some(user.username.into_inner()),
        cart: CartView::from(&cart),
    }
    .into_response())
}

/// Place the order.
///
/// # Errors
///
/// Returns an error if the order cannot be persisted; the cart is kept so
/// the customer can retry.
#[instrument(skip(state, session))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let cart = CartSession::new(&session);
    let order = match OrderService::new(state.pool(), state.order_codes())
        .checkout(&cart, &user.username)
        .await
    {
        Ok(order) => order,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/cart?error=empty_cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(OrderConfirmTemplate {
        username: Some(user.username.to_string()),
        order_code: order.order_code.to_string(),
        member_name: order.owner.into_inner(),
        lines: order.line_items.iter().map(LineView::from).collect(),
        total: order.total_price.amount(),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_referer(referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(referer).unwrap());
        headers
    }

    #[test]
    fn test_redirect_target_same_site() {
        let base = "http://localhost:5000";
        assert_eq!(
            redirect_target(&with_referer("http://localhost:5000/price/2"), base),
            "/price/2"
        );
        assert_eq!(redirect_target(&with_referer("/price/1"), base), "/price/1");
        assert_eq!(redirect_target(&with_referer("http://localhost:5000"), base), "/");
    }

    #[test]
    fn test_redirect_target_rejects_foreign() {
        let base = "http://localhost:5000";
        assert_eq!(redirect_target(&HeaderMap::new(), base), "/cart");
        assert_eq!(
            redirect_target(&with_referer("https://evil.example/x"), base),
            "/cart"
        );
        assert_eq!(redirect_target(&with_referer("//evil.example/x"), base), "/cart");
        assert_eq!(
            redirect_target(&with_referer("http://localhost:5000.evil.example/"), base),
            "/cart"
        );
    }

    #[test]
    fn test_redirect_target_rejects_backslash_tricks() {
        let base = "http://localhost:5000";
        for referer in [
            r"/\evil.example/x",
            r"http://localhost:5000/\evil.example/x",
            r"http://localhost:5000//evil.example/x",
            r"/price/1\..\x",
        ] {
            assert_eq!(redirect_target(&with_referer(referer), base), "/cart", "{referer}");
        }
    }
}
