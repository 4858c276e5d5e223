//! View models shared by several pages.
//!
//! Handlers convert domain types into these flat, pre-formatted structs so
//! templates only print strings and numbers.

use chrono::{DateTime, Utc};

use musmus_core::{Cart, CartLine};

use crate::models::Order;

/// Timestamp format used on every page.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Format a timestamp for display.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// One cart or order line.
#[derive(Debug, Clone)]
pub struct LineView {
    pub game: String,
    pub item: String,
    pub price: i64,
}

impl From<&CartLine> for LineView {
    fn from(line: &CartLine) -> Self {
        Self {
            game: line.product_label.clone(),
            item: line.item_label.clone(),
            price: line.unit_price.amount(),
        }
    }
}

/// A cart with its total.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub total: i64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().iter().map(LineView::from).collect(),
            total: cart.total().amount(),
        }
    }
}

/// An order as shown in histories and the admin console.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i64,
    pub order_code: String,
    pub owner: String,
    pub status: String,
    pub is_paid: bool,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub total: i64,
    pub lines: Vec<LineView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            order_code: order.order_code.to_string(),
            owner: order.owner.to_string(),
            status: order.status.to_string(),
            is_paid: order.status == musmus_core::OrderStatus::Paid,
            created_at: format_timestamp(order.created_at),
            completed_at: order.completed_at.map(format_timestamp),
            total: order.total_price.amount(),
            lines: order.line_items.iter().map(LineView::from).collect(),
        }
    }
}

/// Convert a list of orders for display.
#[must_use]
pub fn order_views(orders: &[Order]) -> Vec<OrderView> {
    orders.iter().map(OrderView::from).collect()
}

/// Human-readable text for an `?error=` code used by form redirects.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Login failed. Please check your username and password.",
        "username_taken" => "This username is already taken.",
        "invalid_username" => "Usernames must be 1-80 characters without spaces.",
        "weak_password" => "Passwords must be at least 8 characters.",
        "password_mismatch" => "The two passwords do not match.",
        "empty_cart" => "Your cart is empty.",
        "invalid_item" => "That item could not be added to your cart.",
        "invalid_status" => "That is not a valid status label.",
        "session" => "Your session could not be saved. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Human-readable text for a `?success=` code.
#[must_use]
pub fn success_message(code: &str) -> &'static str {
    match code {
        "registered" => "Registration complete. Please log in.",
        _ => "Done.",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use musmus_core::{OrderCode, OrderId, OrderStatus, Price, Username};

    use super::*;

    #[test]
    fn test_order_view_formats_fields() {
        let created = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 15).unwrap();
        let order = Order {
            id: OrderId::new(7),
            order_code: OrderCode::new("20261016093015-0001".to_owned()),
            owner: Username::parse("alice").unwrap(),
            line_items: vec![CartLine::new("Genshin", "Welkin", Price::new(90).unwrap()).unwrap()],
            total_price: Price::new(90).unwrap(),
            status: OrderStatus::Paid,
            created_at: created,
            completed_at: None,
        };

        let view = OrderView::from(&order);
        assert_eq!(view.id, 7);
        assert_eq!(view.status, "paid");
        assert!(view.is_paid);
        assert_eq!(view.created_at, "2026-10-16 09:30:15 UTC");
        assert!(view.completed_at.is_none());
        assert_eq!(view.lines[0].item, "Welkin");
    }

    #[test]
    fn test_unknown_error_code_has_generic_message() {
        assert_eq!(error_message("empty_cart"), "Your cart is empty.");
        assert!(error_message("<script>").starts_with("Something went wrong"));
    }
}
