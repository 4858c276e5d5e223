//! Order domain types.

use chrono::{DateTime, Utc};

use musmus_core::{CartLine, OrderCode, OrderId, OrderStatus, Price, Username};

/// A persisted order: a frozen snapshot of a cart plus its lifecycle status.
///
/// `line_items`, `total_price`, `owner` and `order_code` never change after
/// checkout. `completed_at` is set exactly when `status` is `completed`.
#[derive(Debug, Clone)]
pub struct Order {
    /// Database ID.
    pub id: OrderId,
    /// Customer-facing order code.
    pub order_code: OrderCode,
    /// Username of the account that checked out.
    pub owner: Username,
    /// Cart lines at checkout time.
    pub line_items: Vec<CartLine>,
    /// Sum of the line prices at checkout time.
    pub total_price: Price,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order reached `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Data for inserting a new order at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: OrderCode,
    pub owner: Username,
    pub line_items: Vec<CartLine>,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
}
