//! Checkout and order lifecycle.
//!
//! [`OrderService::checkout`] turns the session cart into a persisted order;
//! [`OrderService::update_status`] drives an order through the status
//! state machine defined by [`OrderStatus::plan_transition`].

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use musmus_core::{
    Cart, OrderCodeGenerator, OrderId, OrderStatus, TransitionError, Username,
};

use super::cart::{CartSession, CartSessionError};
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order};

/// Attempts at inserting an order before giving up on code collisions.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Attempts at a status compare-and-set before reporting a conflict.
const MAX_STATUS_ATTEMPTS: usize = 3;

/// Errors that can occur at checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out. No order is created.
    #[error("cart is empty")]
    EmptyCart,

    /// The session cart could not be read.
    #[error(transparent)]
    Cart(#[from] CartSessionError),

    /// The order could not be persisted. The cart is left intact.
    #[error("failed to persist order: {0}")]
    Repository(#[from] RepositoryError),
}

/// Why a requested status change was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The state machine does not allow it.
    Illegal(TransitionError),
    /// The status kept changing underneath the request.
    Conflict,
}

/// Result of a status change request.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The change was persisted; carries the updated order.
    Applied(Order),
    /// Nothing was written.
    Rejected(RejectReason),
}

/// Order checkout and lifecycle service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    codes: &'a OrderCodeGenerator,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, codes: &'a OrderCodeGenerator) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            codes,
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Check out the session cart for `owner`.
    ///
    /// The order is committed before the cart is cleared, so a persistence
    /// failure leaves the cart as it was and the customer can retry.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy.
    /// Returns `CheckoutError::Repository` if the order cannot be stored.
    pub async fn checkout(
        &self,
        cart: &CartSession<'_>,
        owner: &Username,
    ) -> Result<Order, CheckoutError> {
        self.checkout_at(cart, owner, Utc::now()).await
    }

    async fn checkout_at(
        &self,
        cart: &CartSession<'_>,
        owner: &Username,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        let snapshot = cart.load().await?;
        let order = self.place_order(snapshot, owner, now).await?;

        // The order is durable at this point. Failing the request now would
        // invite a retry that places it twice, so a stale cart is only logged.
        if let Err(e) = cart.clear().await {
            error!(order_code = %order.order_code, error = %e, "Failed to clear cart after checkout");
        }

        Ok(order)
    }

    async fn place_order(
        &self,
        cart: Cart,
        owner: &Username,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total_price = cart.total();
        let line_items = cart.into_lines();

        let mut attempt = 1;
        loop {
            let new_order = NewOrder {
                order_code: self.codes.next_code(now),
                owner: owner.clone(),
                line_items: line_items.clone(),
                total_price,
                created_at: now,
            };

            match self.orders.create(&new_order).await {
                Ok(order) => {
                    info!(
                        order_code = %order.order_code,
                        owner = %order.owner,
                        total = %order.total_price,
                        lines = order.line_items.len(),
                        "Order placed"
                    );
                    return Ok(order);
                }
                Err(RepositoryError::Conflict(_)) if attempt < MAX_CODE_ATTEMPTS => {
                    warn!(order_code = %new_order.order_code, attempt, "Order code collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Move an order to `requested`, if the state machine allows it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        requested: &OrderStatus,
    ) -> Result<TransitionOutcome, RepositoryError> {
        self.update_status_at(id, requested, Utc::now()).await
    }

    /// Like [`Self::update_status`], with an explicit completion time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status_at(
        &self,
        id: OrderId,
        requested: &OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, RepositoryError> {
        for _ in 0..MAX_STATUS_ATTEMPTS {
            let order = self.orders.get(id).await?.ok_or(RepositoryError::NotFound)?;

            let transition = match order.status.plan_transition(requested) {
                Ok(transition) => transition,
                Err(reason) => {
                    info!(
                        order_code = %order.order_code,
                        from = %order.status,
                        to = %requested,
                        %reason,
                        "Status change rejected"
                    );
                    return Ok(TransitionOutcome::Rejected(RejectReason::Illegal(reason)));
                }
            };

            if self.orders.update_status(id, &transition, now).await? {
                info!(
                    order_code = %order.order_code,
                    from = %transition.from,
                    to = %transition.to,
                    "Order status updated"
                );
                let completed_at = transition.completes().then_some(now);
                return Ok(TransitionOutcome::Applied(Order {
                    status: transition.to,
                    completed_at,
                    ..order
                }));
            }

            debug!(order_code = %order.order_code, "Order status changed concurrently, re-planning");
        }

        warn!(order_id = %id, to = %requested, "Giving up on contended status change");
        Ok(TransitionOutcome::Rejected(RejectReason::Conflict))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or the row is corrupt.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.orders.get(id).await
    }

    /// All orders of one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is corrupt.
    pub async fn orders_for(&self, owner: &Username) -> Result<Vec<Order>, RepositoryError> {
        self.orders.list_by_owner(owner).await
    }

    /// Orders not yet completed, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is corrupt.
    pub async fn pending(&self) -> Result<Vec<Order>, RepositoryError> {
        self.orders.list_pending().await
    }

    /// Orders completed within the last `window`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is corrupt.
    pub async fn recently_completed(&self, window: Duration) -> Result<Vec<Order>, RepositoryError> {
        self.orders.list_completed_since(Utc::now() - window).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::TimeZone;
    use tokio::task::JoinSet;

    use musmus_core::{OrderCode, Price};

    use super::*;
    use crate::db::{AccountRepository, test_pool};
    use crate::services::cart::tests::memory_session;

    async fn seed_account(pool: &SqlitePool, name: &str) -> Username {
        let username = Username::parse(name).unwrap();
        AccountRepository::new(pool)
            .create(&username, "hash")
            .await
            .unwrap();
        username
    }

    async fn fill_cart(cart: &CartSession<'_>) {
        cart.add_line("Genshin", "60 crystals", Price::new(30).unwrap())
            .await
            .unwrap();
        cart.add_line("Arknights", "Monthly card", Price::new(120).unwrap())
            .await
            .unwrap();
    }

    async fn place(pool: &SqlitePool, codes: &OrderCodeGenerator, owner: &Username) -> Order {
        let session = memory_session();
        let cart = CartSession::new(&session);
        fill_cart(&cart).await;
        OrderService::new(pool, codes)
            .checkout(&cart, owner)
            .await
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_freezes_cart_and_clears_it() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let session = memory_session();
        let cart = CartSession::new(&session);
        fill_cart(&cart).await;

        let order = OrderService::new(&pool, &codes)
            .checkout(&cart, &alice)
            .await
            .unwrap();

        assert_eq!(order.total_price.amount(), 150);
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].product_label, "Genshin");
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert!(order.completed_at.is_none());
        assert!(cart.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_noop() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let session = memory_session();
        let service = OrderService::new(&pool, &codes);

        let err = service
            .checkout(&CartSession::new(&session), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(service.orders_for(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        // No account row: the owner foreign key makes the insert fail.
        let ghost = Username::parse("ghost").unwrap();
        let session = memory_session();
        let cart = CartSession::new(&session);
        fill_cart(&cart).await;

        let err = OrderService::new(&pool, &codes)
            .checkout(&cart, &ghost)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Repository(_)));
        assert_eq!(cart.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_retries_on_code_collision() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();

        // Another process already used the first code of this second.
        OrderRepository::new(&pool)
            .create(&NewOrder {
                order_code: OrderCode::new("20261016120000-0001".to_owned()),
                owner: alice.clone(),
                line_items: Vec::new(),
                total_price: Price::ZERO,
                created_at: now,
            })
            .await
            .unwrap();

        let codes = OrderCodeGenerator::new();
        let session = memory_session();
        let cart = CartSession::new(&session);
        fill_cart(&cart).await;

        let order = OrderService::new(&pool, &codes)
            .checkout_at(&cart, &alice, now)
            .await
            .unwrap();
        assert_eq!(order.order_code.as_str(), "20261016120000-0002");
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_get_distinct_codes() {
        let pool = test_pool().await;
        let codes = Arc::new(OrderCodeGenerator::new());
        let alice = seed_account(&pool, "alice").await;

        let mut tasks = JoinSet::new();
        for _ in 0..20 {
            let pool = pool.clone();
            let codes = Arc::clone(&codes);
            let alice = alice.clone();
            tasks.spawn(async move { place(&pool, &codes, &alice).await.order_code });
        }

        let mut seen = HashSet::new();
        while let Some(code) = tasks.join_next().await {
            assert!(seen.insert(code.unwrap()), "duplicate order code");
        }
        assert_eq!(seen.len(), 20);

        let service = OrderService::new(&pool, &codes);
        assert_eq!(service.orders_for(&alice).await.unwrap().len(), 20);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pending_to_completed_is_rejected() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let order = place(&pool, &codes, &alice).await;
        let service = OrderService::new(&pool, &codes);

        let outcome = service
            .update_status(order.id, &OrderStatus::Completed)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            TransitionOutcome::Rejected(RejectReason::Illegal(
                TransitionError::CompletionRequiresPaid { .. }
            ))
        ));

        let stored = service.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::PendingPayment);
        assert!(stored.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_completed_at_set_once() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let order = place(&pool, &codes, &alice).await;
        let service = OrderService::new(&pool, &codes);

        let paid = service
            .update_status(order.id, &OrderStatus::Paid)
            .await
            .unwrap();
        let TransitionOutcome::Applied(paid) = paid else {
            panic!("expected paid to apply");
        };
        assert!(paid.completed_at.is_none());

        let first = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let completed = service
            .update_status_at(order.id, &OrderStatus::Completed, first)
            .await
            .unwrap();
        assert!(matches!(completed, TransitionOutcome::Applied(_)));

        let again = service
            .update_status_at(order.id, &OrderStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            again,
            TransitionOutcome::Rejected(RejectReason::Illegal(TransitionError::Unchanged))
        ));

        let stored = service.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.completed_at, Some(first));
    }

    #[tokio::test]
    async fn test_completed_is_terminal_and_no_regression() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let order = place(&pool, &codes, &alice).await;
        let service = OrderService::new(&pool, &codes);

        service.update_status(order.id, &OrderStatus::Paid).await.unwrap();
        let back = service
            .update_status(order.id, &OrderStatus::PendingPayment)
            .await
            .unwrap();
        assert!(matches!(
            back,
            TransitionOutcome::Rejected(RejectReason::Illegal(TransitionError::Regression { .. }))
        ));

        service
            .update_status(order.id, &OrderStatus::Completed)
            .await
            .unwrap();
        let cancel = service
            .update_status(order.id, &OrderStatus::parse("cancelled").unwrap())
            .await
            .unwrap();
        assert!(matches!(
            cancel,
            TransitionOutcome::Rejected(RejectReason::Illegal(TransitionError::AlreadyCompleted))
        ));
    }

    #[tokio::test]
    async fn test_custom_status_label_is_applied() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let order = place(&pool, &codes, &alice).await;
        let service = OrderService::new(&pool, &codes);

        let cancelled = OrderStatus::parse("cancelled").unwrap();
        let outcome = service.update_status(order.id, &cancelled).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied(_)));

        // Still listed as not completed.
        let pending = service.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, cancelled);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let service = OrderService::new(&pool, &codes);

        let err = service
            .update_status(OrderId::new(404), &OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_recently_completed_window() {
        let pool = test_pool().await;
        let codes = OrderCodeGenerator::new();
        let alice = seed_account(&pool, "alice").await;
        let service = OrderService::new(&pool, &codes);
        let now = Utc::now();

        let recent = place(&pool, &codes, &alice).await;
        let old = place(&pool, &codes, &alice).await;
        for (order, completed_at) in [
            (&recent, now - Duration::days(29)),
            (&old, now - Duration::days(31)),
        ] {
            service.update_status(order.id, &OrderStatus::Paid).await.unwrap();
            service
                .update_status_at(order.id, &OrderStatus::Completed, completed_at)
                .await
                .unwrap();
        }

        let listed = service.recently_completed(Duration::days(30)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, recent.id);
        assert!(service.pending().await.unwrap().is_empty());
    }
}
