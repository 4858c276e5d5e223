//! Order ledger repository.
//!
//! Orders are inserted once at checkout and afterwards only their `status`
//! and `completed_at` columns change, always through [`OrderRepository::update_status`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use musmus_core::{CartLine, OrderCode, OrderId, OrderStatus, Price, Transition, Username};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewOrder, Order};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_code: String,
    owner_username: String,
    line_items: String,
    total_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("order {}: invalid {what}: {e}", row.id))
        };

        let owner = Username::parse(&row.owner_username).map_err(|e| corrupt("owner", &e))?;
        let line_items: Vec<CartLine> =
            serde_json::from_str(&row.line_items).map_err(|e| corrupt("line_items", &e))?;
        let total_price = Price::new(row.total_price).map_err(|e| corrupt("total_price", &e))?;
        let status = OrderStatus::parse(&row.status).map_err(|e| corrupt("status", &e))?;

        if status.is_completed() != row.completed_at.is_some() {
            return Err(RepositoryError::DataCorruption(format!(
                "order {}: completed_at does not match status {status}",
                row.id
            )));
        }

        Ok(Self {
            id: OrderId::new(row.id),
            order_code: OrderCode::new(row.order_code),
            owner,
            line_items,
            total_price,
            status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new order with status `pending_payment`.
    ///
    /// The insert runs in its own transaction; the returned order is only
    /// produced after the commit succeeded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order code is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let line_items = serde_json::to_string(&new.line_items).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to encode line items: {e}"))
        })?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (order_code, owner_username, line_items, total_price, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, order_code, owner_username, line_items, total_price,
                      status, created_at, completed_at
            ",
        )
        .bind(new.order_code.as_str())
        .bind(&new.owner)
        .bind(line_items)
        .bind(new.total_price.amount())
        .bind(OrderStatus::PendingPayment.as_str())
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order code"))?;

        tx.commit().await?;

        row.try_into()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_code, owner_username, line_items, total_price,
                   status, created_at, completed_at
            FROM orders
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// All orders of one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_by_owner(&self, owner: &Username) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_code, owner_username, line_items, total_price,
                   status, created_at, completed_at
            FROM orders
            WHERE owner_username = ?
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Orders that are not completed yet, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_pending(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_code, owner_username, line_items, total_price,
                   status, created_at, completed_at
            FROM orders
            WHERE status != 'completed'
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Orders completed at or after `since`, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_completed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_code, owner_username, line_items, total_price,
                   status, created_at, completed_at
            FROM orders
            WHERE status = 'completed' AND completed_at >= ?
            ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Apply a planned status change if the order still has `transition.from`.
    ///
    /// `completed_at` is written in the same statement: `now` when the
    /// transition completes the order, otherwise left empty.
    ///
    /// Returns `false` when no row matched, i.e. the order does not exist or
    /// its status changed since the transition was planned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let completed_at = transition.completes().then_some(now);

        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = ?, completed_at = ?
            WHERE id = ? AND status = ?
            ",
        )
        .bind(transition.to.as_str())
        .bind(completed_at)
        .bind(id)
        .bind(transition.from.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count orders that are not completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status != 'completed'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count orders completed at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_completed_since(&self, since: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE status = 'completed' AND completed_at >= ?",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::{AccountRepository, test_pool};

    async fn seed_account(pool: &SqlitePool, name: &str) -> Username {
        let username = Username::parse(name).unwrap();
        AccountRepository::new(pool)
            .create(&username, "hash")
            .await
            .unwrap();
        username
    }

    fn new_order(owner: &Username, code: &str, created_at: DateTime<Utc>) -> NewOrder {
        let line = CartLine::new("Genshin", "Welkin", Price::new(90).unwrap()).unwrap();
        NewOrder {
            order_code: OrderCode::new(code.to_owned()),
            owner: owner.clone(),
            line_items: vec![line],
            total_price: Price::new(90).unwrap(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_create_roundtrips_snapshot() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);

        let created = repo
            .create(&new_order(&alice, "20261016120000-0001", Utc::now()))
            .await
            .unwrap();
        assert_eq!(created.status, OrderStatus::PendingPayment);
        assert!(created.completed_at.is_none());

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_code.as_str(), "20261016120000-0001");
        assert_eq!(fetched.line_items, created.line_items);
        assert_eq!(fetched.total_price.amount(), 90);
        assert_eq!(fetched.owner, alice);
    }

    #[tokio::test]
    async fn test_duplicate_order_code_conflicts() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);

        let order = new_order(&alice, "20261016120000-0001", Utc::now());
        repo.create(&order).await.unwrap();
        let err = repo.create(&order).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let bob = seed_account(&pool, "bob").await;
        let repo = OrderRepository::new(&pool);
        let now = Utc::now();

        repo.create(&new_order(&alice, "A-1", now - Duration::hours(2)))
            .await
            .unwrap();
        repo.create(&new_order(&alice, "A-2", now)).await.unwrap();
        repo.create(&new_order(&bob, "B-1", now)).await.unwrap();

        let orders = repo.list_by_owner(&alice).await.unwrap();
        let codes: Vec<_> = orders.iter().map(|o| o.order_code.as_str()).collect();
        assert_eq!(codes, ["A-2", "A-1"]);
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);
        let order = repo
            .create(&new_order(&alice, "A-1", Utc::now()))
            .await
            .unwrap();

        let to_paid = OrderStatus::PendingPayment
            .plan_transition(&OrderStatus::Paid)
            .unwrap();
        assert!(repo.update_status(order.id, &to_paid, Utc::now()).await.unwrap());
        // Second application no longer matches the expected status.
        assert!(!repo.update_status(order.id, &to_paid, Utc::now()).await.unwrap());

        let to_completed = OrderStatus::Paid
            .plan_transition(&OrderStatus::Completed)
            .unwrap();
        let now = Utc::now();
        assert!(repo.update_status(order.id, &to_completed, now).await.unwrap());

        let fetched = repo.get(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, OrderStatus::Completed);
        assert_eq!(fetched.completed_at, Some(now));
    }

    #[tokio::test]
    async fn test_pending_and_completed_lists() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);
        let now = Utc::now();

        let open = repo.create(&new_order(&alice, "A-1", now)).await.unwrap();
        let done = repo.create(&new_order(&alice, "A-2", now)).await.unwrap();

        let to_paid = OrderStatus::PendingPayment
            .plan_transition(&OrderStatus::Paid)
            .unwrap();
        let to_completed = OrderStatus::Paid
            .plan_transition(&OrderStatus::Completed)
            .unwrap();
        repo.update_status(done.id, &to_paid, now).await.unwrap();
        repo.update_status(done.id, &to_completed, now).await.unwrap();

        let pending = repo.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);

        let completed = repo
            .list_completed_since(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        assert!(
            repo.list_completed_since(now + Duration::seconds(1))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(repo.count_pending().await.unwrap(), 1);
        assert_eq!(
            repo.count_completed_since(now - Duration::days(30))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_malformed_line_items_is_data_corruption() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);
        let order = repo
            .create(&new_order(&alice, "A-1", Utc::now()))
            .await
            .unwrap();

        sqlx::query("UPDATE orders SET line_items = 'not json' WHERE id = ?")
            .bind(order.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = repo.get(order.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
        let err = repo.list_by_owner(&alice).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_schema_rejects_completed_at_without_completed_status() {
        let pool = test_pool().await;
        let alice = seed_account(&pool, "alice").await;
        let repo = OrderRepository::new(&pool);
        let order = repo
            .create(&new_order(&alice, "A-1", Utc::now()))
            .await
            .unwrap();

        let result = sqlx::query("UPDATE orders SET completed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(order.id)
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
