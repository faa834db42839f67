use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderItemId, ProductId, UserId};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Money, NewOrder, Order, OrderId, OrderItem, OrderStatus, OrderStoreError, Result,
    store::{OrderStore, check_constraints},
};

const ORDER_COLUMNS: &str =
    "id, user_id, status, total_amount, created_at, updated_at, deleted_at";

/// PostgreSQL-backed order store implementation.
///
/// Orders live in `orders`, their items in `order_items`. Deletion is soft:
/// `deleted_at` is set on both tables and every query filters on it.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Opens a read-only transaction whose statements share one snapshot, so
    /// an order and its items are read as of the same moment.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    fn row_to_order(row: &PgRow, order_items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| OrderStoreError::CorruptRow(e.to_string()))?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            status,
            total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
            order_items,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| OrderStoreError::CorruptRow(format!("negative quantity {quantity}")))?;

        Ok(OrderItem {
            id: OrderItemId::new(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity,
            unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
        })
    }

    async fn load_items(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1 AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(conn)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(user_id = %order.user_id, items = order.order_items.len()))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        check_constraints(&order)?;

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO orders (user_id, status, total_amount) VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id.as_i64())
        .bind(order.status.as_str())
        .bind(order.total_amount.amount())
        .fetch_one(&mut *tx)
        .await?;
        let order_id = OrderId::new(row.try_get("id")?);

        // Insert all items
        let mut items = Vec::with_capacity(order.order_items.len());
        for item in &order.order_items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                OrderStoreError::ConstraintViolation(format!(
                    "quantity {} out of range",
                    item.quantity
                ))
            })?;

            let item_row = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, product_id, quantity, unit_price
                "#,
            )
            .bind(order_id.as_i64())
            .bind(item.product_id.as_i64())
            .bind(quantity)
            .bind(item.unit_price.amount())
            .fetch_one(&mut *tx)
            .await?;

            items.push(Self::row_to_item(&item_row)?);
        }

        let stored = Self::row_to_order(&row, items)?;
        tx.commit().await?;

        tracing::debug!(order_id = %stored.id, "order persisted");
        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let mut tx = self.begin_snapshot().await?;

        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        let order = match row {
            Some(row) => {
                let items = Self::load_items(&mut *tx, id).await?;
                Some(Self::row_to_order(&row, items)?)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut tx = self.begin_snapshot().await?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NULL ORDER BY id ASC"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<_, _>>()?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_id, id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1) AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: i64 = row.try_get("order_id")?;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                let items = items_by_order.remove(&id).unwrap_or_default();
                Self::row_to_order(row, items)
            })
            .collect()
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn update(&self, order: &Order) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $2, total_amount = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id.as_i64())
        .bind(order.status.as_str())
        .bind(order.total_amount.amount())
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or(OrderStoreError::NotFound(order.id))?;
        let items = Self::load_items(&mut *tx, order.id).await?;
        let updated = Self::row_to_order(&row, items)?;

        tx.commit().await?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(id));
        }

        sqlx::query(
            "UPDATE order_items SET deleted_at = NOW() WHERE order_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
