use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "portion_size", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PortionSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

/// Lifecycle: pending → preparing → ready → delivered, cancelled from any
/// live state. Delivered and cancelled have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub client_name: String,
    pub size: PortionSize,
    pub notes: Option<String>,
    pub price: Decimal,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Listing filters; `owner` is set for non-admin callers.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub client_name: Option<String>,
    pub owner: Option<i64>,
}

const COLUMNS: &str = "id, user_id, client_name, size, notes, price, status, created_at, updated_at";

impl Order {
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        client_name: &str,
        size: PortionSize,
        notes: Option<&str>,
        price: Decimal,
    ) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, client_name, size, notes, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(client_name)
        .bind(size)
        .bind(notes)
        .bind(price)
        .fetch_one(db)
        .await?;
        Ok(order)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(order)
    }

    pub async fn list(
        db: &PgPool,
        filter: &OrderFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {COLUMNS} FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR client_name ILIKE '%' || $2 || '%')
              AND ($3::bigint IS NULL OR user_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.status)
        .bind(filter.client_name.as_deref())
        .bind(filter.owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(db: &PgPool, filter: &OrderFilter) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR client_name ILIKE '%' || $2 || '%')
              AND ($3::bigint IS NULL OR user_id = $3)
            "#,
        )
        .bind(filter.status)
        .bind(filter.client_name.as_deref())
        .bind(filter.owner)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn update(
        db: &PgPool,
        id: i64,
        client_name: Option<&str>,
        size: Option<PortionSize>,
        notes: Option<&str>,
        price: Option<Decimal>,
        status: Option<OrderStatus>,
    ) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET
                client_name = COALESCE($2, client_name),
                size = COALESCE($3, size),
                notes = COALESCE($4, notes),
                price = COALESCE($5, price),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(client_name)
        .bind(size)
        .bind(notes)
        .bind(price)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(order)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn status_counts(db: &PgPool) -> anyhow::Result<Vec<(OrderStatus, i64)>> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders GROUP BY status",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
