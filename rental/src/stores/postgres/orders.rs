//! `PostgreSQL` order repository.
//!
//! The status transition is one conditional statement:
//!
//! ```sql
//! UPDATE orders SET status = $2 WHERE stripe_session_id = $1 AND status = 'pending'
//! ```
//!
//! When it touches no row, a follow-up read tells an already-settled order
//! apart from an unknown session. Concurrent webhook and verification calls
//! cannot both apply.

use super::{cents, conflict_on_unique, money_from_cents, parse_literal};
use crate::error::{RentalError, Result};
use crate::orders::{Order, OrderRepository, Transition};
use crate::types::{CarId, OrderId, OrderStatus, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, car_id, pickup_location, dropoff_location, \
     pickup_date, dropoff_date, pickup_time, dropoff_time, additional_note, days, total_cents, \
     status, stripe_session_id, created_at, updated_at";

/// `PostgreSQL` order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    car_id: Uuid,
    pickup_location: String,
    dropoff_location: String,
    pickup_date: NaiveDate,
    dropoff_date: NaiveDate,
    pickup_time: String,
    dropoff_time: String,
    additional_note: Option<String>,
    days: i32,
    total_cents: i64,
    status: String,
    stripe_session_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RentalError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            car_id: CarId::from_uuid(row.car_id),
            pickup_location: row.pickup_location,
            dropoff_location: row.dropoff_location,
            pickup_date: row.pickup_date,
            dropoff_date: row.dropoff_date,
            pickup_time: row.pickup_time,
            dropoff_time: row.dropoff_time,
            additional_note: row.additional_note,
            days: row.days,
            total: money_from_cents(row.total_cents)?,
            status: parse_literal(&row.status, "status")?,
            stripe_session_id: row.stripe_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: Order) -> Result<Order> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.car_id.as_uuid())
        .bind(&order.pickup_location)
        .bind(&order.dropoff_location)
        .bind(order.pickup_date)
        .bind(order.dropoff_date)
        .bind(&order.pickup_time)
        .bind(&order.dropoff_time)
        .bind(&order.additional_note)
        .bind(order.days)
        .bind(cents(order.total)?)
        .bind(order.status.as_str())
        .bind(&order.stripe_session_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "An order already exists for this session"))?;

        Ok(order)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn transition(
        &self,
        session_id: &str,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition<Order>> {
        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, updated_at = $3 \
             WHERE stripe_session_id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(session_id)
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(Transition::Applied(Order::try_from(row)?));
        }

        Ok(match self.find_by_session(session_id).await? {
            Some(order) => Transition::Unchanged(order),
            None => Transition::NotFound,
        })
    }

    async fn has_overlap(
        &self,
        car_id: CarId,
        from: NaiveDate,
        until: NaiveDate,
        pending_since: DateTime<Utc>,
    ) -> Result<bool> {
        let overlapping: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
                SELECT 1 FROM orders \
                WHERE car_id = $1 \
                  AND pickup_date < $3 \
                  AND pickup_date + GREATEST(days, 1) > $2 \
                  AND (status = 'paid' OR (status = 'pending' AND created_at >= $4))\
             )",
        )
        .bind(car_id.as_uuid())
        .bind(from)
        .bind(until)
        .bind(pending_since)
        .fetch_one(&self.pool)
        .await?;
        Ok(overlapping)
    }
}
