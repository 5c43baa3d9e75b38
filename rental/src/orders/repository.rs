//! Order repository trait.

use super::lifecycle::Transition;
use super::model::Order;
use crate::error::Result;
use crate::types::{CarId, OrderStatus, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Order repository.
///
/// Status changes go through [`transition`](Self::transition) only, which
/// is a single conditional update: the order moves only while it is
/// `pending`. There is no read-modify-write of the status anywhere.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a new order.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - The session id is already used → `RentalError::Conflict`
    async fn insert(&self, order: Order) -> Result<Order>;

    /// Find the order for a checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>>;

    /// Orders of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Move the order for `session_id` from `pending` to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn transition(
        &self,
        session_id: &str,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition<Order>>;

    /// Whether `car_id` is booked on any day in `[from, until)`.
    ///
    /// Counts `paid` orders, and `pending` orders created at or after
    /// `pending_since` (older pending orders belong to expired sessions).
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn has_overlap(
        &self,
        car_id: CarId,
        from: NaiveDate,
        until: NaiveDate,
        pending_since: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Whether `order` occupies any day in `[from, until)` as seen from
/// `pending_since`. Shared by the in-memory store.
#[must_use]
pub fn blocks_window(
    order: &Order,
    from: NaiveDate,
    until: NaiveDate,
    pending_since: DateTime<Utc>,
) -> bool {
    let active = match order.status {
        OrderStatus::Paid => true,
        OrderStatus::Pending => order.created_at >= pending_since,
        OrderStatus::Cancelled => false,
    };
    let days = u64::try_from(order.days.max(1)).unwrap_or(1);
    let occupied_until = order.pickup_date + chrono::Days::new(days);
    active && order.pickup_date < until && from < occupied_until
}
