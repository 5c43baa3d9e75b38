//! Mock order repository for testing.

use super::poisoned;
use crate::error::{RentalError, Result};
use crate::orders::{Order, OrderRepository, Transition, blocks_window};
use crate::types::{CarId, OrderStatus, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock order repository.
///
/// Orders are keyed by session id. The conditional transition runs under
/// the lock, matching the single-statement update of the real store.
#[derive(Debug, Clone, Default)]
pub struct MockOrderRepository {
    orders: Arc<Mutex<HashMap<String, Order>>>,
    transitions: Arc<AtomicUsize>,
}

impl MockOrderRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn count(&self) -> usize {
        self.orders.lock().map_or(0, |o| o.len())
    }

    /// Number of status changes actually applied.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut orders = self.orders.lock().map_err(poisoned)?;
        if orders.contains_key(&order.stripe_session_id) {
            return Err(RentalError::Conflict(
                "An order already exists for this session".to_string(),
            ));
        }
        orders.insert(order.stripe_session_id.clone(), order.clone());
        Ok(order)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.lock().map_err(poisoned)?.get(session_id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .map_err(poisoned)?
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition(
        &self,
        session_id: &str,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition<Order>> {
        let mut orders = self.orders.lock().map_err(poisoned)?;
        let Some(order) = orders.get_mut(session_id) else {
            return Ok(Transition::NotFound);
        };
        if !order.status.can_transition_to(to) {
            return Ok(Transition::Unchanged(order.clone()));
        }
        order.status = to;
        order.updated_at = now;
        self.transitions.fetch_add(1, Ordering::SeqCst);
        Ok(Transition::Applied(order.clone()))
    }

    async fn has_overlap(
        &self,
        car_id: CarId,
        from: NaiveDate,
        until: NaiveDate,
        pending_since: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .orders
            .lock()
            .map_err(poisoned)?
            .values()
            .any(|o| o.car_id == car_id && blocks_window(o, from, until, pending_since)))
    }
}
