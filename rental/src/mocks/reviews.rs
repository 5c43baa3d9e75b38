//! Mock review repository for testing.

use super::poisoned;
use crate::error::{RentalError, Result};
use crate::reviews::{Review, ReviewRepository};
use crate::types::{CarId, UserId};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Mock review repository.
#[derive(Debug, Clone, Default)]
pub struct MockReviewRepository {
    reviews: Arc<Mutex<Vec<Review>>>,
}

impl MockReviewRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for MockReviewRepository {
    async fn insert(&self, review: Review) -> Result<Review> {
        let mut reviews = self.reviews.lock().map_err(poisoned)?;
        if reviews
            .iter()
            .any(|r| r.car_id == review.car_id && r.user_id == review.user_id)
        {
            return Err(RentalError::Conflict("Review already exists".to_string()));
        }
        reviews.push(review.clone());
        Ok(review)
    }

    async fn exists(&self, car_id: CarId, user_id: UserId) -> Result<bool> {
        Ok(self
            .reviews
            .lock()
            .map_err(poisoned)?
            .iter()
            .any(|r| r.car_id == car_id && r.user_id == user_id))
    }

    async fn list_for_car(&self, car_id: CarId) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .reviews
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.car_id == car_id)
            .cloned()
            .collect();
        // Newest first; on equal timestamps the later insert comes first.
        reviews.reverse();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn ratings_for_car(&self, car_id: CarId) -> Result<Vec<i16>> {
        Ok(self
            .reviews
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.car_id == car_id)
            .map(|r| r.rating)
            .collect())
    }
}
