//! Review repository trait.

use super::model::Review;
use crate::error::Result;
use crate::types::{CarId, UserId};
use async_trait::async_trait;

/// Review repository.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Store a review.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - The (car, user) pair already has a review → `RentalError::Conflict`
    async fn insert(&self, review: Review) -> Result<Review>;

    /// Whether `user_id` has already reviewed `car_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn exists(&self, car_id: CarId, user_id: UserId) -> Result<bool>;

    /// Reviews of a car, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn list_for_car(&self, car_id: CarId) -> Result<Vec<Review>>;

    /// Every rating given to a car.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn ratings_for_car(&self, car_id: CarId) -> Result<Vec<i16>>;
}
