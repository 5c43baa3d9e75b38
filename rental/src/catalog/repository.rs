//! Car repository trait.

use super::model::Car;
use super::query::{CarPage, CarQuery};
use crate::error::Result;
use crate::reviews::RatingSummary;
use crate::types::CarId;
use async_trait::async_trait;

/// Car repository.
///
/// Abstracts over the catalog store (`PostgreSQL` in production, in-memory
/// in tests).
#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Get a car by id, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    async fn find(&self, id: CarId) -> Result<Option<Car>>;

    /// Filter, sort and page the catalog.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    async fn search(&self, query: &CarQuery) -> Result<CarPage>;

    /// Add a car to the catalog.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The car fails validation
    /// - The license plate is already registered → `RentalError::Conflict`
    async fn insert(&self, car: Car) -> Result<Car>;

    /// Overwrite the cached rating aggregate of a car.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    async fn update_rating(&self, id: CarId, summary: RatingSummary) -> Result<()>;
}
