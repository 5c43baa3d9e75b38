//! Mock car repository for testing.

use super::poisoned;
use crate::catalog::{Car, CarPage, CarQuery, CarRepository};
use crate::error::{RentalError, Result};
use crate::reviews::RatingSummary;
use crate::types::CarId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock car repository.
///
/// Uses in-memory storage for testing.
#[derive(Debug, Clone, Default)]
pub struct MockCarRepository {
    cars: Arc<Mutex<HashMap<CarId, Car>>>,
}

impl MockCarRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CarRepository for MockCarRepository {
    async fn find(&self, id: CarId) -> Result<Option<Car>> {
        Ok(self.cars.lock().map_err(poisoned)?.get(&id).cloned())
    }

    async fn search(&self, query: &CarQuery) -> Result<CarPage> {
        let mut matching: Vec<Car> = self
            .cars
            .lock()
            .map_err(poisoned)?
            .values()
            .filter(|car| query.filter.matches(car))
            .cloned()
            .collect();
        query.sort(&mut matching);

        let total_count = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let cars = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(CarPage { cars, total_count })
    }

    async fn insert(&self, mut car: Car) -> Result<Car> {
        car.validate(car.updated_at)?;
        let mut cars = self.cars.lock().map_err(poisoned)?;
        if cars.values().any(|c| c.license_plate == car.license_plate) {
            return Err(RentalError::Conflict(
                "A car with this license plate already exists".to_string(),
            ));
        }
        cars.insert(car.id, car.clone());
        Ok(car)
    }

    async fn update_rating(&self, id: CarId, summary: RatingSummary) -> Result<()> {
        let mut cars = self.cars.lock().map_err(poisoned)?;
        let car = cars
            .get_mut(&id)
            .ok_or_else(|| RentalError::not_found("Car", id))?;
        car.average_rating = summary.average_rating;
        car.total_reviews = summary.total_reviews;
        Ok(())
    }
}
