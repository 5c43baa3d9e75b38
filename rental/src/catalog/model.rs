//! Car record.

use crate::error::{RentalError, Result};
use crate::types::{CarId, CarType, FuelType, Money, Transmission};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A rental vehicle.
///
/// `average_rating` and `total_reviews` are caches over the review
/// collection for this car. They are only ever written by the review
/// store's re-aggregation, never from a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    /// Car id
    pub id: CarId,
    /// Manufacturer
    pub brand: String,
    /// Model name
    pub model_name: String,
    /// Model year
    pub year: i32,
    /// Gearbox
    pub transmission: Transmission,
    /// Fuel / drive
    pub fuel_type: FuelType,
    /// Seat count
    pub seats: i32,
    /// Daily price
    pub price_per_day: Money,
    /// Image URLs, never empty
    pub images: Vec<String>,
    /// Listing text
    pub description: String,
    /// Feature list ("Bluetooth", "GPS", ...)
    pub features: Vec<String>,
    /// Pickup city
    pub location: String,
    /// Bookable right now
    pub is_available: bool,
    /// Mean review rating, one decimal, 0 when unreviewed
    pub average_rating: f64,
    /// Number of reviews
    pub total_reviews: i32,
    /// Odometer reading
    pub mileage: i32,
    /// Paint color
    pub color: String,
    /// Registration plate, uppercase, unique
    pub license_plate: String,
    /// Body type
    pub car_type: CarType,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Car {
    /// Display name used on the hosted checkout page.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.brand, self.model_name, self.year)
    }

    /// Normalise and check a catalog entry before it is stored.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::Validation` naming the first violated constraint.
    pub fn validate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.license_plate = self.license_plate.trim().to_uppercase();

        if self.brand.trim().is_empty() || self.model_name.trim().is_empty() {
            return Err(RentalError::Validation(
                "Brand and model name are required".to_string(),
            ));
        }
        if !(2000..=now.year() + 1).contains(&self.year) {
            return Err(RentalError::Validation(format!(
                "Year must be between 2000 and {}",
                now.year() + 1
            )));
        }
        if !(2..=9).contains(&self.seats) {
            return Err(RentalError::Validation(
                "Seats must be between 2 and 9".to_string(),
            ));
        }
        if self.price_per_day == Money::ZERO {
            return Err(RentalError::Validation(
                "Price per day must be positive".to_string(),
            ));
        }
        if self.images.is_empty() {
            return Err(RentalError::Validation(
                "At least one image is required".to_string(),
            ));
        }
        let description_len = self.description.chars().count();
        if !(20..=1000).contains(&description_len) {
            return Err(RentalError::Validation(
                "Description must be between 20 and 1000 characters".to_string(),
            ));
        }
        if self.mileage < 0 {
            return Err(RentalError::Validation(
                "Mileage cannot be negative".to_string(),
            ));
        }
        if self.license_plate.is_empty() {
            return Err(RentalError::Validation(
                "License plate is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Car summary embedded in order listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    /// Car id
    pub id: CarId,
    /// Manufacturer
    pub brand: String,
    /// Model name
    pub model_name: String,
    /// First image, if any
    pub image: Option<String>,
    /// Daily price
    pub price_per_day: Money,
}

impl From<&Car> for CarSummary {
    fn from(car: &Car) -> Self {
        Self {
            id: car.id,
            brand: car.brand.clone(),
            model_name: car.model_name.clone(),
            image: car.images.first().cloned(),
            price_per_day: car.price_per_day,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::fixtures::car;

    #[test]
    fn test_validate_uppercases_plate() {
        let mut car = car(100);
        car.validate(car.created_at).unwrap();
        assert_eq!(car.license_plate, "B-TX-123");
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        let mut too_old = car(100);
        too_old.year = 1999;
        assert!(too_old.validate(too_old.created_at).is_err());

        let mut bus = car(100);
        bus.seats = 12;
        assert!(bus.validate(bus.created_at).is_err());

        let mut terse = car(100);
        terse.description = "Nice car".to_string();
        assert!(terse.validate(terse.created_at).is_err());

        let mut no_images = car(100);
        no_images.images.clear();
        assert!(no_images.validate(no_images.created_at).is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(car(100)).unwrap();
        assert_eq!(json["modelName"], "Model 3");
        assert_eq!(json["pricePerDay"], 100.0);
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["carType"], "sedan");
    }

    #[test]
    fn test_summary_takes_first_image() {
        let car = car(80);
        let summary = CarSummary::from(&car);
        assert_eq!(summary.image.as_deref(), Some("https://img.example.com/model3.jpg"));
        assert_eq!(summary.price_per_day, car.price_per_day);
    }
}
