//! Ready-made records for tests.

use crate::catalog::Car;
use crate::environment::{Clock, test_clock};
use crate::identity::Identity;
use crate::types::{CarId, CarType, FuelType, Money, Transmission, UserId};
use uuid::Uuid;

/// An available Tesla Model 3 in Berlin at `price_per_day` whole units.
#[must_use]
pub fn car(price_per_day: u64) -> Car {
    let now = test_clock().now();
    Car {
        id: CarId::new(),
        brand: "Tesla".to_string(),
        model_name: "Model 3".to_string(),
        year: 2023,
        transmission: Transmission::Automatic,
        fuel_type: FuelType::Electric,
        seats: 5,
        price_per_day: Money::from_cents(price_per_day.saturating_mul(100)),
        images: vec!["https://img.example.com/model3.jpg".to_string()],
        description: "Quiet electric sedan with autopilot and a glass roof.".to_string(),
        features: vec!["Autopilot".to_string(), "Bluetooth".to_string()],
        location: "Berlin".to_string(),
        is_available: true,
        average_rating: 0.0,
        total_reviews: 0,
        mileage: 12_000,
        color: "White".to_string(),
        license_plate: "b-tx-123".to_string(),
        car_type: CarType::Sedan,
        created_at: now,
        updated_at: now,
    }
}

/// Identity for `name`: `"{Name} Tester"`, `{name}@example.com`.
///
/// The user id is derived from the name, so two calls with the same name
/// denote the same user.
#[must_use]
pub fn identity(name: &str) -> Identity {
    let email = format!("{name}@example.com");
    let mut chars = name.chars();
    let first_name = chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default();
    Identity {
        user_id: UserId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_URL, email.as_bytes())),
        email,
        first_name,
        last_name: "Tester".to_string(),
    }
}
