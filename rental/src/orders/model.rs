//! Order record and checkout input.

use crate::catalog::CarSummary;
use crate::error::{RentalError, Result};
use crate::types::{CarId, Money, OrderId, OrderStatus, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted free-text note, in characters.
pub const MAX_NOTE_CHARS: usize = 500;

/// A booking.
///
/// Created `pending` once the processor has issued a checkout session, then
/// moved exactly once to `paid` or `cancelled`. `stripe_session_id` is
/// unique and is the key every reconciliation path uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id
    pub id: OrderId,
    /// Booking user
    pub user_id: UserId,
    /// Booked car
    pub car_id: CarId,
    /// Where the car is picked up
    pub pickup_location: String,
    /// Where the car is returned
    pub dropoff_location: String,
    /// First rental day
    pub pickup_date: NaiveDate,
    /// Return day
    pub dropoff_date: NaiveDate,
    /// Pickup time, `HH:MM`
    pub pickup_time: String,
    /// Return time, `HH:MM`
    pub dropoff_time: String,
    /// Free-text note for the counter
    pub additional_note: Option<String>,
    /// Billed days, at least 1
    pub days: i32,
    /// Amount charged: days x daily price + service fee
    pub total: Money,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Processor checkout session id
    pub stripe_session_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// An order with a summary of its car, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithCar {
    /// The order
    #[serde(flatten)]
    pub order: Order,
    /// The car, `None` if it has since been removed
    pub car: Option<CarSummary>,
}

/// Body of `POST /api/checkout`.
///
/// Fields are optional at the type level so that a missing one yields a
/// validation message rather than a deserializer error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Car id string
    pub car_id: Option<String>,
    /// Pickup location
    pub pickup_location: Option<String>,
    /// Return location
    pub dropoff_location: Option<String>,
    /// `YYYY-MM-DD`
    pub pickup_date: Option<String>,
    /// `YYYY-MM-DD`
    pub dropoff_date: Option<String>,
    /// `HH:MM`
    pub pickup_time: Option<String>,
    /// `HH:MM`
    pub dropoff_time: Option<String>,
    /// Optional note
    pub additional_note: Option<String>,
    /// Day count as computed by the client
    pub days: Option<i64>,
    /// Total as computed by the client, in major units
    pub total: Option<f64>,
}

/// Validated booking parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    /// Car
    pub car_id: CarId,
    /// Pickup location
    pub pickup_location: String,
    /// Return location
    pub dropoff_location: String,
    /// First day
    pub pickup_date: NaiveDate,
    /// Return day
    pub dropoff_date: NaiveDate,
    /// `HH:MM`
    pub pickup_time: String,
    /// `HH:MM`
    pub dropoff_time: String,
    /// Note
    pub additional_note: Option<String>,
    /// Billed days
    pub days: u32,
    /// Client-computed total
    pub client_total: Money,
}

impl BookingRequest {
    /// Exclusive end of the days this booking occupies.
    #[must_use]
    pub fn occupied_until(&self) -> NaiveDate {
        self.pickup_date + chrono::Days::new(u64::from(self.days))
    }
}

/// Billed days between two dates: the calendar distance, at least 1.
#[must_use]
pub fn rental_days(pickup: NaiveDate, dropoff: NaiveDate) -> u32 {
    let days = (dropoff - pickup).num_days().max(1);
    u32::try_from(days).unwrap_or(u32::MAX)
}

fn required(value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RentalError::Validation("All fields are required".to_string()))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    if value.len() != 10 {
        return Err(RentalError::Validation(format!(
            "{field} must be a date in YYYY-MM-DD format"
        )));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        RentalError::Validation(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

fn parse_time(value: &str, field: &str) -> Result<String> {
    if value.len() != 5 || NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        return Err(RentalError::Validation(format!(
            "{field} must be a time in HH:MM format"
        )));
    }
    Ok(value.to_string())
}

impl CheckoutRequest {
    /// Check the request shape against `today`.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::Validation` naming the first problem.
    pub fn validate(self, today: NaiveDate) -> Result<BookingRequest> {
        let car_id = required(self.car_id)?;
        let pickup_location = required(self.pickup_location)?;
        let dropoff_location = required(self.dropoff_location)?;
        let pickup_date = required(self.pickup_date)?;
        let dropoff_date = required(self.dropoff_date)?;
        let pickup_time = required(self.pickup_time)?;
        let dropoff_time = required(self.dropoff_time)?;
        let (Some(client_days), Some(client_total)) = (self.days, self.total) else {
            return Err(RentalError::Validation("All fields are required".to_string()));
        };

        let car_id = car_id
            .parse::<CarId>()
            .map_err(|_| RentalError::Validation("Invalid car ID".to_string()))?;
        let pickup_date = parse_date(&pickup_date, "pickupDate")?;
        let dropoff_date = parse_date(&dropoff_date, "dropoffDate")?;
        let pickup_time = parse_time(&pickup_time, "pickupTime")?;
        let dropoff_time = parse_time(&dropoff_time, "dropoffTime")?;

        if pickup_date < today {
            return Err(RentalError::Validation(
                "Pickup date cannot be in the past".to_string(),
            ));
        }
        if dropoff_date < pickup_date {
            return Err(RentalError::Validation(
                "Dropoff date cannot be before pickup date".to_string(),
            ));
        }

        if client_days < 1 {
            return Err(RentalError::Validation(
                "Days must be at least 1".to_string(),
            ));
        }
        let days = rental_days(pickup_date, dropoff_date);
        if client_days != i64::from(days) {
            return Err(RentalError::Validation(
                "Days do not match the selected dates".to_string(),
            ));
        }

        let client_total = Money::from_major_f64(client_total)
            .ok_or_else(|| RentalError::Validation("Total must be a positive amount".to_string()))?;

        let additional_note = self
            .additional_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if additional_note
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS)
        {
            return Err(RentalError::Validation(format!(
                "Additional note cannot exceed {MAX_NOTE_CHARS} characters"
            )));
        }

        Ok(BookingRequest {
            car_id,
            pickup_location,
            dropoff_location,
            pickup_date,
            dropoff_date,
            pickup_time,
            dropoff_time,
            additional_note,
            days,
            client_total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            car_id: Some(CarId::new().to_string()),
            pickup_location: Some("Berlin Hbf".to_string()),
            dropoff_location: Some("Berlin Hbf".to_string()),
            pickup_date: Some("2025-01-10".to_string()),
            dropoff_date: Some("2025-01-13".to_string()),
            pickup_time: Some("10:00".to_string()),
            dropoff_time: Some("09:30".to_string()),
            additional_note: Some("  ".to_string()),
            days: Some(3),
            total: Some(350.0),
        }
    }

    fn validation_message(request: CheckoutRequest) -> String {
        match request.validate(today()) {
            Err(RentalError::Validation(message)) => message,
            other => format!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_valid_request() {
        let booking = request().validate(today()).unwrap();
        assert_eq!(booking.days, 3);
        assert_eq!(booking.client_total, Money::from_cents(35_000));
        assert_eq!(booking.additional_note, None);
        assert_eq!(
            booking.occupied_until(),
            NaiveDate::from_ymd_opt(2025, 1, 13).unwrap()
        );
    }

    #[test]
    fn test_same_day_rental_is_one_day() {
        let booking = CheckoutRequest {
            dropoff_date: Some("2025-01-10".to_string()),
            days: Some(1),
            ..request()
        }
        .validate(today())
        .unwrap();
        assert_eq!(booking.days, 1);
    }

    #[test]
    fn test_missing_field() {
        let message = validation_message(CheckoutRequest {
            pickup_location: None,
            ..request()
        });
        assert_eq!(message, "All fields are required");

        let message = validation_message(CheckoutRequest {
            total: None,
            ..request()
        });
        assert_eq!(message, "All fields are required");
    }

    #[test]
    fn test_bad_formats() {
        assert!(validation_message(CheckoutRequest {
            pickup_date: Some("10/01/2025".to_string()),
            ..request()
        })
        .contains("YYYY-MM-DD"));
        assert!(validation_message(CheckoutRequest {
            pickup_time: Some("10am".to_string()),
            ..request()
        })
        .contains("HH:MM"));
        assert_eq!(
            validation_message(CheckoutRequest {
                car_id: Some("42".to_string()),
                ..request()
            }),
            "Invalid car ID"
        );
    }

    #[test]
    fn test_date_order_and_day_count() {
        assert_eq!(
            validation_message(CheckoutRequest {
                dropoff_date: Some("2025-01-09".to_string()),
                ..request()
            }),
            "Dropoff date cannot be before pickup date"
        );
        assert_eq!(
            validation_message(CheckoutRequest {
                days: Some(5),
                ..request()
            }),
            "Days do not match the selected dates"
        );
        assert_eq!(
            validation_message(CheckoutRequest {
                days: Some(0),
                ..request()
            }),
            "Days must be at least 1"
        );
        assert_eq!(
            validation_message(CheckoutRequest {
                pickup_date: Some("2024-12-31".to_string()),
                ..request()
            }),
            "Pickup date cannot be in the past"
        );
    }

    #[test]
    fn test_order_json_uses_literal_status() {
        let order = Order {
            id: OrderId::new(),
            user_id: UserId::new(),
            car_id: CarId::new(),
            pickup_location: "A".to_string(),
            dropoff_location: "B".to_string(),
            pickup_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            dropoff_date: NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
            pickup_time: "10:00".to_string(),
            dropoff_time: "10:00".to_string(),
            additional_note: None,
            days: 3,
            total: Money::from_cents(35_000),
            status: OrderStatus::Pending,
            stripe_session_id: "cs_test_1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total"], 350.0);
        assert_eq!(json["pickupDate"], "2025-01-10");
        assert_eq!(json["stripeSessionId"], "cs_test_1");
    }
}
