//! Rating aggregation.
//!
//! The car's `averageRating` / `totalReviews` pair is always recomputed from
//! the full list of ratings, never adjusted incrementally, so a missed or
//! raced write is repaired by the next review.

use serde::Serialize;

/// Aggregate over all reviews of one car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal, 0 when there are no reviews
    pub average_rating: f64,
    /// Number of reviews
    pub total_reviews: i32,
}

impl RatingSummary {
    /// The aggregate of a car without reviews.
    pub const EMPTY: Self = Self {
        average_rating: 0.0,
        total_reviews: 0,
    };

    /// Aggregate a full set of ratings.
    #[must_use]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self::EMPTY;
        }

        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum as f64 / ratings.len() as f64;

        Self {
            average_rating: round_to_tenth(mean),
            total_reviews: i32::try_from(ratings.len()).unwrap_or(i32::MAX),
        }
    }
}

/// Round half away from zero to one decimal place.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
