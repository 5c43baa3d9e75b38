//! Review record and submission input.

use crate::error::{RentalError, Result};
use crate::types::{CarId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shortest accepted comment, in characters.
pub const MIN_COMMENT_CHARS: usize = 10;
/// Longest accepted comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// A review of a car.
///
/// `user_name` and `user_email` are a snapshot of the author taken when the
/// review was written. Later profile edits do not change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review id
    pub id: ReviewId,
    /// Reviewed car
    pub car_id: CarId,
    /// Author
    pub user_id: UserId,
    /// Author display name at write time
    pub user_name: String,
    /// Author email at write time
    pub user_email: String,
    /// 1 to 5
    pub rating: i16,
    /// 10 to 500 characters
    pub comment: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/reviews`.
///
/// Everything is optional at the type level so that missing fields produce
/// the documented validation message instead of a deserializer error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    /// Car id string
    pub car_id: Option<String>,
    /// Rating, must be a whole number
    pub rating: Option<f64>,
    /// Comment text
    pub comment: Option<String>,
}

/// Validated review input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    /// Car id
    pub car_id: CarId,
    /// 1 to 5
    pub rating: i16,
    /// Trimmed comment
    pub comment: String,
}

impl TryFrom<CreateReviewRequest> for ReviewInput {
    type Error = RentalError;

    fn try_from(request: CreateReviewRequest) -> Result<Self> {
        let (Some(car_id), Some(rating), Some(comment)) =
            (request.car_id, request.rating, request.comment)
        else {
            return Err(RentalError::Validation(
                "Car ID, rating, and comment are required".to_string(),
            ));
        };
        let comment = comment.trim().to_string();
        if car_id.trim().is_empty() || comment.is_empty() {
            return Err(RentalError::Validation(
                "Car ID, rating, and comment are required".to_string(),
            ));
        }

        let car_id = car_id
            .trim()
            .parse::<CarId>()
            .map_err(|_| RentalError::Validation("Invalid car ID".to_string()))?;

        if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
            return Err(RentalError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        #[allow(clippy::cast_possible_truncation)]
        let rating = rating as i16;

        let length = comment.chars().count();
        if !(MIN_COMMENT_CHARS..=MAX_COMMENT_CHARS).contains(&length) {
            return Err(RentalError::Validation(format!(
                "Comment must be between {MIN_COMMENT_CHARS} and {MAX_COMMENT_CHARS} characters"
            )));
        }

        Ok(Self {
            car_id,
            rating,
            comment,
        })
    }
}
