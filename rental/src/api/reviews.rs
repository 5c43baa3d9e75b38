//! Review endpoints.

use super::json_body;
use crate::identity::CurrentUser;
use crate::reviews::{CreateReviewRequest, RatingSummary, Review, ReviewInput};
use crate::server::AppState;
use crate::types::CarId;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use car_rental_web::AppError;
use serde::{Deserialize, Serialize};

/// Query of `GET /api/reviews`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListParams {
    /// Car to list reviews for
    pub car_id: Option<String>,
}

/// Body of `GET /api/reviews`.
#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    /// Always `true`
    pub success: bool,
    /// Reviews, newest first
    pub data: Vec<Review>,
    /// Number of reviews returned
    pub count: usize,
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Serialize)]
pub struct ReviewCreatedResponse {
    /// Always `true`
    pub success: bool,
    /// The stored review
    pub data: Review,
    /// The car's rating after this review
    pub rating: RatingSummary,
    /// Confirmation text
    pub message: &'static str,
}

/// Reviews for one car.
///
/// # Errors
///
/// Returns 400 for a missing or malformed `carId`.
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewListParams>,
) -> Result<Json<ReviewListResponse>, AppError> {
    let raw = params
        .car_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Car ID is required"))?;
    let car_id: CarId = raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("Invalid car ID"))?;

    let reviews = state.reviews.list_for_car(car_id).await?;
    Ok(Json(ReviewListResponse {
        success: true,
        count: reviews.len(),
        data: reviews,
    }))
}

/// Write a review and refresh the car's rating.
///
/// # Errors
///
/// Returns 401 unauthenticated, 400 for invalid fields or a second review
/// of the same car, 404 for an unknown car.
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewCreatedResponse>, AppError> {
    let input = ReviewInput::try_from(json_body(payload)?)?;
    let (review, rating) = state.reviews.create(&identity, input).await?;

    Ok(Json(ReviewCreatedResponse {
        success: true,
        data: review,
        rating,
        message: "Review created successfully",
    }))
}
