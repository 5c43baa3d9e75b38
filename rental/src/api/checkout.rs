//! Booking checkout endpoint.

use super::json_body;
use crate::identity::CurrentUser;
use crate::orders::CheckoutRequest;
use crate::server::AppState;
use crate::types::OrderId;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use car_rental_web::AppError;
use serde::Serialize;

/// Body of a successful `POST /api/checkout`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Always `true`
    pub success: bool,
    /// Hosted payment page to redirect the browser to
    pub session: String,
    /// Processor session id
    pub session_id: String,
    /// The pending order
    pub order_id: OrderId,
}

/// Start a booking: create the hosted checkout session and the pending order.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/checkout \
///   -H "Authorization: Bearer $TOKEN" -H "Content-Type: application/json" \
///   -d '{"carId":"...","pickupLocation":"Berlin","dropoffLocation":"Berlin",
///        "pickupDate":"2026-11-01","dropoffDate":"2026-11-04",
///        "pickupTime":"10:00","dropoffTime":"10:00","days":3,"total":350}'
/// ```
///
/// # Errors
///
/// Returns 401 unauthenticated, 404 unknown car, 400 unavailable car,
/// overlapping booking, stale total or invalid fields, 500 when the payment
/// processor fails.
pub async fn create_checkout(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let request = json_body(payload)?;
    let outcome = state.orders.checkout(&identity, request).await?;

    Ok(Json(CheckoutResponse {
        success: true,
        session: outcome.session_url,
        session_id: outcome.order.stripe_session_id.clone(),
        order_id: outcome.order.id,
    }))
}
