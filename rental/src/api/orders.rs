//! Order listing and client-side payment settlement.

use super::auth::DataResponse;
use super::json_body;
use crate::identity::CurrentUser;
use crate::orders::OrderWithCar;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use car_rental_web::AppError;
use serde::{Deserialize, Serialize};

/// Body of the verify and cancel calls.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Processor session id from the redirect URL
    #[serde(default)]
    pub session_id: String,
}

/// Body of `POST /api/orders/verify-payment`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Always `true`
    pub success: bool,
    /// Order status after the call
    pub status: &'static str,
    /// Live payment status from the processor
    pub payment_status: &'static str,
    /// Set when this call settled the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Body of `POST /api/orders/cancel`.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Always `true`
    pub success: bool,
    /// Resulting status
    pub status: &'static str,
}

/// The caller's orders, newest first.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<DataResponse<Vec<OrderWithCar>>>, AppError> {
    let orders = state.orders.list_for_user(&identity).await?;
    Ok(Json(DataResponse::new(orders)))
}

/// Settle the caller's order from the live processor status.
///
/// # Errors
///
/// Returns 401 unauthenticated, 400 without a session id, 404 when no order
/// has the session, 403 when the order belongs to someone else.
pub async fn verify_payment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let request = json_body(payload)?;
    let outcome = state
        .orders
        .verify_payment(&identity, &request.session_id)
        .await?;

    Ok(Json(VerifyResponse {
        success: true,
        status: outcome.status.as_str(),
        payment_status: outcome.payment_status.as_str(),
        message: outcome.updated.then_some("Order marked as paid"),
    }))
}

/// Record an aborted checkout.
///
/// # Errors
///
/// Returns 400 without a session id, 500 when the processor fails.
pub async fn cancel_order(
    State(state): State<AppState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, AppError> {
    let request = json_body(payload)?;
    let outcome = state.orders.cancel(&request.session_id).await?;

    Ok(Json(CancelResponse {
        success: true,
        status: outcome.status_label(),
    }))
}
