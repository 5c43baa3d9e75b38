//! HTTP handlers.
//!
//! Handlers are thin: pull identity and input out of the request, call one
//! service method, wrap the result in the `{"success": true, ...}` envelope.
//! Failures leave as [`AppError`] and render the matching error envelope.

pub mod auth;
pub mod cars;
pub mod checkout;
pub mod orders;
pub mod reviews;
pub mod webhook;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use car_rental_web::AppError;

/// Unwrap a JSON body, turning a rejection into the 400 error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}
