//! Account endpoints.

use super::json_body;
use crate::identity::{CurrentUser, LoginOutcome, LoginRequest, PublicUser, RegisterRequest};
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use car_rental_web::{AppError, BearerToken};
use serde::Serialize;

/// Success envelope around a single value.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    /// Always `true`
    pub success: bool,
    /// Payload
    pub data: T,
    /// Optional human-readable note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T> DataResponse<T> {
    /// Wrap `data` without a message.
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }
}

/// Envelope for bodiless successes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Always `true`
    pub success: bool,
    /// What happened
    pub message: &'static str,
}

/// Create an account.
///
/// # Errors
///
/// Returns 400 for invalid fields or a taken email.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<PublicUser>>), AppError> {
    let request = json_body(payload)?;
    let user = state.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            success: true,
            data: user,
            message: Some("Registration successful"),
        }),
    ))
}

/// Exchange credentials for a bearer token.
///
/// # Errors
///
/// Returns 401 "Invalid email or password" for any credential mismatch.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<DataResponse<LoginOutcome>>, AppError> {
    let request = json_body(payload)?;
    let outcome = state.auth.login(request).await?;
    Ok(Json(DataResponse::new(outcome)))
}

/// Revoke the presented token.
///
/// # Errors
///
/// Returns 401 without a bearer token, 500 if the session store fails.
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.logout(&token).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Logged out",
    }))
}

/// The caller's profile.
///
/// # Errors
///
/// Returns 401 without a valid session.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<DataResponse<PublicUser>>, AppError> {
    let user = state.auth.current_user(&identity).await?;
    Ok(Json(DataResponse::new(user)))
}
