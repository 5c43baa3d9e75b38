//! Error taxonomy for the rental domain.
//!
//! Every failure that can leave a request is one of these variants. The
//! HTTP boundary converts them into [`AppError`] with a fixed status code;
//! server-side variants keep their detail in the log and show the client a
//! generic message.

use crate::payments::PaymentGatewayError;
use axum::http::StatusCode;
use car_rental_web::AppError;
use thiserror::Error;

/// Result type alias for rental operations.
pub type Result<T> = std::result::Result<T, RentalError>;

/// Rental domain errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RentalError {
    // ═══════════════════════════════════════════════════════════
    // Caller errors
    // ═══════════════════════════════════════════════════════════
    /// No identity, or an identity that no longer resolves.
    #[error("{0}")]
    Unauthorized(String),

    /// The identity is valid but does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Car, order, session or user absent.
    #[error("{resource} not found")]
    NotFound {
        /// Kind of resource ("Car", "Order", ...)
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Operation not allowed in the current state (unavailable car,
    /// overlapping booking, total mismatch).
    #[error("{0}")]
    InvalidState(String),

    /// Input violates a documented constraint. The message is shown verbatim.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation (duplicate review, duplicate email).
    #[error("{0}")]
    Conflict(String),

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════
    /// Payment processor or session store failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RentalError {
    /// Shorthand for [`RentalError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidState(_)
            | Self::Validation(_)
            | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for RentalError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<redis::RedisError> for RentalError {
    fn from(err: redis::RedisError) -> Self {
        Self::Upstream(format!("session store: {err}"))
    }
}

impl From<PaymentGatewayError> for RentalError {
    fn from(err: PaymentGatewayError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<RentalError> for AppError {
    fn from(err: RentalError) -> Self {
        match err {
            RentalError::Unauthorized(message) => Self::unauthorized(message),
            RentalError::Forbidden(message) => Self::forbidden(message),
            RentalError::NotFound { resource, .. } => Self::new(
                StatusCode::NOT_FOUND,
                format!("{resource} not found"),
                "NOT_FOUND",
            ),
            RentalError::InvalidState(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_STATE")
            }
            RentalError::Validation(message) => Self::validation(message),
            RentalError::Conflict(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, "CONFLICT")
            }
            RentalError::Upstream(_) => Self::upstream("Upstream service error")
                .with_source(anyhow::Error::new(err)),
            RentalError::Database(_) | RentalError::Internal(_) => {
                Self::internal("Internal server error").with_source(anyhow::Error::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RentalError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RentalError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RentalError::not_found("Order", "cs_1").status_code(),
            StatusCode::NOT_FOUND
        );
        for err in [
            RentalError::InvalidState("x".into()),
            RentalError::Validation("x".into()),
            RentalError::Conflict("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        for err in [
            RentalError::Upstream("x".into()),
            RentalError::Database("x".into()),
            RentalError::Internal("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_validation_message_reaches_client() {
        let app: AppError = RentalError::Validation("Rating must be between 1 and 5".into()).into();
        assert_eq!(app.message(), "Rating must be between 1 and 5");
        assert_eq!(app.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_server_errors_are_generic() {
        let app: AppError = RentalError::Database("relation \"orders\" does not exist".into()).into();
        assert_eq!(app.message(), "Internal server error");
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let app: AppError = RentalError::Upstream("connection refused".into()).into();
        assert_eq!(app.code(), "UPSTREAM_ERROR");
        assert!(!app.message().contains("refused"));
    }

    #[test]
    fn test_not_found_hides_identifier() {
        let app: AppError = RentalError::not_found("Order", "cs_secret").into();
        assert_eq!(app.message(), "Order not found");
    }
}
