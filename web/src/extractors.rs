//! Custom Axum extractors.
//!
//! `BearerToken` is the raw credential from `Authorization: Bearer <token>`.
//! It only parses the header. Turning the token into an identity
//! is the application's job, because only it knows where sessions live.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Bearer token extracted from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the header is missing, uses another scheme, or
/// carries an empty token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    /// Parse the bearer credential out of a header map.
    ///
    /// Returns `None` for anything that is not a non-empty bearer token.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}
