//! Identity extractors.
//!
//! Handlers that need the caller take `CurrentUser`, which resolves
//! `Authorization: Bearer <token>` through the injected session store.

use super::model::Identity;
use super::service::AuthService;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use car_rental_web::{AppError, BearerToken};

/// The authenticated caller. Rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let auth = AuthService::from_ref(state);
        auth.resolve(&token)
            .await
            .map_err(AppError::from)?
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::environment::test_clock;
    use crate::identity::{LoginRequest, RegisterRequest};
    use crate::mocks::{MockSessionStore, MockUserRepository};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;

    fn auth() -> AuthService {
        AuthService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockSessionStore::new()),
            Arc::new(test_clock()),
            Duration::from_secs(3600),
        )
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(()).expect("valid request").into_parts().0
    }

    #[tokio::test]
    async fn test_missing_token() {
        let auth = auth();
        let err = CurrentUser::from_request_parts(&mut parts(None), &auth)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Authentication required");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let auth = auth();
        let err = CurrentUser::from_request_parts(&mut parts(Some("Bearer nope")), &auth)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid or expired session");
    }

    #[tokio::test]
    async fn test_valid_token_resolves() {
        let auth = auth();
        auth.register(RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: None,
        })
        .await
        .unwrap();
        let login = auth
            .login(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let header = format!("Bearer {}", login.token);
        let CurrentUser(identity) = CurrentUser::from_request_parts(&mut parts(Some(&header)), &auth)
            .await
            .unwrap();
        assert_eq!(identity.email, "ada@example.com");
    }
}
