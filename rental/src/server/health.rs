//! Health check endpoints.
//!
//! `/health` is liveness only. `/ready` pings the database and the session
//! store and answers 503 when either is down.

use super::state::AppState;
use crate::error::Result;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A dependency that can be asked whether it is reachable.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Succeeds when the dependency answers.
    ///
    /// # Errors
    ///
    /// Returns error if the dependency is unreachable.
    async fn ping(&self) -> Result<()>;
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// Liveness check.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Database reachable
    pub database: bool,
    /// Session store reachable
    pub sessions: bool,
}

/// Readiness check.
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"database":true,"sessions":true}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let (database, sessions) = tokio::join!(state.database.ping(), state.auth.sessions().ping());

    if let Err(e) = &database {
        tracing::warn!(error = %e, "Database not ready");
    }
    if let Err(e) = &sessions {
        tracing::warn!(error = %e, "Session store not ready");
    }

    let body = ReadinessResponse {
        ready: database.is_ok() && sessions.is_ok(),
        database: database.is_ok(),
        sessions: sessions.is_ok(),
    };
    let status = if body.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Prometheus metrics in text exposition format; 404 when disabled.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
