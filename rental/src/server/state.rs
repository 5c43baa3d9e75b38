//! Application state for the rental HTTP server.
//!
//! Holds the services handlers call into. Every field is cheap to clone
//! (services wrap `Arc`s), so axum clones the whole state per request.

use super::health::ReadinessProbe;
use crate::catalog::CarRepository;
use crate::identity::AuthService;
use crate::orders::OrderWorkflow;
use crate::reviews::ReviewService;
use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Catalog reads
    pub cars: Arc<dyn CarRepository>,
    /// Accounts and identity resolution
    pub auth: AuthService,
    /// Checkout and payment reconciliation
    pub orders: OrderWorkflow,
    /// Reviews and rating aggregation
    pub reviews: ReviewService,
    /// Database readiness check
    pub database: Arc<dyn ReadinessProbe>,
    /// Prometheus renderer, `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state with metrics disabled.
    #[must_use]
    pub fn new(
        cars: Arc<dyn CarRepository>,
        auth: AuthService,
        orders: OrderWorkflow,
        reviews: ReviewService,
        database: Arc<dyn ReadinessProbe>,
    ) -> Self {
        Self {
            cars,
            auth,
            orders,
            reviews,
            database,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// Lets the identity extractors resolve tokens from AppState.
impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
