//! Business metrics for the rental service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `rental_checkouts_total{outcome}` - Checkout attempts by outcome
//! - `rental_order_transitions_total{status, source}` - Applied order status changes
//! - `rental_webhook_events_total{kind, outcome}` - Payment notifications received
//! - `rental_reviews_created_total` - Reviews written
//! - `rental_registrations_total` - Accounts created
//! - `rental_logins_total{outcome}` - Login attempts
//!
//! ## Histograms
//! - `rental_checkout_amount_cents` - Order totals at checkout

use crate::orders::SignalSource;
use crate::types::OrderStatus;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "rental_checkouts_total",
        "Checkout attempts by outcome (created, rejected, upstream_error)"
    );
    describe_histogram!(
        "rental_checkout_amount_cents",
        "Total price of orders created at checkout, in cents"
    );
    describe_counter!(
        "rental_order_transitions_total",
        "Order status transitions actually applied, by target status and signal source"
    );
    describe_counter!(
        "rental_webhook_events_total",
        "Payment processor notifications by event kind and outcome"
    );
    describe_counter!("rental_reviews_created_total", "Total reviews written");
    describe_counter!("rental_registrations_total", "Total accounts created");
    describe_counter!("rental_logins_total", "Login attempts by outcome");

    tracing::info!("Business metrics registered");
}

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_business_metrics();
    Ok(handle)
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a checkout that produced a pending order.
#[allow(clippy::cast_precision_loss)]
pub fn record_checkout_created(total_cents: u64) {
    metrics::counter!("rental_checkouts_total", "outcome" => "created").increment(1);
    metrics::histogram!("rental_checkout_amount_cents").record(total_cents as f64);
}

/// Record a checkout refused before any external call.
pub fn record_checkout_rejected() {
    metrics::counter!("rental_checkouts_total", "outcome" => "rejected").increment(1);
}

/// Record a checkout aborted by a payment processor failure.
pub fn record_checkout_upstream_error() {
    metrics::counter!("rental_checkouts_total", "outcome" => "upstream_error").increment(1);
}

/// Record an applied order transition.
pub fn record_order_transition(status: OrderStatus, source: SignalSource) {
    metrics::counter!(
        "rental_order_transitions_total",
        "status" => status.as_str(),
        "source" => source.as_str()
    )
    .increment(1);
}

/// Record a received webhook notification.
///
/// # Arguments
///
/// * `kind` - Processor event type (e.g. `checkout.session.completed`)
/// * `outcome` - `processed`, `ignored`, `rejected` or `failed`
pub fn record_webhook_event(kind: &str, outcome: &'static str) {
    metrics::counter!(
        "rental_webhook_events_total",
        "kind" => kind.to_owned(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a review written.
pub fn record_review_created() {
    metrics::counter!("rental_reviews_created_total").increment(1);
}

/// Record an account created.
pub fn record_registration() {
    metrics::counter!("rental_registrations_total").increment(1);
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("rental_logins_total", "outcome" => outcome).increment(1);
}
