//! Checkout and payment reconciliation.
//!
//! Four entry points share one order record, keyed by the processor's
//! checkout session id:
//!
//! - [`OrderWorkflow::checkout`] obtains a hosted session and only then
//!   writes the `pending` order, so a processor failure never leaves a
//!   local record behind.
//! - [`OrderWorkflow::handle_webhook`] authenticates a notification on the
//!   raw body, then applies the transition the event asks for.
//! - [`OrderWorkflow::verify_payment`] lets the owner pull the live status
//!   right after the redirect, ahead of the webhook.
//! - [`OrderWorkflow::cancel`] records an explicit abort.
//!
//! All status writes go through [`OrderRepository::transition`], which only
//! moves a `pending` order. Replays, duplicate notifications and the race
//! between the webhook and verification are therefore no-ops.

use super::lifecycle::{PaymentSignal, SignalSource, Transition};
use super::model::{BookingRequest, CheckoutRequest, Order, OrderWithCar};
use super::repository::OrderRepository;
use crate::catalog::{Car, CarRepository, CarSummary};
use crate::environment::Clock;
use crate::error::{RentalError, Result};
use crate::identity::Identity;
use crate::metrics;
use crate::payments::{
    CheckoutSessionRequest, LineItem, PaymentGateway, PaymentStatus, ProductSpec, SignatureError,
    WebhookEvent, WebhookVerifier,
};
use crate::types::{CarId, Money, OrderId, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the fee line on the hosted checkout page.
pub const SERVICE_FEE_LINE: &str = "Service fee";

/// Placeholder the processor replaces with the session id in redirect URLs.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Pricing and redirect settings for checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Flat fee added to every booking
    pub service_fee: Money,
    /// Lifetime of a hosted session
    pub session_ttl: chrono::Duration,
    /// Origin the processor redirects back to
    pub public_base_url: String,
}

impl CheckoutSettings {
    fn redirect_url(&self, car_id: CarId, success: bool) -> String {
        format!(
            "{}/cars/{car_id}?success={success}&session_id={SESSION_ID_PLACEHOLDER}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

/// A created booking.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The stored `pending` order
    pub order: Order,
    /// Hosted payment page to redirect to
    pub session_url: String,
}

/// What a notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Event kind not handled here
    Ignored,
    /// Completion with the payment still in flight
    AwaitingPayment,
    /// No order carries the session id
    OrderNotFound,
    /// The order moved to this status
    Applied(OrderStatus),
    /// The order was already terminal with this status
    Unchanged(OrderStatus),
}

impl ReconcileOutcome {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::AwaitingPayment => "awaiting_payment",
            Self::OrderNotFound => "order_not_found",
            Self::Applied(_) => "applied",
            Self::Unchanged(_) => "unchanged",
        }
    }
}

/// An acknowledged notification.
#[derive(Debug, Clone)]
pub struct WebhookReceipt {
    /// Event id
    pub event_id: String,
    /// Event kind, echoed back to the processor
    pub kind: String,
    /// Effect on the order
    pub outcome: ReconcileOutcome,
}

/// Why a notification was not acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    /// No signing secret is configured.
    #[error("Webhook secret not configured")]
    NotConfigured,
    /// Signature check failed; nothing was read or written.
    #[error("{0}")]
    Signature(#[from] SignatureError),
    /// Authentic body that is not an event envelope.
    #[error("Invalid webhook payload: {0}")]
    Payload(String),
    /// The event was understood but applying it failed.
    #[error("Webhook handler failed: {source}")]
    Processing {
        /// Event kind
        kind: String,
        /// Event id
        event_id: String,
        /// Underlying failure
        source: RentalError,
    },
}

/// Result of a verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Order status after the call
    pub status: OrderStatus,
    /// Live status reported by the processor
    pub payment_status: PaymentStatus,
    /// Whether this call moved the order to `paid`
    pub updated: bool,
}

/// Result of a cancellation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Order status after the call, `None` if no order has the session
    pub order_status: Option<OrderStatus>,
    /// Live status reported by the processor
    pub payment_status: PaymentStatus,
}

impl CancelOutcome {
    /// Status reported to the client: `paid` when the processor has the
    /// money, the order status otherwise.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        if self.payment_status.is_paid() {
            return self.payment_status.as_str();
        }
        self.order_status
            .unwrap_or(OrderStatus::Cancelled)
            .as_str()
    }
}

/// The order workflow.
#[derive(Clone)]
pub struct OrderWorkflow {
    orders: Arc<dyn OrderRepository>,
    cars: Arc<dyn CarRepository>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: Option<WebhookVerifier>,
    clock: Arc<dyn Clock>,
    settings: CheckoutSettings,
}

impl OrderWorkflow {
    /// Create the workflow. Webhooks are refused until a verifier is set.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        cars: Arc<dyn CarRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            cars,
            gateway,
            verifier: None,
            clock,
            settings,
        }
    }

    /// Accept webhooks signed for `verifier`.
    #[must_use]
    pub fn with_webhook_verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Price of a booking: days x daily price + service fee.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::Validation` if the amount overflows.
    pub fn quote(&self, car: &Car, days: u32) -> Result<Money> {
        car.price_per_day
            .checked_multiply(days)
            .and_then(|rental| rental.checked_add(self.settings.service_fee))
            .ok_or_else(|| RentalError::Validation("Booking amount is too large".to_string()))
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    /// Book a car: hosted session first, then the `pending` order.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request is malformed → `RentalError::Validation`
    /// - The car does not exist → `RentalError::NotFound`
    /// - The car is unavailable, already booked for the window, or the
    ///   client total is stale → `RentalError::InvalidState`
    /// - The processor fails → `RentalError::Upstream`, no order is written
    pub async fn checkout(
        &self,
        identity: &Identity,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome> {
        let now = self.clock.now();

        let (booking, car, total) = match self.prepare(request, now).await {
            Ok(prepared) => prepared,
            Err(e) => {
                metrics::record_checkout_rejected();
                return Err(e);
            }
        };

        let session = match self.open_session(identity, &booking, &car, now).await {
            Ok(session) => session,
            Err(e) => {
                metrics::record_checkout_upstream_error();
                tracing::warn!(car_id = %car.id, error = %e, "Checkout session could not be created");
                return Err(e);
            }
        };

        let order = Order {
            id: OrderId::new(),
            user_id: identity.user_id,
            car_id: car.id,
            pickup_location: booking.pickup_location,
            dropoff_location: booking.dropoff_location,
            pickup_date: booking.pickup_date,
            dropoff_date: booking.dropoff_date,
            pickup_time: booking.pickup_time,
            dropoff_time: booking.dropoff_time,
            additional_note: booking.additional_note,
            days: i32::try_from(booking.days).unwrap_or(i32::MAX),
            total,
            status: OrderStatus::Pending,
            stripe_session_id: session.id.clone(),
            created_at: now,
            updated_at: now,
        };

        let order = match self.orders.insert(order).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    user_id = %identity.user_id,
                    car_id = %car.id,
                    error = %e,
                    "Checkout session created but order not stored; needs manual reconciliation"
                );
                return Err(e);
            }
        };

        metrics::record_checkout_created(total.cents());
        tracing::info!(
            order_id = %order.id,
            session_id = %order.stripe_session_id,
            car_id = %order.car_id,
            days = order.days,
            total = %order.total,
            "Checkout created"
        );

        Ok(CheckoutOutcome {
            order,
            session_url: session.url,
        })
    }

    async fn prepare(
        &self,
        request: CheckoutRequest,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(BookingRequest, Car, Money)> {
        let booking = request.validate(now.date_naive())?;

        let car = self
            .cars
            .find(booking.car_id)
            .await?
            .ok_or_else(|| RentalError::not_found("Car", booking.car_id))?;

        if !car.is_available {
            return Err(RentalError::InvalidState("Car is not available".to_string()));
        }

        let total = self.quote(&car, booking.days)?;
        if booking.client_total != total {
            tracing::debug!(
                car_id = %car.id,
                client_total = %booking.client_total,
                total = %total,
                "Client total does not match quote"
            );
            return Err(RentalError::InvalidState(format!(
                "Total does not match the current price ({total})"
            )));
        }

        let pending_since = now - self.settings.session_ttl;
        if self
            .orders
            .has_overlap(car.id, booking.pickup_date, booking.occupied_until(), pending_since)
            .await?
        {
            return Err(RentalError::InvalidState(
                "Car is already booked for the selected dates".to_string(),
            ));
        }

        Ok((booking, car, total))
    }

    async fn open_session(
        &self,
        identity: &Identity,
        booking: &BookingRequest,
        car: &Car,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<crate::payments::CheckoutSession> {
        let product = self
            .gateway
            .ensure_product(ProductSpec {
                car_id: car.id,
                name: car.display_name(),
                description: car.description.clone(),
                images: car.images.clone(),
            })
            .await?;

        let request = CheckoutSessionRequest {
            car_id: car.id,
            user_id: identity.user_id,
            customer_email: identity.email.clone(),
            line_items: vec![
                LineItem {
                    product: Some(product),
                    name: car.display_name(),
                    unit_amount: car.price_per_day,
                    quantity: booking.days,
                },
                LineItem {
                    product: None,
                    name: SERVICE_FEE_LINE.to_string(),
                    unit_amount: self.settings.service_fee,
                    quantity: 1,
                },
            ],
            success_url: self.settings.redirect_url(car.id, true),
            cancel_url: self.settings.redirect_url(car.id, false),
            expires_at: now + self.settings.session_ttl,
        };

        Ok(self.gateway.create_checkout_session(request).await?)
    }

    // ========================================================================
    // Webhook
    // ========================================================================

    /// Authenticate and apply a processor notification.
    ///
    /// The signature is checked on `payload` before it is parsed. Once both
    /// succeed the notification is acknowledged, whether or not it changed
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns a [`WebhookError`] describing why the notification must not
    /// be acknowledged.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> std::result::Result<WebhookReceipt, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or(WebhookError::NotConfigured)?;

        if let Err(e) = verifier.verify(payload, signature) {
            metrics::record_webhook_event("unverified", "rejected");
            tracing::warn!(reason = %e, "Webhook signature rejected");
            return Err(e.into());
        }

        let event =
            WebhookEvent::parse(payload).map_err(|e| WebhookError::Payload(e.to_string()))?;

        match self.reconcile(&event).await {
            Ok(outcome) => {
                let label = match outcome {
                    ReconcileOutcome::Ignored => "ignored",
                    _ => "processed",
                };
                metrics::record_webhook_event(&event.kind, label);
                tracing::info!(
                    event_id = %event.id,
                    kind = %event.kind,
                    outcome = outcome.as_str(),
                    "Webhook processed"
                );
                Ok(WebhookReceipt {
                    event_id: event.id,
                    kind: event.kind,
                    outcome,
                })
            }
            Err(source) => {
                metrics::record_webhook_event(&event.kind, "failed");
                tracing::error!(
                    event_id = %event.id,
                    kind = %event.kind,
                    error = %source,
                    "Webhook processing failed"
                );
                Err(WebhookError::Processing {
                    kind: event.kind,
                    event_id: event.id,
                    source,
                })
            }
        }
    }

    /// Apply an authenticated event.
    ///
    /// # Errors
    ///
    /// Returns error if the store call fails.
    pub async fn reconcile(&self, event: &WebhookEvent) -> Result<ReconcileOutcome> {
        let Some(session) = event.session() else {
            tracing::debug!(event_id = %event.id, kind = %event.kind, "Event without a session object");
            return Ok(ReconcileOutcome::Ignored);
        };
        let Some(signal) = PaymentSignal::from_event(&event.kind, session.payment_status) else {
            return Ok(ReconcileOutcome::Ignored);
        };
        let Some(target) = signal.target() else {
            tracing::info!(
                session_id = %session.id,
                payment_status = session.payment_status.as_str(),
                "Checkout completed without payment; waiting for async result"
            );
            return Ok(ReconcileOutcome::AwaitingPayment);
        };

        let outcome = match self
            .apply(&session.id, target, SignalSource::Webhook)
            .await?
        {
            Transition::Applied(order) => ReconcileOutcome::Applied(order.status),
            Transition::Unchanged(order) => ReconcileOutcome::Unchanged(order.status),
            Transition::NotFound => {
                tracing::warn!(
                    session_id = %session.id,
                    event_id = %event.id,
                    "No order for webhook session"
                );
                ReconcileOutcome::OrderNotFound
            }
        };
        Ok(outcome)
    }

    async fn apply(
        &self,
        session_id: &str,
        target: OrderStatus,
        source: SignalSource,
    ) -> Result<Transition<Order>> {
        let transition = self
            .orders
            .transition(session_id, target, self.clock.now())
            .await?;

        match &transition {
            Transition::Applied(order) => {
                metrics::record_order_transition(order.status, source);
                tracing::info!(
                    order_id = %order.id,
                    session_id,
                    status = %order.status,
                    source = source.as_str(),
                    "Order status updated"
                );
            }
            Transition::Unchanged(order) => {
                tracing::debug!(
                    order_id = %order.id,
                    session_id,
                    status = %order.status,
                    requested = %target,
                    source = source.as_str(),
                    "Order already settled"
                );
            }
            Transition::NotFound => {}
        }
        Ok(transition)
    }

    // ========================================================================
    // Client paths
    // ========================================================================

    /// Pull the live status of the caller's session and settle the order if
    /// the processor reports it paid.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `session_id` is empty or not a session id → `RentalError::Validation`
    /// - No order has the session → `RentalError::NotFound`
    /// - The order belongs to someone else → `RentalError::Forbidden`
    /// - The processor fails → `RentalError::Upstream`
    pub async fn verify_payment(
        &self,
        identity: &Identity,
        session_id: &str,
    ) -> Result<VerifyOutcome> {
        let session_id = require_session_id(session_id)?;

        let order = self
            .orders
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| RentalError::not_found("Order", session_id))?;

        if order.user_id != identity.user_id {
            tracing::warn!(
                order_id = %order.id,
                caller = %identity.user_id,
                "Verification attempted on another user's order"
            );
            return Err(RentalError::Forbidden(
                "This order belongs to another user".to_string(),
            ));
        }

        let live = self.gateway.retrieve_session(session_id).await?;

        if live.payment_status.is_paid() && order.status == OrderStatus::Pending {
            let target = PaymentSignal::ConfirmedPaid
                .target()
                .unwrap_or(OrderStatus::Paid);
            let transition = self
                .apply(session_id, target, SignalSource::Verification)
                .await?;
            let updated = transition.is_applied();
            let status = transition.into_order().map_or(order.status, |o| o.status);
            return Ok(VerifyOutcome {
                status,
                payment_status: live.payment_status,
                updated,
            });
        }

        Ok(VerifyOutcome {
            status: order.status,
            payment_status: live.payment_status,
            updated: false,
        })
    }

    /// Record an explicit abort: cancel the order unless the processor
    /// already has the payment.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `session_id` is empty or not a session id → `RentalError::Validation`
    /// - The processor fails → `RentalError::Upstream`
    pub async fn cancel(&self, session_id: &str) -> Result<CancelOutcome> {
        let session_id = require_session_id(session_id)?;
        let live = self.gateway.retrieve_session(session_id).await?;

        if live.payment_status.is_paid() {
            let order = self.orders.find_by_session(session_id).await?;
            return Ok(CancelOutcome {
                order_status: order.map(|o| o.status),
                payment_status: live.payment_status,
            });
        }

        let target = PaymentSignal::AbortedUnpaid
            .target()
            .unwrap_or(OrderStatus::Cancelled);
        let transition = self
            .apply(session_id, target, SignalSource::Cancellation)
            .await?;
        if matches!(transition, Transition::NotFound) {
            tracing::warn!(session_id, "Cancellation for unknown session");
        }

        Ok(CancelOutcome {
            order_status: transition.into_order().map(|o| o.status),
            payment_status: live.payment_status,
        })
    }

    /// The caller's orders, newest first, with car summaries.
    ///
    /// # Errors
    ///
    /// Returns error if a store call fails.
    pub async fn list_for_user(&self, identity: &Identity) -> Result<Vec<OrderWithCar>> {
        let orders = self.orders.list_for_user(identity.user_id).await?;

        let mut cars: HashMap<CarId, Option<CarSummary>> = HashMap::new();
        let mut listed = Vec::with_capacity(orders.len());
        for order in orders {
            let car = match cars.get(&order.car_id) {
                Some(car) => car.clone(),
                None => {
                    let car = self
                        .cars
                        .find(order.car_id)
                        .await?
                        .map(|c| CarSummary::from(&c));
                    cars.insert(order.car_id, car.clone());
                    car
                }
            };
            listed.push(OrderWithCar { order, car });
        }
        Ok(listed)
    }
}

/// Longest session id accepted from a client.
const MAX_SESSION_ID_LEN: usize = 255;

/// Trim a client-supplied session id and check it has the processor's
/// `cs_<alphanumeric>` shape before it is looked up or sent upstream.
fn require_session_id(session_id: &str) -> Result<&str> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(RentalError::Validation("Session ID required".to_string()));
    }
    let well_formed = session_id.len() <= MAX_SESSION_ID_LEN
        && session_id.strip_prefix("cs_").is_some_and(|rest| {
            !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        });
    if !well_formed {
        return Err(RentalError::Validation("Invalid session ID".to_string()));
    }
    Ok(session_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::environment::{FixedClock, test_clock};
    use crate::mocks::fixtures::{car, identity};
    use crate::mocks::{MockCarRepository, MockOrderRepository, MockPaymentGateway};
    use crate::payments::webhook::signature_header;

    const SECRET: &str = "whsec_test";

    struct Harness {
        workflow: OrderWorkflow,
        orders: Arc<MockOrderRepository>,
        cars: Arc<MockCarRepository>,
        gateway: Arc<MockPaymentGateway>,
        clock: FixedClock,
    }

    fn harness() -> Harness {
        let clock = test_clock();
        let orders = Arc::new(MockOrderRepository::new());
        let cars = Arc::new(MockCarRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let workflow = OrderWorkflow::new(
            orders.clone(),
            cars.clone(),
            gateway.clone(),
            Arc::new(clock.clone()),
            CheckoutSettings {
                service_fee: Money::from_cents(5_000),
                session_ttl: chrono::Duration::minutes(30),
                public_base_url: "http://localhost:3000/".to_string(),
            },
        )
        .with_webhook_verifier(WebhookVerifier::new(SECRET, 300, Arc::new(clock.clone())));
        Harness {
            workflow,
            orders,
            cars,
            gateway,
            clock,
        }
    }

    fn request(car_id: CarId, pickup: &str, dropoff: &str, days: i64, total: f64) -> CheckoutRequest {
        CheckoutRequest {
            car_id: Some(car_id.to_string()),
            pickup_location: Some("Berlin Hbf".to_string()),
            dropoff_location: Some("Berlin Hbf".to_string()),
            pickup_date: Some(pickup.to_string()),
            dropoff_date: Some(dropoff.to_string()),
            pickup_time: Some("10:00".to_string()),
            dropoff_time: Some("10:00".to_string()),
            additional_note: None,
            days: Some(days),
            total: Some(total),
        }
    }

    fn event(kind: &str, session_id: &str, payment_status: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": kind,
            "data": {"object": {"id": session_id, "payment_status": payment_status}}
        })
        .to_string()
        .into_bytes()
    }

    fn signed(h: &Harness, payload: &[u8]) -> String {
        signature_header(SECRET, h.clock.now().timestamp(), payload)
    }

    async fn booked(h: &Harness) -> Order {
        let car = h.cars.insert(car(100)).await.unwrap();
        h.workflow
            .checkout(&identity("ada"), request(car.id, "2025-01-10", "2025-01-13", 3, 350.0))
            .await
            .unwrap()
            .order
    }

    #[tokio::test]
    async fn test_checkout_persists_pending_order_with_quoted_total() {
        let h = harness();
        let order = booked(&h).await;

        assert_eq!(order.days, 3);
        assert_eq!(order.total, Money::from_cents(35_000));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.stripe_session_id.starts_with("cs_test_"));
        assert_eq!(h.gateway.session_count(), 1);

        let sessions = h.gateway.session_requests();
        let lines = &sessions[0].line_items;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].unit_amount, Money::from_cents(10_000));
        assert_eq!(lines[1].name, SERVICE_FEE_LINE);
        let charged = lines
            .iter()
            .filter_map(LineItem::total)
            .fold(Money::ZERO, |acc, m| acc.checked_add(m).unwrap());
        assert_eq!(charged, order.total);
        assert_eq!(
            sessions[0].success_url,
            format!(
                "http://localhost:3000/cars/{}?success=true&session_id={{CHECKOUT_SESSION_ID}}",
                order.car_id
            )
        );
        assert_eq!(sessions[0].expires_at, h.clock.now() + chrono::Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_checkout_reuses_product_per_car() {
        let h = harness();
        let car = h.cars.insert(car(100)).await.unwrap();
        for (from, to) in [("2025-01-10", "2025-01-11"), ("2025-02-10", "2025-02-11")] {
            h.workflow
                .checkout(&identity("ada"), request(car.id, from, to, 1, 150.0))
                .await
                .unwrap();
        }
        assert_eq!(h.gateway.product_count(), 1);
        assert_eq!(h.gateway.session_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_car_creates_nothing() {
        let h = harness();
        let mut unavailable = car(100);
        unavailable.is_available = false;
        let unavailable = h.cars.insert(unavailable).await.unwrap();

        let err = h
            .workflow
            .checkout(
                &identity("ada"),
                request(unavailable.id, "2025-01-10", "2025-01-13", 3, 350.0),
            )
            .await
            .unwrap_err();

        assert_eq!(err, RentalError::InvalidState("Car is not available".to_string()));
        assert_eq!(h.gateway.session_count(), 0);
        assert_eq!(h.gateway.product_count(), 0);
        assert_eq!(h.orders.count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_car_is_not_found() {
        let h = harness();
        let err = h
            .workflow
            .checkout(
                &identity("ada"),
                request(CarId::new(), "2025-01-10", "2025-01-13", 3, 350.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::NotFound { resource: "Car", .. }));
    }

    #[tokio::test]
    async fn test_stale_total_rejected() {
        let h = harness();
        let car = h.cars.insert(car(100)).await.unwrap();
        let err = h
            .workflow
            .checkout(&identity("ada"), request(car.id, "2025-01-10", "2025-01-13", 3, 300.0))
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::InvalidState(_)));
        assert_eq!(h.gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn test_processor_failure_leaves_no_order() {
        let h = harness();
        let car = h.cars.insert(car(100)).await.unwrap();
        h.gateway.set_failing(true);

        let err = h
            .workflow
            .checkout(&identity("ada"), request(car.id, "2025-01-10", "2025-01-13", 3, 350.0))
            .await
            .unwrap_err();

        assert!(matches!(err, RentalError::Upstream(_)));
        assert_eq!(h.orders.count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_window_rejected_until_pending_goes_stale() {
        let h = harness();
        let first = booked(&h).await;

        let overlapping = request(first.car_id, "2025-01-12", "2025-01-14", 2, 250.0);
        let err = h
            .workflow
            .checkout(&identity("bob"), overlapping.clone())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RentalError::InvalidState("Car is already booked for the selected dates".to_string())
        );

        // Handover on the dropoff day is fine.
        h.workflow
            .checkout(
                &identity("bob"),
                request(first.car_id, "2025-01-13", "2025-01-14", 1, 150.0),
            )
            .await
            .unwrap();

        // An abandoned pending order stops blocking once its session is dead.
        h.clock.advance(chrono::Duration::minutes(31));
        h.workflow
            .checkout(&identity("bob"), overlapping)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_paid_order_blocks_window_forever() {
        let h = harness();
        let first = booked(&h).await;
        h.workflow
            .apply(&first.stripe_session_id, OrderStatus::Paid, SignalSource::Webhook)
            .await
            .unwrap();
        h.clock.advance(chrono::Duration::days(1));

        let err = h
            .workflow
            .checkout(
                &identity("bob"),
                request(first.car_id, "2025-01-11", "2025-01-12", 1, 150.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_completed_webhook_is_idempotent() {
        let h = harness();
        let order = booked(&h).await;
        let payload = event("checkout.session.completed", &order.stripe_session_id, "paid");
        let header = signed(&h, &payload);

        let first = h.workflow.handle_webhook(&payload, Some(&header)).await.unwrap();
        assert_eq!(first.outcome, ReconcileOutcome::Applied(OrderStatus::Paid));
        assert_eq!(first.kind, "checkout.session.completed");

        let second = h.workflow.handle_webhook(&payload, Some(&header)).await.unwrap();
        assert_eq!(second.outcome, ReconcileOutcome::Unchanged(OrderStatus::Paid));
        assert_eq!(h.orders.transition_count(), 1);
    }

    #[tokio::test]
    async fn test_terminal_orders_ignore_later_events() {
        let h = harness();
        let order = booked(&h).await;
        let session = order.stripe_session_id.clone();

        let expired = event("checkout.session.expired", &session, "unpaid");
        let header = signed(&h, &expired);
        h.workflow.handle_webhook(&expired, Some(&header)).await.unwrap();

        let paid = event("checkout.session.async_payment_succeeded", &session, "paid");
        let header = signed(&h, &paid);
        let receipt = h.workflow.handle_webhook(&paid, Some(&header)).await.unwrap();
        assert_eq!(receipt.outcome, ReconcileOutcome::Unchanged(OrderStatus::Cancelled));

        let stored = h.orders.find_by_session(&session).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unpaid_completion_waits_for_async_result() {
        let h = harness();
        let order = booked(&h).await;
        let payload = event("checkout.session.completed", &order.stripe_session_id, "unpaid");
        let header = signed(&h, &payload);

        let receipt = h.workflow.handle_webhook(&payload, Some(&header)).await.unwrap();
        assert_eq!(receipt.outcome, ReconcileOutcome::AwaitingPayment);

        let failed = event(
            "checkout.session.async_payment_failed",
            &order.stripe_session_id,
            "unpaid",
        );
        let header = signed(&h, &failed);
        let receipt = h.workflow.handle_webhook(&failed, Some(&header)).await.unwrap();
        assert_eq!(receipt.outcome, ReconcileOutcome::Applied(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_webhook_edge_cases_are_acknowledged() {
        let h = harness();

        let unknown_kind = event("payment_intent.created", "pi_1", "paid");
        let header = signed(&h, &unknown_kind);
        let receipt = h.workflow.handle_webhook(&unknown_kind, Some(&header)).await.unwrap();
        assert_eq!(receipt.outcome, ReconcileOutcome::Ignored);

        let unknown_session = event("checkout.session.completed", "cs_missing", "paid");
        let header = signed(&h, &unknown_session);
        let receipt = h
            .workflow
            .handle_webhook(&unknown_session, Some(&header))
            .await
            .unwrap();
        assert_eq!(receipt.outcome, ReconcileOutcome::OrderNotFound);
    }

    #[tokio::test]
    async fn test_bad_signature_mutates_nothing() {
        let h = harness();
        let order = booked(&h).await;
        let payload = event("checkout.session.completed", &order.stripe_session_id, "paid");
        let header = signature_header("whsec_wrong", h.clock.now().timestamp(), &payload);

        let err = h.workflow.handle_webhook(&payload, Some(&header)).await.unwrap_err();
        assert_eq!(err, WebhookError::Signature(SignatureError::Mismatch));

        let err = h.workflow.handle_webhook(&payload, None).await.unwrap_err();
        assert_eq!(err, WebhookError::Signature(SignatureError::Missing));

        let stored = h.orders.find_by_session(&order.stripe_session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(h.orders.transition_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_webhook_secret() {
        let h = harness();
        let workflow = OrderWorkflow {
            verifier: None,
            ..h.workflow.clone()
        };
        let err = workflow.handle_webhook(b"{}", Some("t=1,v1=00")).await.unwrap_err();
        assert_eq!(err, WebhookError::NotConfigured);
    }

    #[tokio::test]
    async fn test_signed_garbage_is_a_payload_error() {
        let h = harness();
        let header = signed(&h, b"not json");
        let err = h.workflow.handle_webhook(b"not json", Some(&header)).await.unwrap_err();
        assert!(matches!(err, WebhookError::Payload(_)));
    }

    #[tokio::test]
    async fn test_verify_settles_paid_session() {
        let h = harness();
        let order = booked(&h).await;
        h.gateway.set_payment_status(&order.stripe_session_id, PaymentStatus::Paid);

        let outcome = h
            .workflow
            .verify_payment(&identity("ada"), &order.stripe_session_id)
            .await
            .unwrap();
        assert_eq!(outcome.status, OrderStatus::Paid);
        assert!(outcome.updated);

        let again = h
            .workflow
            .verify_payment(&identity("ada"), &order.stripe_session_id)
            .await
            .unwrap();
        assert_eq!(again.status, OrderStatus::Paid);
        assert!(!again.updated);
        assert_eq!(h.orders.transition_count(), 1);
    }

    #[tokio::test]
    async fn test_verify_unpaid_reports_pending() {
        let h = harness();
        let order = booked(&h).await;
        let outcome = h
            .workflow
            .verify_payment(&identity("ada"), &order.stripe_session_id)
            .await
            .unwrap();
        assert_eq!(outcome.status, OrderStatus::Pending);
        assert_eq!(outcome.payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_verify_other_users_order_is_forbidden() {
        let h = harness();
        let order = booked(&h).await;
        h.gateway.set_payment_status(&order.stripe_session_id, PaymentStatus::Paid);

        let err = h
            .workflow
            .verify_payment(&identity("mallory"), &order.stripe_session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::Forbidden(_)));

        let stored = h.orders.find_by_session(&order.stripe_session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_verify_errors() {
        let h = harness();
        assert_eq!(
            h.workflow.verify_payment(&identity("ada"), " ").await.unwrap_err(),
            RentalError::Validation("Session ID required".to_string())
        );
        let err = h
            .workflow
            .verify_payment(&identity("ada"), "cs_missing")
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::NotFound { resource: "Order", .. }));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let h = harness();
        let order = booked(&h).await;

        let first = h.workflow.cancel(&order.stripe_session_id).await.unwrap();
        assert_eq!(first.order_status, Some(OrderStatus::Cancelled));
        assert_eq!(first.status_label(), "cancelled");

        let second = h.workflow.cancel(&order.stripe_session_id).await.unwrap();
        assert_eq!(second.order_status, Some(OrderStatus::Cancelled));
        assert_eq!(h.orders.transition_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_never_touches_paid_session() {
        let h = harness();
        let order = booked(&h).await;
        h.gateway.set_payment_status(&order.stripe_session_id, PaymentStatus::Paid);

        let outcome = h.workflow.cancel(&order.stripe_session_id).await.unwrap();
        assert_eq!(outcome.status_label(), "paid");
        let stored = h.orders.find_by_session(&order.stripe_session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_malformed_session_ids_never_reach_processor() {
        let h = harness();
        h.gateway.set_failing(true);

        for bad in [
            "../../customers?limit=100#",
            "cs_test/../../v1/customers",
            "pi_3abc",
            "cs_",
            "cs_test 1",
        ] {
            let err = h.workflow.cancel(bad).await.unwrap_err();
            assert!(matches!(err, RentalError::Validation(_)), "{bad}: {err:?}");

            let err = h.workflow.verify_payment(&identity("ada"), bad).await.unwrap_err();
            assert!(matches!(err, RentalError::Validation(_)), "{bad}: {err:?}");
        }
        assert!(require_session_id(&format!("cs_{}", "a".repeat(300))).is_err());
        assert_eq!(require_session_id("  cs_test_a1B2 ").unwrap(), "cs_test_a1B2");
    }

    #[tokio::test]
    async fn test_list_for_user_includes_car_summary() {
        let h = harness();
        let first = booked(&h).await;
        h.clock.advance(chrono::Duration::minutes(1));
        let second = h
            .workflow
            .checkout(
                &identity("ada"),
                request(first.car_id, "2025-02-01", "2025-02-02", 1, 150.0),
            )
            .await
            .unwrap()
            .order;

        let listed = h.workflow.list_for_user(&identity("ada")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order.id, second.id);
        assert_eq!(listed[1].order.id, first.id);
        assert_eq!(listed[0].car.as_ref().map(|c| c.brand.as_str()), Some("Tesla"));

        assert!(h.workflow.list_for_user(&identity("bob")).await.unwrap().is_empty());
    }
}
