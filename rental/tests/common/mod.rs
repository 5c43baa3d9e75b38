//! Shared setup for the HTTP integration tests.
//!
//! Builds the real router over in-memory stores, the mock payment gateway
//! and a fixed clock, and hands back handles to all of them so tests can
//! arrange state and inspect side effects.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestResponse, TestServer};
use car_rental::catalog::{Car, CarRepository};
use car_rental::environment::{test_clock, Clock, FixedClock};
use car_rental::identity::session::token_digest;
use car_rental::identity::{AuthService, Identity, Session, SessionStore};
use car_rental::mocks::fixtures;
use car_rental::mocks::{
    MockCarRepository, MockOrderRepository, MockPaymentGateway, MockProbe, MockReviewRepository,
    MockSessionStore, MockUserRepository,
};
use car_rental::orders::{CheckoutSettings, OrderWorkflow};
use car_rental::payments::webhook::{signature_header, SIGNATURE_HEADER};
use car_rental::payments::WebhookVerifier;
use car_rental::reviews::ReviewService;
use car_rental::server::{build_router, AppState};
use car_rental::types::Money;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub struct TestApp {
    pub server: TestServer,
    pub cars: Arc<MockCarRepository>,
    pub orders: Arc<MockOrderRepository>,
    pub reviews: Arc<MockReviewRepository>,
    pub users: Arc<MockUserRepository>,
    pub sessions: Arc<MockSessionStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub database: Arc<MockProbe>,
    pub clock: FixedClock,
}

/// App with webhook verification enabled.
pub fn spawn_app() -> TestApp {
    build(true)
}

/// App started without a webhook signing secret.
pub fn spawn_app_without_webhook_secret() -> TestApp {
    build(false)
}

fn build(with_webhook_secret: bool) -> TestApp {
    let clock = test_clock();
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

    let cars = Arc::new(MockCarRepository::new());
    let orders = Arc::new(MockOrderRepository::new());
    let reviews = Arc::new(MockReviewRepository::new());
    let users = Arc::new(MockUserRepository::new());
    let sessions = Arc::new(MockSessionStore::new());
    let gateway = Arc::new(MockPaymentGateway::new());
    let database = Arc::new(MockProbe::new());

    let auth = AuthService::new(
        users.clone(),
        sessions.clone(),
        shared_clock.clone(),
        Duration::from_secs(3_600),
    );
    let review_service = ReviewService::new(reviews.clone(), cars.clone(), shared_clock.clone());
    let mut workflow = OrderWorkflow::new(
        orders.clone(),
        cars.clone(),
        gateway.clone(),
        shared_clock.clone(),
        CheckoutSettings {
            service_fee: Money::from_cents(5_000),
            session_ttl: chrono::Duration::minutes(30),
            public_base_url: "http://localhost:3000".to_string(),
        },
    );
    if with_webhook_secret {
        workflow = workflow.with_webhook_verifier(WebhookVerifier::new(
            WEBHOOK_SECRET,
            300,
            shared_clock.clone(),
        ));
    }

    let state = AppState::new(cars.clone(), auth, workflow, review_service, database.clone());
    let server = TestServer::new(build_router(state)).expect("test server");

    TestApp {
        server,
        cars,
        orders,
        reviews,
        users,
        sessions,
        gateway,
        database,
        clock,
    }
}

impl TestApp {
    /// Store a car with a unique plate.
    pub async fn add_car(&self, price_per_day: u64, plate: &str) -> Car {
        let mut car = fixtures::car(price_per_day);
        car.license_plate = plate.to_string();
        self.cars.insert(car).await.expect("insert car")
    }

    /// Mint a bearer token for the fixture identity `name`.
    pub async fn token_for(&self, name: &str) -> (String, Identity) {
        let identity = fixtures::identity(name);
        let token = format!("token-{name}");
        let now = self.clock.now();
        let session = Session {
            identity: identity.clone(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        self.sessions
            .create(&token_digest(&token), &session, Duration::from_secs(3_600))
            .await
            .expect("create session");
        (token, identity)
    }

    /// `POST /api/checkout` as `token`.
    pub async fn checkout(&self, token: &str, body: &Value) -> TestResponse {
        self.server
            .post("/api/checkout")
            .authorization_bearer(token)
            .json(body)
            .await
    }

    /// Deliver a correctly signed webhook.
    pub async fn send_webhook(&self, payload: &Value) -> TestResponse {
        let body = payload.to_string().into_bytes();
        let header = signature_header(WEBHOOK_SECRET, self.clock.now().timestamp(), &body);
        self.send_raw_webhook(body, Some(&header)).await
    }

    /// Deliver a webhook with an arbitrary signature header.
    pub async fn send_raw_webhook(&self, body: Vec<u8>, signature: Option<&str>) -> TestResponse {
        let mut request = self
            .server
            .post("/api/stripe/webhook")
            .content_type("application/json");
        if let Some(signature) = signature {
            request = request.add_header(
                HeaderName::from_static(SIGNATURE_HEADER),
                HeaderValue::from_str(signature).expect("header value"),
            );
        }
        request.bytes(body.into()).await
    }
}

/// Checkout body for three days from 2025-01-10 (clock starts 2025-01-01).
pub fn booking(car: &Car, total: f64) -> Value {
    booking_window(car, "2025-01-10", "2025-01-13", 3, total)
}

pub fn booking_window(car: &Car, pickup: &str, dropoff: &str, days: i64, total: f64) -> Value {
    json!({
        "carId": car.id.to_string(),
        "pickupLocation": "Berlin Hbf",
        "dropoffLocation": "Berlin Hbf",
        "pickupDate": pickup,
        "dropoffDate": dropoff,
        "pickupTime": "10:00",
        "dropoffTime": "10:00",
        "days": days,
        "total": total,
    })
}

/// A checkout-session event envelope.
pub fn session_event(kind: &str, session_id: &str, payment_status: &str) -> Value {
    json!({
        "id": format!("evt_{kind}_{session_id}"),
        "type": kind,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": payment_status,
            }
        }
    })
}

impl TestApp {
    /// Current fixed time as a unix timestamp.
    pub fn clock_timestamp(&self) -> i64 {
        self.clock.now().timestamp()
    }
}
