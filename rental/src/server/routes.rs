//! Router configuration for the rental service.

use super::health::{health_check, metrics, readiness_check};
use super::state::AppState;
use crate::api::{auth, cars, checkout, orders, reviews, webhook};
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use car_rental_web::correlation_id_layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// # Routes
///
/// ## Catalog
/// - `GET /api/cars` - Filtered, sorted, paged listing
/// - `GET /api/cars/:id` - One car
///
/// ## Accounts
/// - `POST /api/auth/register`, `POST /api/auth/login`,
///   `POST /api/auth/logout`, `GET /api/auth/me`
///
/// ## Bookings
/// - `POST /api/checkout` - Create a hosted checkout session and pending order
/// - `POST /api/stripe/webhook` - Signed processor notifications
/// - `GET /api/orders` - Caller's orders
/// - `POST /api/orders/verify-payment` - Settle after the success redirect
/// - `POST /api/orders/cancel` - Record an aborted checkout
///
/// ## Reviews
/// - `GET /api/reviews?carId=` and `POST /api/reviews`
///
/// ## Operations
/// - `GET /health`, `GET /ready`, `GET /metrics`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/:id", get(cars::get_car))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/checkout", post(checkout::create_checkout))
        .route("/stripe/webhook", post(webhook::stripe_webhook))
        .route("/orders", get(orders::list_orders))
        .route("/orders/verify-payment", post(orders::verify_payment))
        .route("/orders/cancel", post(orders::cancel_order))
        .route("/reviews", get(reviews::list_reviews).post(reviews::create_review));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
