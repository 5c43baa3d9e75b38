//! Payment processor integration.
//!
//! - [`gateway`]: the `PaymentGateway` trait and its request/response types
//! - [`stripe`]: production implementation over the Stripe REST API
//! - [`webhook`]: signature verification and event parsing for notifications

pub mod gateway;
pub mod stripe;
pub mod webhook;

pub use gateway::{
    CheckoutSession, CheckoutSessionRequest, GatewayResult, LineItem, PaymentGateway,
    PaymentGatewayError, PaymentStatus, ProductRef, ProductSpec, SessionStatus,
};
pub use stripe::StripeGateway;
pub use webhook::{SignatureError, WebhookEvent, WebhookVerifier};
