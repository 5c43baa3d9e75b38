//! Bookings and their payment lifecycle.

pub mod lifecycle;
pub mod model;
pub mod repository;
pub mod workflow;

pub use lifecycle::{PaymentSignal, SignalSource, Transition};
pub use model::{BookingRequest, CheckoutRequest, Order, OrderWithCar, rental_days};
pub use repository::{OrderRepository, blocks_window};
pub use workflow::{
    CancelOutcome, CheckoutOutcome, CheckoutSettings, OrderWorkflow, ReconcileOutcome,
    VerifyOutcome, WebhookError, WebhookReceipt,
};
