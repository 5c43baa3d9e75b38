//! Payment gateway abstraction.
//!
//! The order workflow needs three things from a hosted-checkout processor:
//! a catalog entry per car, a checkout session per booking attempt, and the
//! live payment status of a session. Everything else about the processor
//! stays behind this trait.

use crate::types::{CarId, Money, UserId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentGatewayError {
    /// Network failure or timeout talking to the processor.
    #[error("Payment processor unreachable: {0}")]
    Unreachable(String),
    /// The processor answered with an error status.
    #[error("Payment processor rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the processor
        status: u16,
        /// Processor error message
        message: String,
    },
    /// The processor answered with a body we could not read.
    #[error("Unexpected payment processor response: {0}")]
    Decode(String),
    /// The request could not be addressed to the processor.
    #[error("Invalid payment processor request: {0}")]
    InvalidRequest(String),
}

/// What the processor needs to know to list a car as a product.
#[derive(Debug, Clone)]
pub struct ProductSpec {
    /// Car the product stands for; the lookup and idempotency key
    pub car_id: CarId,
    /// Display name ("Tesla Model 3 (2023)")
    pub name: String,
    /// Listing description
    pub description: String,
    /// Image URLs shown on the hosted page
    pub images: Vec<String>,
}

/// Processor-side product handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    /// Processor product id
    pub id: String,
}

/// One line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Existing processor product, or `None` for an ad-hoc line
    pub product: Option<ProductRef>,
    /// Name used when `product` is `None`
    pub name: String,
    /// Price per unit
    pub unit_amount: Money,
    /// Number of units
    pub quantity: u32,
}

impl LineItem {
    /// Line total, `None` on overflow.
    #[must_use]
    pub const fn total(&self) -> Option<Money> {
        self.unit_amount.checked_multiply(self.quantity)
    }
}

/// Request for a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Car being booked (copied into session metadata)
    pub car_id: CarId,
    /// Booking user (client reference)
    pub user_id: UserId,
    /// Pre-filled customer email
    pub customer_email: String,
    /// Lines to charge
    pub line_items: Vec<LineItem>,
    /// Redirect after successful payment
    pub success_url: String,
    /// Redirect after abort
    pub cancel_url: String,
    /// Session expiry
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Opaque session id; the join key for reconciliation
    pub id: String,
    /// Hosted payment page URL
    pub url: String,
}

/// Payment status reported by the processor for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds captured
    Paid,
    /// Not (yet) paid
    Unpaid,
    /// Zero-amount session
    NoPaymentRequired,
    /// A status this service does not know about
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Wire literal.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
            Self::Unknown => "unknown",
        }
    }

    /// Only a captured payment counts as paid.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Live view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Session id
    pub id: String,
    /// Payment status
    pub payment_status: PaymentStatus,
}

/// Payment gateway trait
///
/// Abstraction over a hosted-checkout payment processor.
pub trait PaymentGateway: Send + Sync {
    /// Find the product for a car, creating it when none exists.
    ///
    /// Implementations look the product up first and create it with an
    /// idempotency key derived from the car id, so concurrent calls for the
    /// same car end with a single product.
    ///
    /// # Errors
    ///
    /// Returns error if the processor cannot be reached or rejects the call
    fn ensure_product(
        &self,
        spec: ProductSpec,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ProductRef>> + Send + '_>>;

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if the processor cannot be reached or rejects the call
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<CheckoutSession>> + Send + '_>>;

    /// Fetch the live payment status of a session.
    ///
    /// # Errors
    ///
    /// Returns `Rejected { status: 404, .. }` for unknown sessions, other
    /// errors when the processor cannot be reached
    fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<SessionStatus>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_format() {
        let status: PaymentStatus = serde_json::from_str("\"paid\"").unwrap();
        assert!(status.is_paid());
        let status: PaymentStatus = serde_json::from_str("\"no_payment_required\"").unwrap();
        assert!(!status.is_paid());
        let status: PaymentStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, PaymentStatus::Unknown);
    }

    #[test]
    fn test_line_item_total() {
        let item = LineItem {
            product: None,
            name: "Service fee".to_string(),
            unit_amount: Money::from_cents(5_000),
            quantity: 1,
        };
        assert_eq!(item.total(), Some(Money::from_cents(5_000)));
    }
}
