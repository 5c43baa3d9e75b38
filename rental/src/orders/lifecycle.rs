//! Order status lifecycle.
//!
//! Maps each payment signal to the status it asks for. Whether the move
//! actually happens is decided by the store: a transition is only applied
//! to an order that is still `pending`, so replays and races between the
//! webhook and the verification path collapse into no-ops.

use crate::payments::PaymentStatus;
use crate::types::OrderStatus;

/// Which path delivered a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Signed server-to-server notification
    Webhook,
    /// Client-triggered verification after redirect
    Verification,
    /// Client-triggered abort after a cancelled checkout
    Cancellation,
}

impl SignalSource {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Verification => "verification",
            Self::Cancellation => "cancellation",
        }
    }
}

/// A payment-lifecycle fact about one checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSignal {
    /// The customer finished the hosted checkout
    SessionCompleted {
        /// Payment status reported with the completion
        payment_status: PaymentStatus,
    },
    /// The session expired unused
    SessionExpired,
    /// A delayed payment method settled
    AsyncPaymentSucceeded,
    /// A delayed payment method failed
    AsyncPaymentFailed,
    /// The processor reports the session paid when asked directly
    ConfirmedPaid,
    /// The client aborted and the processor reports the session unpaid
    AbortedUnpaid,
}

impl PaymentSignal {
    /// Interpret a notification kind. Unknown kinds are `None`.
    #[must_use]
    pub fn from_event(kind: &str, payment_status: PaymentStatus) -> Option<Self> {
        match kind {
            "checkout.session.completed" => Some(Self::SessionCompleted { payment_status }),
            "checkout.session.expired" => Some(Self::SessionExpired),
            "checkout.session.async_payment_succeeded" => Some(Self::AsyncPaymentSucceeded),
            "checkout.session.async_payment_failed" => Some(Self::AsyncPaymentFailed),
            _ => None,
        }
    }

    /// Status this signal asks for, `None` when it asks for nothing.
    ///
    /// A completed session with a payment still in flight asks for nothing;
    /// the async success or failure notification settles it later.
    #[must_use]
    pub const fn target(&self) -> Option<OrderStatus> {
        match self {
            Self::SessionCompleted { payment_status } => {
                if payment_status.is_paid() {
                    Some(OrderStatus::Paid)
                } else {
                    None
                }
            }
            Self::AsyncPaymentSucceeded | Self::ConfirmedPaid => Some(OrderStatus::Paid),
            Self::SessionExpired | Self::AsyncPaymentFailed | Self::AbortedUnpaid => {
                Some(OrderStatus::Cancelled)
            }
        }
    }
}

/// Result of asking the store to move an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T> {
    /// The order was `pending` and now has the target status
    Applied(T),
    /// The order exists but was already terminal; nothing changed
    Unchanged(T),
    /// No order carries this session id
    NotFound,
}

impl<T> Transition<T> {
    /// The order after the call, if one exists.
    #[must_use]
    pub fn into_order(self) -> Option<T> {
        match self {
            Self::Applied(order) | Self::Unchanged(order) => Some(order),
            Self::NotFound => None,
        }
    }

    /// Whether a status actually changed.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_table() {
        let completed_paid =
            PaymentSignal::from_event("checkout.session.completed", PaymentStatus::Paid);
        assert_eq!(completed_paid.and_then(|s| s.target()), Some(OrderStatus::Paid));

        let completed_unpaid =
            PaymentSignal::from_event("checkout.session.completed", PaymentStatus::Unpaid);
        assert!(completed_unpaid.is_some());
        assert_eq!(completed_unpaid.and_then(|s| s.target()), None);

        let expired = PaymentSignal::from_event("checkout.session.expired", PaymentStatus::Unpaid);
        assert_eq!(expired.and_then(|s| s.target()), Some(OrderStatus::Cancelled));

        let async_ok = PaymentSignal::from_event(
            "checkout.session.async_payment_succeeded",
            PaymentStatus::Unpaid,
        );
        assert_eq!(async_ok.and_then(|s| s.target()), Some(OrderStatus::Paid));

        let async_failed = PaymentSignal::from_event(
            "checkout.session.async_payment_failed",
            PaymentStatus::Unpaid,
        );
        assert_eq!(async_failed.and_then(|s| s.target()), Some(OrderStatus::Cancelled));

        assert_eq!(
            PaymentSignal::from_event("payment_intent.created", PaymentStatus::Paid),
            None
        );
    }

    #[test]
    fn test_direct_signals() {
        assert_eq!(PaymentSignal::ConfirmedPaid.target(), Some(OrderStatus::Paid));
        assert_eq!(PaymentSignal::AbortedUnpaid.target(), Some(OrderStatus::Cancelled));
    }

    #[test]
    fn test_transition_helpers() {
        assert!(Transition::Applied(1).is_applied());
        assert!(!Transition::Unchanged(1).is_applied());
        assert_eq!(Transition::<i32>::NotFound.into_order(), None);
        assert_eq!(Transition::Unchanged(7).into_order(), Some(7));
    }
}
