//! Mock payment gateway for testing.

use crate::payments::{
    CheckoutSession, CheckoutSessionRequest, GatewayResult, PaymentGateway, PaymentGatewayError,
    PaymentStatus, ProductRef, ProductSpec, SessionStatus,
};
use crate::types::CarId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Mock payment gateway.
///
/// Products are created once per car. Sessions start `unpaid`; tests flip
/// them with [`set_payment_status`](Self::set_payment_status). With
/// [`set_failing`](Self::set_failing) every call fails as unreachable.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    products: Arc<Mutex<HashMap<CarId, ProductRef>>>,
    sessions: Arc<Mutex<HashMap<String, PaymentStatus>>>,
    requests: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
    failing: Arc<AtomicBool>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Set the status the processor reports for a session.
    pub fn set_payment_status(&self, session_id: &str, status: PaymentStatus) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.to_string(), status);
        }
    }

    /// Number of products created.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.lock().map_or(0, |p| p.len())
    }

    /// Number of sessions created.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.requests.lock().map_or(0, |r| r.len())
    }

    /// Every session request received, in order.
    #[must_use]
    pub fn session_requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> GatewayResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Unreachable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

fn lock_error<T>(_: std::sync::PoisonError<T>) -> PaymentGatewayError {
    PaymentGatewayError::Decode("mock gateway lock poisoned".to_string())
}

impl PaymentGateway for MockPaymentGateway {
    fn ensure_product(
        &self,
        spec: ProductSpec,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ProductRef>> + Send + '_>> {
        Box::pin(async move {
            self.check_reachable()?;
            let mut products = self.products.lock().map_err(lock_error)?;
            let product = products
                .entry(spec.car_id)
                .or_insert_with(|| ProductRef {
                    id: format!("prod_{}", spec.car_id.as_uuid().simple()),
                })
                .clone();
            Ok(product)
        })
    }

    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<CheckoutSession>> + Send + '_>> {
        Box::pin(async move {
            self.check_reachable()?;
            let id = format!("cs_test_{}", uuid::Uuid::new_v4().simple());
            self.sessions
                .lock()
                .map_err(lock_error)?
                .insert(id.clone(), PaymentStatus::Unpaid);
            self.requests.lock().map_err(lock_error)?.push(request);
            Ok(CheckoutSession {
                url: format!("https://checkout.stripe.test/c/pay/{id}"),
                id,
            })
        })
    }

    fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<SessionStatus>> + Send + '_>> {
        let session_id = session_id.to_string();
        Box::pin(async move {
            self.check_reachable()?;
            let status = self
                .sessions
                .lock()
                .map_err(lock_error)?
                .get(&session_id)
                .copied()
                .ok_or_else(|| PaymentGatewayError::Rejected {
                    status: 404,
                    message: format!("No such checkout.session: '{session_id}'"),
                })?;
            Ok(SessionStatus {
                id: session_id,
                payment_status: status,
            })
        })
    }
}
