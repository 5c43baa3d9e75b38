//! In-memory implementations for testing.
//!
//! Every store trait and the payment gateway have a mock here, backed by
//! `Arc<Mutex<..>>` so clones share state. Tests keep a handle to a mock and
//! inspect it after driving the services or the HTTP router.

pub mod catalog;
pub mod fixtures;
pub mod identity;
pub mod orders;
pub mod payments;
pub mod probe;
pub mod reviews;

pub use catalog::MockCarRepository;
pub use identity::{MockSessionStore, MockUserRepository};
pub use orders::MockOrderRepository;
pub use payments::MockPaymentGateway;
pub use probe::MockProbe;
pub use reviews::MockReviewRepository;

use crate::error::RentalError;

#[allow(clippy::needless_pass_by_value)]
fn poisoned<T>(_: std::sync::PoisonError<T>) -> RentalError {
    RentalError::Internal("mock store lock poisoned".to_string())
}
