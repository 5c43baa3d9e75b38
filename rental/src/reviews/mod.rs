//! Reviews and the car rating aggregate derived from them.

pub mod model;
pub mod rating;
pub mod repository;
pub mod service;

pub use model::{CreateReviewRequest, Review, ReviewInput};
pub use rating::RatingSummary;
pub use repository::ReviewRepository;
pub use service::ReviewService;
