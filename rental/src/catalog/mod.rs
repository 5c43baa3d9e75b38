//! Car catalog: the vehicle record, its query surface and its store.

pub mod model;
pub mod query;
pub mod repository;

pub use model::{Car, CarSummary};
pub use query::{CarFilter, CarListParams, CarPage, CarQuery, Pagination, SortKey, SortOrder};
pub use repository::CarRepository;
