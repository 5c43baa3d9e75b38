//! HTTP server assembly: shared state, router and health endpoints.

pub mod health;
pub mod routes;
pub mod state;

pub use health::ReadinessProbe;
pub use routes::build_router;
pub use state::AppState;
