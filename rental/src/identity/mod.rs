//! Users, credentials and per-request identity resolution.

pub mod extractors;
pub mod model;
pub mod password;
pub mod repository;
pub mod service;
pub mod session;

pub use extractors::CurrentUser;
pub use model::{Identity, LoginRequest, PublicUser, RegisterRequest, User};
pub use repository::UserRepository;
pub use service::{AuthService, LoginOutcome};
pub use session::{Session, SessionStore};
