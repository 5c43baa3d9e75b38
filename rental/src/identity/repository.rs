//! User repository trait.

use super::model::User;
use crate::error::Result;
use crate::types::UserId;
use async_trait::async_trait;

/// User repository.
///
/// This trait abstracts over user database operations (`PostgreSQL`).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Get user by (normalised) email.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Email already exists → `RentalError::Conflict`
    async fn insert(&self, user: User) -> Result<User>;
}
