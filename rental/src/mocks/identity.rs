//! Mock user repository and session store for testing.

use super::poisoned;
use crate::error::{RentalError, Result};
use crate::identity::{Session, SessionStore, User, UserRepository};
use crate::types::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock user repository.
#[derive(Debug, Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MockUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.users.lock().map_err(poisoned)?.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<User> {
        let mut users = self.users.lock().map_err(poisoned)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(RentalError::Conflict("Email already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Mock session store.
///
/// Expiry is checked against the `now` passed to `get`, so tests can expire
/// sessions by advancing a `FixedClock`.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MockSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map_or(0, |s| s.len())
    }

    /// Whether no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn create(&self, digest: &str, session: &Session, _ttl: Duration) -> Result<()> {
        self.sessions
            .lock()
            .map_err(poisoned)?
            .insert(digest.to_string(), session.clone());
        Ok(())
    }

    async fn get(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .lock()
            .map_err(poisoned)?
            .get(digest)
            .filter(|s| s.expires_at > now)
            .cloned())
    }

    async fn revoke(&self, digest: &str) -> Result<()> {
        self.sessions.lock().map_err(poisoned)?.remove(digest);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
