//! Registration, login and logout.

use super::model::{Identity, LoginRequest, PublicUser, RegisterRequest, User, normalize_email};
use super::password;
use super::repository::UserRepository;
use super::session::{Session, SessionStore, generate_token, token_digest};
use crate::environment::Clock;
use crate::error::{RentalError, Result};
use crate::metrics;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Message for every failed login, so callers cannot probe which emails exist.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    /// Bearer token for subsequent requests
    pub token: String,
    /// Token expiry
    pub expires_at: DateTime<Utc>,
    /// The logged-in user
    pub user: PublicUser,
}

/// Account operations.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AuthService {
    /// Create the service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            session_ttl,
        }
    }

    /// The session store, for identity resolution.
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A field is invalid → `RentalError::Validation`
    /// - The email is taken → `RentalError::Conflict`
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser> {
        let request = request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(RentalError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = password::hash(request.password).await?;
        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            avatar: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.users.insert(user).await?;
        metrics::record_registration();
        tracing::info!(user_id = %user.id, "User registered");
        Ok(PublicUser::from(&user))
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::Unauthorized` for an unknown email or a wrong
    /// password, with the same message in both cases.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let email = normalize_email(&request.email);
        let user = self.users.find_by_email(&email).await?;
        let verified = match &user {
            Some(user) => password::verify(request.password, user.password_hash.clone()).await?,
            None => false,
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                metrics::record_login(false);
                return Err(RentalError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        let session = Session {
            identity: Identity::from(&user),
            created_at: now,
            expires_at: now + ttl,
        };

        let token = generate_token();
        self.sessions
            .create(&token_digest(&token), &session, self.session_ttl)
            .await?;

        metrics::record_login(true);
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            token,
            expires_at: session.expires_at,
            user: PublicUser::from(&user),
        })
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns error if the session store is unreachable.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(&token_digest(token)).await
    }

    /// Resolve a token to the identity it authenticates.
    ///
    /// # Errors
    ///
    /// Returns error if the session store is unreachable.
    pub async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        let session = self
            .sessions
            .get(&token_digest(token), self.clock.now())
            .await?;
        Ok(session.map(|s| s.identity))
    }

    /// The stored user behind an identity.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::NotFound` if the account no longer exists.
    pub async fn current_user(&self, identity: &Identity) -> Result<PublicUser> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .map(|user| PublicUser::from(&user))
            .ok_or_else(|| RentalError::not_found("User", identity.user_id))
    }
}
