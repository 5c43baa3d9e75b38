//! Bearer-token sessions.
//!
//! A login issues an opaque random token. Only its SHA-256 digest is used as
//! the storage key, so a leaked session store does not leak usable tokens.

use super::model::Identity;
use crate::error::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Who the token authenticates
    pub identity: Identity,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

/// Session store.
///
/// Keys are token digests (see [`token_digest`]); implementations never see
/// the raw token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session under `digest` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn create(&self, digest: &str, session: &Session, ttl: Duration) -> Result<()>;

    /// Look a session up. Expired and unknown sessions are `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn get(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Session>>;

    /// Delete a session. Deleting an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn revoke(&self, digest: &str) -> Result<()>;

    /// Connectivity check for readiness probes.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn ping(&self) -> Result<()>;
}

/// A fresh 256-bit token, URL-safe base64.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage key for a token.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
