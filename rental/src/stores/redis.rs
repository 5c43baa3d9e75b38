//! Redis session store.
//!
//! Sessions are stored as JSON under `session:{token digest}` with `SET EX`,
//! so Redis expires them on its own. `get` also checks `expires_at` in case
//! a key outlives its TTL.

use crate::error::{RentalError, Result};
use crate::identity::{Session, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RentalError::Internal(format!("Failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await?;
        Ok(Self { conn_manager })
    }

    fn session_key(digest: &str) -> String {
        format!("session:{digest}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, digest: &str, session: &Session, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let value = serde_json::to_string(session)
            .map_err(|e| RentalError::Internal(format!("Failed to encode session: {e}")))?;
        let () = conn
            .set_ex(Self::session_key(digest), value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn get(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn.get(Self::session_key(digest)).await?;
        let Some(value) = value else {
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&value) {
            Ok(session) if session.expires_at > now => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session");
                Ok(None)
            }
        }
    }

    async fn revoke(&self, digest: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: i64 = conn.del(Self::session_key(digest)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
