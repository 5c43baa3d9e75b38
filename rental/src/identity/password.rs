//! Password hashing with Argon2id.
//!
//! Argon2 is deliberately slow, so the async entry points [`hash`] and
//! [`verify`] run it on the blocking thread pool.

use crate::error::{RentalError, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a cleartext password into a PHC string.
///
/// # Errors
///
/// Returns `RentalError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RentalError::Internal(format!("password hashing failed: {e}")))
}

/// Check a cleartext password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking thread pool.
///
/// # Errors
///
/// Returns `RentalError::Internal` if hashing fails or the task is lost.
pub async fn hash(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| RentalError::Internal(format!("password hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking thread pool.
///
/// # Errors
///
/// Returns `RentalError::Internal` if the task is lost.
pub async fn verify(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| RentalError::Internal(format!("password verification task failed: {e}")))
}
