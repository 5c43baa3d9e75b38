//! User records and the resolved request identity.

use crate::error::{RentalError, Result};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// A registered user as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User id
    pub id: UserId,
    /// Lowercase email, unique
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Optional avatar URL
    pub avatar: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A user as shown to clients. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// User id
    pub id: UserId,
    /// Email
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Phone number
    pub phone: Option<String>,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
        }
    }
}

/// The authenticated caller of a request.
///
/// This is what the rest of the application sees of a user: it is resolved
/// per request from the bearer token and passed to workflows explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User id
    pub user_id: UserId,
    /// Email
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

impl Identity {
    /// `"{first} {last}"`, the name snapshotted onto reviews.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email
    #[serde(default)]
    pub email: String,
    /// Cleartext password
    #[serde(default)]
    pub password: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Phone number
    pub phone: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Email
    #[serde(default)]
    pub email: String,
    /// Cleartext password
    #[serde(default)]
    pub password: String,
}

/// Trim and lowercase an email.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email address format.
///
/// This performs basic validation:
/// - Must contain exactly one `@`
/// - Must have non-empty local and domain parts, the domain with a dot
/// - Length must be between 3 and 255 characters
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 || email.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

impl RegisterRequest {
    /// Check and normalise the registration fields.
    ///
    /// # Errors
    ///
    /// Returns `RentalError::Validation` for the first violated constraint.
    pub fn validate(mut self) -> Result<Self> {
        self.email = normalize_email(&self.email);
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if self.email.is_empty()
            || self.password.is_empty()
            || self.first_name.is_empty()
            || self.last_name.is_empty()
        {
            return Err(RentalError::Validation(
                "Email, password, first name and last name are required".to_string(),
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(RentalError::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(RentalError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if self.first_name.chars().count() > 50 || self.last_name.chars().count() > 50 {
            return Err(RentalError::Validation(
                "Names cannot exceed 50 characters".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            phone: Some("   ".to_string()),
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada.example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("ada @example.com"));
    }

    #[test]
    fn test_register_normalises() {
        let request = register("  Ada@Example.COM ", "correct horse").validate().unwrap();
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.first_name, "Ada");
        assert_eq!(request.phone, None);
    }

    #[test]
    fn test_register_rejects_short_password() {
        let err = register("ada@example.com", "short").validate().unwrap_err();
        assert_eq!(
            err,
            RentalError::Validation("Password must be at least 8 characters".to_string())
        );
    }

    #[test]
    fn test_display_name() {
        let identity = Identity {
            user_id: UserId::new(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        };
        assert_eq!(identity.display_name(), "Ada Lovelace");
    }
}
