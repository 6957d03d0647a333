//! User model - journal account holders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub email_verified: bool,
    pub verification_code_hash: Option<String>,
    pub verification_expires_utc: Option<DateTime<Utc>>,
    pub reset_code_hash: Option<String>,
    pub reset_expires_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub last_login_utc: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user. Emails are stored lowercased.
    pub fn new(
        email: &str,
        display_name: Option<String>,
        password_hash: String,
        email_verified: bool,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: normalize_email(email),
            display_name,
            password_hash,
            is_admin: false,
            email_verified,
            verification_code_hash: None,
            verification_expires_utc: None,
            reset_code_hash: None,
            reset_expires_utc: None,
            created_utc: Utc::now(),
            last_login_utc: None,
        }
    }

    /// Convert to sanitized response (no sensitive fields).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub email_verified: bool,
    pub created_utc: DateTime<Utc>,
    pub last_login_utc: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            display_name: u.display_name,
            is_admin: u.is_admin,
            email_verified: u.email_verified,
            created_utc: u.created_utc,
            last_login_utc: u.last_login_utc,
        }
    }
}
