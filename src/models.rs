//! Account Models
//!
//! Data structures for registration and login requests, responses, and the
//! stored user row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// User row from the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Argon2id PHC digest
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written when a user registers
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
}

// ============================================
// Request DTOs
// ============================================

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    pub password: String,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// OAuth2 password-grant form posted to `/token`
///
/// `username` carries the account email.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub password: String,

    pub grant_type: Option<String>,

    #[serde(default)]
    pub scope: String,
}

impl LoginForm {
    /// Only the `password` grant is understood; omitting it is allowed.
    pub fn check_grant_type(&self) -> Result<(), String> {
        match self.grant_type.as_deref() {
            None | Some("password") => Ok(()),
            Some(other) => Err(format!("Unsupported grant_type: {other}")),
        }
    }
}

// ============================================
// Response DTOs
// ============================================

/// Public user profile (no credential fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User summary embedded in the login response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Login response with the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserSummary,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: &User) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user: UserSummary::from(user),
        }
    }
}
