//! Authentication Error Types
//!
//! Centralized error handling for registration, login and token checks.
//! The service layer returns [`AuthError`]; the HTTP mapping lives in the
//! `IntoResponse` impl below and nowhere else.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Returned by [`TokenService::validate`](crate::token::TokenService::validate).
///
/// Bad signature, malformed structure and expiry all produce this same value
/// so callers cannot tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid or expired token")]
pub struct InvalidTokenError;

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Email already registered")]
    EmailExists,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// Stable machine-readable code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::EmailExists => "email_exists",
            AuthError::UsernameTaken => "username_taken",
            AuthError::Validation(_) => "validation_error",
            AuthError::Config(_) => "configuration_error",
            AuthError::Database(_) | AuthError::Internal => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::EmailExists | AuthError::UsernameTaken => StatusCode::BAD_REQUEST,
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Config(_) | AuthError::Database(_) | AuthError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Config(_) | AuthError::Database(_) | AuthError::Internal => {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let mut response = (
            status,
            Json(serde_json::json!({
                "error": self.code(),
                "message": message
            })),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<InvalidTokenError> for AuthError {
    fn from(_: InvalidTokenError) -> Self {
        AuthError::InvalidToken
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AuthError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_errors_carry_bearer_challenge() {
        for err in [AuthError::InvalidCredentials, AuthError::InvalidToken] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
        }
    }

    #[test]
    fn test_duplicate_registration_is_bad_request() {
        assert_eq!(AuthError::EmailExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UsernameTaken.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::EmailExists.into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AuthError::Database("relation \"users\" does not exist".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }

    #[test]
    fn test_invalid_token_error_converts() {
        let err: AuthError = InvalidTokenError.into();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
