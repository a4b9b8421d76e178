//! Authentication Middleware
//!
//! Bearer token validation for protected routes.

use crate::error::AuthError;
use crate::extractors::{bearer_token, AuthUser};
use crate::handlers::AuthState;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Require a valid bearer token
///
/// Validates the token from the Authorization header and stores the subject
/// in request extensions for the [`AuthUser`] extractor.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!("Request without bearer token");
        AuthError::InvalidToken
    })?;
    let subject = auth.authenticate(token)?;

    req.extensions_mut().insert(AuthUser { subject });

    Ok(next.run(req).await)
}
