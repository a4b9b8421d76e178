//! Account HTTP Handlers
//!
//! REST endpoints for registration, token exchange and profile lookup.

use crate::error::AuthError;
use crate::extractors::{AuthUser, ClientInfo};
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::State,
    middleware as axum_middleware,
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Shared service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(auth_service: AuthState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/register", post(register))
        .route("/token", post(login));

    // Protected routes (require a bearer token)
    let protected = Router::new()
        .route("/users/me", get(read_users_me))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(auth_service)
}

// ============================================
// Registration
// ============================================

/// POST /register
///
/// Register a new user account
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let user = auth.register(req).await?;

    Ok(Json(UserResponse::from(user)))
}

// ============================================
// Token Exchange
// ============================================

/// POST /token
///
/// OAuth2 password grant: exchange email and password for a bearer token
pub async fn login(
    State(auth): State<AuthState>,
    ClientInfo { ip, user_agent }: ClientInfo,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    form.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    form.check_grant_type().map_err(AuthError::Validation)?;

    let response = auth
        .login(
            &form.username,
            &form.password,
            ip.as_deref(),
            user_agent.as_deref(),
        )
        .await?;

    Ok(Json(response))
}

// ============================================
// User Profile
// ============================================

/// GET /users/me
///
/// Get the profile of the token's subject
pub async fn read_users_me(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AuthError> {
    let user = auth.current_user(&user.subject).await?;
    Ok(Json(UserResponse::from(user)))
}
