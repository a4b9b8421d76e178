//! Account Authentication Backend
//!
//! User registration and bearer-token issuance:
//! - User registration with duplicate email / username checks
//! - Argon2id password hashing with constant-time verification
//! - Signed, time-limited JWT access tokens
//! - Profile lookup for the token's subject
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `SECRET_KEY` - Secret key for signing tokens (required, min 32 chars)
//! - `ALGORITHM` - HMAC signing algorithm (default: "HS256")
//! - `ACCESS_TOKEN_EXPIRE_MINUTES` - Token lifetime in minutes (default: 30)
//! - `ARGON2_MEMORY_COST`, `ARGON2_TIME_COST`, `ARGON2_PARALLELISM` - hashing cost
//! - `DATABASE_URL` or `DB_HOST` / `DB_PORT` / `DB_NAME` / `DB_USER` / `DB_PASSWORD`
//! - `HOST`, `PORT`, `CORS_ALLOW_ORIGINS` - HTTP listener
//!
//! # Usage
//!
//! ```rust,ignore
//! use account_auth::{build_app, AuthService, PgUserStore, Settings};
//!
//! let settings = Settings::from_env()?;
//! let pool = account_auth::store::connect(&settings.database).await?;
//! let store = Arc::new(PgUserStore::new(pool));
//! let auth = Arc::new(AuthService::new(store, settings.auth.clone())?);
//! let app = build_app(auth, &settings.server)?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::{AuthConfig, DatabaseConfig, ServerConfig, Settings};
pub use error::{AuthError, InvalidTokenError};
pub use extractors::{AuthUser, ClientInfo};
pub use handlers::AuthState;
pub use models::*;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use store::{PgUserStore, UserStore};
pub use token::{Claims, TokenService};

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create account routes
pub fn create_routes(auth_service: AuthState) -> Router {
    handlers::create_routes(auth_service)
}

/// Account routes wrapped with CORS and request tracing.
pub fn build_app(auth_service: AuthState, server: &ServerConfig) -> Result<Router, AuthError> {
    Ok(create_routes(auth_service)
        .layer(cors_layer(server)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(server: &ServerConfig) -> Result<CorsLayer, AuthError> {
    let origins = if server.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins = server
            .cors_allow_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    AuthError::Config(format!("CORS_ALLOW_ORIGINS entry {origin:?} is invalid"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

// ============================================
// Module Tests
// ============================================
