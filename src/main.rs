//! Account backend server.
//!
//! Loads settings, connects to Postgres, ensures the `users` table exists and
//! serves the account routes.

use account_auth::{build_app, store, AuthError, AuthService, PgUserStore, Settings};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AuthError> {
    let settings = Settings::from_env()?;
    tracing::debug!(?settings, "Settings loaded");

    let pool = store::connect(&settings.database).await?;
    tracing::info!("Database connection pool created");

    store::run_migrations(&pool).await?;

    let user_store = Arc::new(PgUserStore::new(pool));
    let auth = Arc::new(AuthService::new(user_store, settings.auth.clone())?);
    let app = build_app(auth, &settings.server)?;

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        AuthError::Config(format!("Failed to bind {addr}: {e}"))
    })?;
    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| {
            tracing::error!("Server error: {:?}", e);
            AuthError::Internal
        })
}
