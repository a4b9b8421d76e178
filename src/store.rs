//! User storage.
//!
//! [`UserStore`] is what the service needs from persistence: exact-match
//! lookups on email and username, and an insert. [`PgUserStore`] is the
//! Postgres implementation.

use crate::config::DatabaseConfig;
use crate::error::AuthError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, username, email, password, full_name, avatar_url, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    /// Insert a user. Fails with `EmailExists` or `UsernameTaken` when a
    /// unique constraint is hit.
    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;
}

/// Open a connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, AuthError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.connect_options()?)
        .await?;
    Ok(pool)
}

/// Create the `users` table if it does not exist.
pub async fn run_migrations(db: &PgPool) -> Result<(), AuthError> {
    tracing::info!("Running account database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(50) NOT NULL,
            email VARCHAR(255) NOT NULL,
            password VARCHAR(255) NOT NULL,
            full_name VARCHAR(100),
            avatar_url VARCHAR(500),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT users_email_key UNIQUE (email),
            CONSTRAINT users_username_key UNIQUE (username)
        );
        "#,
    )
    .execute(db)
    .await?;

    tracing::info!("Account migrations completed successfully");
    Ok(())
}

/// Postgres-backed [`UserStore`]
#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)
    }
}

/// Unique violations surface as the matching duplicate error.
fn map_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(constraint) if constraint.contains("username") => AuthError::UsernameTaken,
                _ => AuthError::EmailExists,
            };
        }
    }
    AuthError::from(err)
}
