//! Account Service
//!
//! Registration, login and profile lookup. Composes the password hasher,
//! the token service and a [`UserStore`].

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::UserStore;
use crate::token::TokenService;

use std::sync::Arc;

/// Account service
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new account service
    pub fn new(store: Arc<dyn UserStore>, config: AuthConfig) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(&config)?;
        let tokens = TokenService::new(&config);
        Ok(Self::from_parts(store, hasher, tokens, config))
    }

    /// Assemble a service from already-built components.
    pub fn from_parts(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            config,
        }
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new user
    ///
    /// The email and username pre-checks give precise errors; the store's
    /// unique constraints still decide when two registrations race.
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AuthError> {
        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        if self.store.find_by_username(&req.username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash_password(req.password).await?;

        let user = self
            .store
            .insert(NewUser {
                username: req.username,
                email: req.email,
                password_hash,
                full_name: req.full_name,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok(user)
    }

    // ============================================
    // Login
    // ============================================

    /// Exchange email and password for a bearer token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<TokenResponse, AuthError> {
        let user = self.store.find_by_email(email).await?;

        let digest = user.as_ref().map(|u| u.password_hash.clone());
        let verified = self.verify_password(password.to_string(), digest).await?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::warn!(
                    ip = ip_address.unwrap_or("unknown"),
                    user_agent = user_agent.unwrap_or("unknown"),
                    "Failed login attempt"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self
            .tokens
            .issue(&user.email, self.config.access_token_ttl()?)?;

        tracing::info!(
            user_id = user.id,
            ip = ip_address.unwrap_or("unknown"),
            user_agent = user_agent.unwrap_or("unknown"),
            "User logged in"
        );

        Ok(TokenResponse::bearer(access_token, &user))
    }

    // ============================================
    // Profile
    // ============================================

    /// Validate a bearer token and return its subject
    pub fn authenticate(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Resolve a token subject to its user
    ///
    /// A subject whose account no longer exists is rejected the same way as an
    /// invalid token.
    pub async fn current_user(&self, subject: &str) -> Result<User, AuthError> {
        self.store
            .find_by_email(subject)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    // ============================================
    // Hashing Helpers
    // ============================================

    /// Argon2 is CPU bound, so it runs off the async workers.
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// Without a digest, a dummy verification runs so unknown accounts cost
    /// the same as wrong passwords.
    async fn verify_password(
        &self,
        password: String,
        digest: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let verified = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&password, &digest),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
        .await?;
        Ok(verified)
    }
}
