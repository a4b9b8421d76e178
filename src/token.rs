//! Signed bearer tokens.
//!
//! Tokens are JWTs signed with the configured HMAC secret. They carry the
//! subject, issue time, expiry and a random id, and are never stored: a token
//! is valid while its signature checks out and `now < exp`.

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, InvalidTokenError};

use chrono::Duration;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims carried by every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the user's email)
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// Issues and validates access tokens.
pub struct TokenService {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Create a token service that reads the system clock
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        let mut validation = Validation::new(config.algorithm);
        // Expiry is checked against `clock`, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            header: Header::new(config.algorithm),
            encoding_key,
            decoding_key,
            validation,
            clock,
        }
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = self.clock.now();
        let exp = now.checked_add_signed(ttl).ok_or_else(|| {
            tracing::error!(?ttl, "Token lifetime overflows the expiry timestamp");
            AuthError::Internal
        })?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&self.header, &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("JWT encoding failed: {:?}", e);
            AuthError::Internal
        })
    }

    /// Validate a token and return its subject.
    pub fn validate(&self, token: &str) -> Result<String, InvalidTokenError> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Validate a token and return all of its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, InvalidTokenError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "bad_signature",
                    ErrorKind::InvalidAlgorithm => "algorithm_mismatch",
                    _ => "malformed",
                };
                tracing::debug!(reason, "Token rejected: {:?}", e);
                InvalidTokenError
            })?;

        let claims = token_data.claims;
        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            tracing::debug!(reason = "expired", exp = claims.exp, now, "Token rejected");
            return Err(InvalidTokenError);
        }

        Ok(claims)
    }
}
