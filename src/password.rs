//! Argon2id password hashing and verification.
//!
//! Digests are PHC strings, so the algorithm parameters and salt travel with
//! the hash. Verification reads the parameters from the digest, which keeps
//! older digests valid after the configured cost changes.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher as _,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Hashes and verifies plaintext passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Verified against when the login names an unknown user
    dummy_digest: String,
}

impl PasswordHasher {
    /// Build a hasher from the configured Argon2 cost parameters.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_digest = argon2
            .hash_password(b"unknown-account-placeholder", &salt)?
            .to_string();

        Ok(Self {
            argon2,
            dummy_digest,
        })
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Hashing the same plaintext twice gives two different digests. Empty
    /// plaintexts are accepted.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)?
            .to_string();
        Ok(digest)
    }

    /// Check a password against a stored digest.
    ///
    /// The final comparison is constant-time. A digest that cannot be parsed
    /// never matches.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(PasswordHashError::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    /// Spend the same work as [`verify`](Self::verify) without a real digest.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&AuthConfig::for_tests()).expect("test params are valid")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let digest = hasher.hash("correct-horse-battery-staple").unwrap();

        assert!(digest.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(hasher.verify("correct-horse-battery-staple", &digest));
    }

    #[test]
    fn test_wrong_password_fails() {
        let hasher = hasher();
        let digest = hasher.hash("real-password").unwrap();

        assert!(!hasher.verify("wrong-password", &digest));
        assert!(!hasher.verify("real-passwor", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_empty_password_allowed() {
        let hasher = hasher();
        let digest = hasher.hash("").unwrap();

        assert!(hasher.verify("", &digest));
        assert!(!hasher.verify(" ", &digest));
    }

    #[test]
    fn test_same_password_gets_distinct_digests() {
        let hasher = hasher();
        let first = hasher.hash("repeat-me").unwrap();
        let second = hasher.hash("repeat-me").unwrap();

        assert_ne!(first, second, "salts must differ per call");
        assert!(hasher.verify("repeat-me", &first));
        assert!(hasher.verify("repeat-me", &second));
    }

    #[test]
    fn test_malformed_digest_does_not_match() {
        let hasher = hasher();
        assert!(!hasher.verify("password123", "not-a-phc-string"));
        assert!(!hasher.verify("password123", ""));
    }

    #[test]
    fn test_digest_from_other_params_still_verifies() {
        let cheap = hasher();
        let digest = cheap.hash("portable").unwrap();

        let mut config = AuthConfig::for_tests();
        config.argon2_time_cost = 2;
        let costlier = PasswordHasher::new(&config).unwrap();

        assert!(costlier.verify("portable", &digest));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut config = AuthConfig::for_tests();
        config.argon2_time_cost = 0;

        assert!(matches!(
            PasswordHasher::new(&config),
            Err(AuthError::Config(_))
        ));
    }
}
