//! Service Configuration
//!
//! All configuration values are loaded from environment variables. Parsing
//! goes through a lookup function so tests can supply their own values
//! without touching the process environment.

use crate::error::AuthError;
use chrono::Duration;
use jsonwebtoken::Algorithm;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Minimum accepted length of `SECRET_KEY`.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Reads one configuration value by name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn var_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, AuthError>
where
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

fn string_or(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Settings for password hashing and token signing.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens (from SECRET_KEY env var)
    pub secret_key: String,

    /// Signing algorithm identifier (from ALGORITHM env var)
    pub algorithm: Algorithm,

    /// Access token lifetime in minutes (from ACCESS_TOKEN_EXPIRE_MINUTES env var)
    pub access_token_expire_minutes: i64,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, AuthError> {
        let secret_key = lookup("SECRET_KEY").ok_or_else(|| {
            AuthError::Config("SECRET_KEY environment variable must be set".to_string())
        })?;

        let algorithm = match lookup("ALGORITHM") {
            Some(raw) => parse_algorithm(raw.trim())?,
            None => Algorithm::HS256,
        };

        let config = Self {
            secret_key,
            algorithm,
            access_token_expire_minutes: var_or(lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            argon2_memory_cost: var_or(lookup, "ARGON2_MEMORY_COST", 65536)?, // 64 MiB
            argon2_time_cost: var_or(lookup, "ARGON2_TIME_COST", 3)?,
            argon2_parallelism: var_or(lookup, "ARGON2_PARALLELISM", 4)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secret_key.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Config(format!(
                "SECRET_KEY must be at least {MIN_SECRET_LENGTH} characters"
            )));
        }

        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Config(
                "ALGORITHM must be one of HS256, HS384, HS512".to_string(),
            ));
        }

        if self.access_token_expire_minutes <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }

        self.access_token_ttl()?;

        Ok(())
    }

    /// Lifetime given to tokens issued at login.
    pub fn access_token_ttl(&self) -> Result<Duration, AuthError> {
        Duration::try_minutes(self.access_token_expire_minutes).ok_or_else(|| {
            AuthError::Config("ACCESS_TOKEN_EXPIRE_MINUTES is too large".to_string())
        })
    }

    /// Cheap Argon2 parameters so hashing stays fast in unoptimized builds.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            secret_key: "test-secret-that-is-long-enough-for-hmac".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: 30,
            argon2_memory_cost: 8,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("argon2_memory_cost", &self.argon2_memory_cost)
            .field("argon2_time_cost", &self.argon2_time_cost)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .finish()
    }
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, AuthError> {
    let algorithm = Algorithm::from_str(raw)
        .map_err(|_| AuthError::Config(format!("ALGORITHM {raw:?} is not recognised")))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(AuthError::Config(format!(
            "ALGORITHM {raw:?} needs a key pair; only HMAC algorithms are supported"
        ))),
    }
}

/// Postgres connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, AuthError> {
        Ok(Self {
            url: lookup("DATABASE_URL"),
            host: string_or(lookup, "DB_HOST", "localhost"),
            port: var_or(lookup, "DB_PORT", 5432)?,
            name: string_or(lookup, "DB_NAME", "mydb"),
            user: string_or(lookup, "DB_USER", "myuser"),
            password: string_or(lookup, "DB_PASSWORD", "mypassword"),
            max_connections: var_or(lookup, "DB_MAX_CONNECTIONS", 5)?,
        })
    }

    /// Connection options; the parts are passed as-is, so the password
    /// needs no URL escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, AuthError> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| AuthError::Config(format!("DATABASE_URL is invalid: {e}"))),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_allow_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, AuthError> {
        let cors_allow_origins = string_or(lookup, "CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            host: var_or(lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: var_or(lookup, "PORT", 8000)?,
            cors_allow_origins,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allow_origins.is_empty() || self.cors_allow_origins.iter().any(|o| o == "*")
    }
}

/// Everything the binary needs at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, AuthError> {
        Ok(Self {
            auth: AuthConfig::from_lookup(lookup)?,
            database: DatabaseConfig::from_lookup(lookup)?,
            server: ServerConfig::from_lookup(lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_auth_config_defaults() {
        let secret = "a".repeat(32);
        let lookup = lookup_from(&[("SECRET_KEY", secret.as_str())]);

        let config = AuthConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.access_token_expire_minutes, 30);
        assert_eq!(config.access_token_ttl().unwrap(), Duration::minutes(30));
        assert_eq!(config.argon2_memory_cost, 65536);
    }

    #[test]
    fn test_auth_config_requires_secret() {
        let lookup = lookup_from(&[]);
        assert!(matches!(
            AuthConfig::from_lookup(&lookup),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_auth_config_short_secret() {
        let lookup = lookup_from(&[("SECRET_KEY", "short")]);
        assert!(AuthConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_auth_config_rejects_asymmetric_algorithm() {
        let secret = "a".repeat(32);
        let lookup = lookup_from(&[("SECRET_KEY", secret.as_str()), ("ALGORITHM", "RS256")]);
        assert!(AuthConfig::from_lookup(&lookup).is_err());

        let lookup = lookup_from(&[("SECRET_KEY", secret.as_str()), ("ALGORITHM", "HS512")]);
        assert_eq!(
            AuthConfig::from_lookup(&lookup).unwrap().algorithm,
            Algorithm::HS512
        );
    }

    #[test]
    fn test_auth_config_rejects_bad_numbers() {
        let secret = "a".repeat(32);
        let lookup = lookup_from(&[
            ("SECRET_KEY", secret.as_str()),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon"),
        ]);
        assert!(AuthConfig::from_lookup(&lookup).is_err());

        let lookup = lookup_from(&[("SECRET_KEY", secret.as_str()), ("ACCESS_TOKEN_EXPIRE_MINUTES", "0")]);
        assert!(AuthConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_auth_config_rejects_unrepresentable_lifetime() {
        let secret = "a".repeat(32);
        let lookup = lookup_from(&[
            ("SECRET_KEY", secret.as_str()),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "9223372036854775807"),
        ]);
        assert!(matches!(
            AuthConfig::from_lookup(&lookup),
            Err(AuthError::Config(_))
        ));

        let mut config = AuthConfig::for_tests();
        config.access_token_expire_minutes = i64::MAX;
        assert!(matches!(config.access_token_ttl(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_auth_config_debug_hides_secret() {
        let secret = "super-secret-value-that-is-long-enough";
        let lookup = lookup_from(&[("SECRET_KEY", secret)]);
        let config = AuthConfig::from_lookup(&lookup).unwrap();

        let printed = format!("{config:?}");
        assert!(!printed.contains(secret));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_database_options_from_parts() {
        let lookup = lookup_from(&[("DB_HOST", "db.internal"), ("DB_NAME", "accounts")]);
        let options = DatabaseConfig::from_lookup(&lookup)
            .unwrap()
            .connect_options()
            .unwrap();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "myuser");
        assert_eq!(options.get_database(), Some("accounts"));
    }

    #[test]
    fn test_database_password_with_url_characters() {
        let lookup = lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PASSWORD", "p@ss/w#rd"),
        ]);
        let options = DatabaseConfig::from_lookup(&lookup)
            .unwrap()
            .connect_options()
            .unwrap();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_database(), Some("mydb"));
    }

    #[test]
    fn test_database_url_override() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://app@localhost:6543/app"),
            ("DB_HOST", "ignored"),
        ]);
        let options = DatabaseConfig::from_lookup(&lookup)
            .unwrap()
            .connect_options()
            .unwrap();

        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn test_database_url_invalid() {
        let lookup = lookup_from(&[("DATABASE_URL", "not a url")]);
        let config = DatabaseConfig::from_lookup(&lookup).unwrap();
        assert!(matches!(config.connect_options(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_server_config() {
        let lookup = lookup_from(&[]);
        let config = ServerConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.bind_addr(), SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert!(config.allows_any_origin());

        let lookup = lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("CORS_ALLOW_ORIGINS", "http://localhost:5173, https://app.example.com"),
        ]);
        let config = ServerConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.bind_addr(), SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert!(!config.allows_any_origin());
        assert_eq!(config.cors_allow_origins.len(), 2);
    }
}
