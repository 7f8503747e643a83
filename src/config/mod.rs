//! Configuration management for the SIWE auth server
//!
//! Configuration is read once at startup from environment variables (and an
//! optional `.env` file). Any missing or malformed sign-in setting is fatal:
//! the server refuses to start rather than failing requests later.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::message::is_valid_domain;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

/// Where issued nonces are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonceStoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for NonceStoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(NonceStoreBackend::Postgres),
            "memory" => Ok(NonceStoreBackend::Memory),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid NONCE_STORE: '{}'. Expected: postgres or memory",
                s
            ))),
        }
    }
}

/// Sign-in message settings
///
/// Only obtainable through [`SiweOptions::new`], so holding one means the
/// settings were validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweOptions {
    domain: String,
    statement: String,
    version: String,
    prevent_replay: bool,
    message_validity: chrono::Duration,
}

impl SiweOptions {
    pub fn new(
        domain: impl Into<String>,
        statement: impl Into<String>,
        version: impl Into<String>,
        prevent_replay: bool,
        message_validity_ms: i64,
    ) -> Result<Self, ConfigError> {
        let domain = domain.into();
        let statement = statement.into();
        let version = version.into();

        if !is_valid_domain(&domain) {
            return Err(ConfigError::InvalidValue(format!(
                "SIWE domain must be a host with an optional port, got '{}'",
                domain
            )));
        }
        if statement.is_empty() || statement.contains('\n') {
            return Err(ConfigError::InvalidValue(
                "SIWE statement must be a non-empty single line".to_string(),
            ));
        }
        if version.parse::<siwe::Version>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "SIWE version must be 1, got '{}'",
                version
            )));
        }

        let message_validity = chrono::Duration::try_milliseconds(message_validity_ms)
            .filter(|validity| *validity > chrono::Duration::zero())
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "SIWE message validity must be a positive number of milliseconds, got {}",
                    message_validity_ms
                ))
            })?;

        Ok(Self {
            domain,
            statement,
            version,
            prevent_replay,
            message_validity,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prevent_replay(&self) -> bool {
        self.prevent_replay
    }

    pub fn message_validity(&self) -> chrono::Duration {
        self.message_validity
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Nonce store backend
    pub nonce_store: NonceStoreBackend,

    /// Database connection URL, required for the Postgres backend
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Upper bound for a single nonce store call
    pub nonce_store_timeout: Duration,

    /// Cron expression for the expired nonce sweep
    pub nonce_cleanup_schedule: String,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Sign-in message settings
    pub siwe: SiweOptions,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let environment: Environment = lookup("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let port = lookup("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let nonce_store: NonceStoreBackend = lookup("NONCE_STORE")
            .map(|s| s.parse::<NonceStoreBackend>())
            .transpose()?
            .unwrap_or_default();

        let database_url = match nonce_store {
            NonceStoreBackend::Postgres => Some(required("DATABASE_URL")?),
            NonceStoreBackend::Memory => lookup("DATABASE_URL"),
        };

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|max| *max > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DB_MAX_CONNECTIONS must be a positive integer".to_string(),
                )
            })?;

        let nonce_store_timeout = lookup("NONCE_STORE_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                ConfigError::InvalidValue("NONCE_STORE_TIMEOUT_MS must be a number".to_string())
            })?;

        let nonce_cleanup_schedule =
            lookup("NONCE_CLEANUP_SCHEDULE").unwrap_or_else(|| "0 */5 * * * *".to_string());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS");

        let prevent_replay = parse_bool("SIWE_PREVENT_REPLAY", &required("SIWE_PREVENT_REPLAY")?)?;

        let message_validity_ms = required("SIWE_MESSAGE_VALIDITY_MS")?
            .trim()
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SIWE_MESSAGE_VALIDITY_MS must be a positive integer".to_string(),
                )
            })?;

        let siwe = SiweOptions::new(
            required("SIWE_DOMAIN")?,
            required("SIWE_STATEMENT")?,
            required("SIWE_VERSION")?,
            prevent_replay,
            message_validity_ms,
        )?;

        Ok(Config {
            environment,
            port,
            log_level,
            nonce_store,
            database_url,
            db_max_connections,
            nonce_store_timeout,
            nonce_cleanup_schedule,
            cors_allowed_origins,
            siwe,
        })
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        self.database_url.as_deref().map(mask_password)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!(
            "{} must be 'true' or 'false', got '{}'",
            key, other
        ))),
    }
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let prefix = &url[..colon_pos + 1];
            let suffix = &url[at_pos..];
            return format!("{}****{}", prefix, suffix);
        }
    }
    url.to_string()
}
