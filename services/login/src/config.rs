//! Centralized configuration for the login service core.
//!
//! All configuration is loaded from environment variables and validated
//! once at startup. The resulting [`Config`] is passed by reference to the
//! token authority, the store factory and the bootstrap sequencer.

use std::env;
use std::time::Duration;

use rust_common::{LogFormat, RetryConfig, TracingConfig};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::seed::{AdminAccount, SeedPlan};

/// Configuration errors. Always fatal, never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },

    /// Value parsed but is out of range or inconsistent
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Variable or field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Store connection descriptor with an unsupported scheme
    #[error("Unsupported store descriptor scheme: {0}")]
    UnsupportedStore(String),
}

/// Token signing and validation settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: SecretString,
    /// Issuer written to and required of every token
    pub issuer: String,
    /// Audience written to and required of every token
    pub audience: String,
    /// Token lifetime
    pub lifetime: Duration,
    /// Allowed clock skew when checking expiry
    pub clock_skew: Duration,
}

/// Where the identity store lives.
#[derive(Debug, Clone)]
pub enum StoreDescriptor {
    /// PostgreSQL connection URL
    Postgres(SecretString),
    /// Process-local store for development
    Memory,
}

impl StoreDescriptor {
    /// Parse a connection descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is empty or its scheme is unknown.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_URL".to_string()));
        }

        let scheme = raw.split_once("://").map_or("", |(scheme, _)| scheme);
        match scheme.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres(SecretString::from(raw.to_string()))),
            "memory" => Ok(Self::Memory),
            // Only the scheme is echoed; the rest may carry credentials.
            other => Err(ConfigError::UnsupportedStore(other.to_string())),
        }
    }

    /// Scheme name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Identity store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection descriptor
    pub descriptor: StoreDescriptor,
    /// Pool size
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

/// Startup sequence settings.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Attempts and fixed delay
    pub retry: RetryConfig,
    /// Baseline roles and administrator account
    pub seed: SeedPlan,
}

/// Login service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token settings
    pub jwt: JwtConfig,
    /// Identity store settings
    pub store: StoreConfig,
    /// Bootstrap settings
    pub bootstrap: BootstrapConfig,
    /// Logging settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?;

        let jwt = JwtConfig {
            secret: SecretString::from(secret),
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "login-svc".to_string()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "clients".to_string()),
            lifetime: Duration::from_secs(parse_var(&lookup, "JWT_LIFETIME_SECS", 900)?),
            clock_skew: Duration::from_secs(parse_var(&lookup, "JWT_CLOCK_SKEW_SECS", 0)?),
        };

        let descriptor = StoreDescriptor::parse(&lookup("DATABASE_URL").unwrap_or_default())?;
        let store = StoreConfig {
            descriptor,
            max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_var(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
        };

        let retry = RetryConfig::default()
            .with_max_attempts(parse_var(&lookup, "BOOTSTRAP_MAX_RETRIES", 5)?)
            .with_delay(Duration::from_secs(parse_var(
                &lookup,
                "BOOTSTRAP_RETRY_DELAY_SECS",
                5,
            )?));

        let roles = parse_list(&lookup("SEED_ROLES").unwrap_or_else(|| "Admin,User".to_string()));
        let admin = parse_admin(&lookup)?;

        let config = Self {
            jwt,
            store,
            bootstrap: BootstrapConfig {
                retry,
                seed: SeedPlan { roles, admin },
            },
            tracing: tracing_from_lookup(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.expose_secret().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "JWT_SECRET".to_string(),
                reason: "signing secret must not be empty".to_string(),
            });
        }
        if self.jwt.issuer.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_ISSUER".to_string()));
        }
        if self.jwt.audience.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_AUDIENCE".to_string()));
        }
        if self.jwt.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "JWT_LIFETIME_SECS".to_string(),
                reason: "lifetime must be greater than 0".to_string(),
            });
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS".to_string(),
                reason: "pool size must be greater than 0".to_string(),
            });
        }
        if self.bootstrap.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BOOTSTRAP_MAX_RETRIES".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if let Some(admin) = &self.bootstrap.seed.admin {
            if !admin.email.contains('@') {
                return Err(ConfigError::InvalidValue {
                    field: "ADMIN_EMAIL".to_string(),
                    reason: "not an email address".to_string(),
                });
            }
            if admin.role.trim().is_empty() {
                return Err(ConfigError::MissingRequired("ADMIN_ROLE".to_string()));
            }
        }
        Ok(())
    }
}

/// Read only the logging settings, so the host can install a subscriber
/// before the full configuration is validated.
#[must_use]
pub fn tracing_from_env() -> TracingConfig {
    dotenvy::dotenv().ok();
    tracing_from_lookup(&|name: &str| env::var(name).ok()).unwrap_or_default()
}

fn tracing_from_lookup<F>(lookup: &F) -> Result<TracingConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let format = match lookup("LOG_FORMAT") {
        Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::ParseError {
            name: "LOG_FORMAT".to_string(),
            reason: e.to_string(),
        })?,
        None => LogFormat::Text,
    };

    Ok(TracingConfig::default()
        .with_service_name("login-service")
        .with_log_level(lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()))
        .with_format(format))
}

/// Parse the administrator account. All of username, email and password,
/// or none of them.
fn parse_admin<F>(lookup: &F) -> Result<Option<AdminAccount>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let username = lookup("ADMIN_USERNAME").filter(|v| !v.trim().is_empty());
    let email = lookup("ADMIN_EMAIL").filter(|v| !v.trim().is_empty());
    let password = lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty());

    match (username, email, password) {
        (None, None, None) => Ok(None),
        (Some(username), Some(email), Some(password)) => Ok(Some(AdminAccount {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: SecretString::from(password),
            role: lookup("ADMIN_ROLE").unwrap_or_else(|| "Admin".to_string()),
        })),
        (username, email, _) => {
            let missing = if username.is_none() {
                "ADMIN_USERNAME"
            } else if email.is_none() {
                "ADMIN_EMAIL"
            } else {
                "ADMIN_PASSWORD"
            };
            Err(ConfigError::MissingRequired(missing.to_string()))
        }
    }
}

/// Parse a variable with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse a comma-separated list, dropping blanks and duplicates.
fn parse_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}
