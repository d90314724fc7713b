//! Identity store: users, roles and role assignments.
//!
//! The core only talks to the store through [`IdentityStore`]. Uniqueness of
//! usernames, normalized emails and role names is enforced by the store and
//! surfaces as [`StoreError::Conflict`].

pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use rust_common::Retryable;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{ConfigError, StoreConfig, StoreDescriptor};

pub use memory::InMemoryIdentityStore;
pub use models::{Identity, MigrationReport, MigrationStatus, NewIdentity, Role, normalize_email};
pub use postgres::PostgresIdentityStore;

/// Identity store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store unreachable or connection lost
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    /// Uniqueness constraint violated
    #[error("{entity} already exists: {key}")]
    Conflict {
        /// Kind of record
        entity: &'static str,
        /// Conflicting key
        key: String,
    },

    /// A migration failed
    #[error("Migration {version} failed: {reason}")]
    Migration {
        /// Version that failed
        version: u32,
        /// Store message
        reason: String,
    },

    /// Any other failed statement
    #[error("Identity store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            key: key.into(),
        }
    }

    /// Check if this is a uniqueness violation.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        !self.is_conflict()
    }
}

/// Narrow interface to the relational identity store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Connectivity probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Apply all pending migrations. A no-op when none are pending.
    async fn migrate(&self) -> Result<MigrationReport, StoreError>;

    /// Count applied and pending migrations.
    async fn migration_status(&self) -> Result<MigrationStatus, StoreError>;

    /// Look up a role by name.
    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// Create a role; `Conflict` if it already exists.
    async fn create_role(&self, name: &str) -> Result<Role, StoreError>;

    /// Look up an identity by username or normalized email.
    async fn find_identity(
        &self,
        username: &str,
        normalized_email: &str,
    ) -> Result<Option<Identity>, StoreError>;

    /// Create an identity and its role assignments in one atomic write;
    /// `Conflict` if the username or email is taken.
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError>;
}

/// Open the store named by the configuration.
///
/// No connection is made here; the first `ping` does that.
///
/// # Errors
///
/// Returns an error if the connection descriptor cannot be parsed.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn IdentityStore>, ConfigError> {
    match &config.descriptor {
        StoreDescriptor::Postgres(url) => {
            let store = PostgresIdentityStore::connect_lazy(
                url.expose_secret(),
                config.max_connections,
                config.acquire_timeout,
            )
            .map_err(|_| ConfigError::InvalidValue {
                field: "DATABASE_URL".to_string(),
                reason: "invalid PostgreSQL connection descriptor".to_string(),
            })?;
            Ok(Arc::new(store))
        }
        StoreDescriptor::Memory => Ok(Arc::new(InMemoryIdentityStore::new())),
    }
}
