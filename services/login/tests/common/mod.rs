//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use login_service::seed::{AdminAccount, SeedPlan};
use login_service::store::{
    Identity, IdentityStore, InMemoryIdentityStore, MigrationReport, MigrationStatus, NewIdentity,
    Role, StoreError,
};
use secrecy::SecretString;

/// Fail forever.
pub const ALWAYS: u32 = u32::MAX;

/// In-memory store that fails a configured number of calls per operation.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryIdentityStore,
    ping_failures: AtomicU32,
    migrate_failures: AtomicU32,
    identity_failures: AtomicU32,
    pings: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_down() -> Self {
        Self::new().with_ping_failures(ALWAYS)
    }

    pub fn with_ping_failures(self, n: u32) -> Self {
        self.ping_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_migrate_failures(self, n: u32) -> Self {
        self.migrate_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_identity_failures(self, n: u32) -> Self {
        self.identity_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Connectivity probes received, failed or not.
    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryIdentityStore {
        &self.inner
    }
}

/// Consume one injected failure, if any are left.
fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
            0 => None,
            ALWAYS => Some(ALWAYS),
            n => Some(n - 1),
        })
        .is_ok()
}

#[async_trait]
impl IdentityStore for FlakyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if take(&self.ping_failures) {
            return Err(StoreError::unavailable("connection refused"));
        }
        self.inner.ping().await
    }

    async fn migrate(&self) -> Result<MigrationReport, StoreError> {
        if take(&self.migrate_failures) {
            return Err(StoreError::Migration {
                version: 1,
                reason: "lock timeout".to_string(),
            });
        }
        self.inner.migrate().await
    }

    async fn migration_status(&self) -> Result<MigrationStatus, StoreError> {
        self.inner.migration_status().await
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError> {
        self.inner.find_role(name).await
    }

    async fn create_role(&self, name: &str) -> Result<Role, StoreError> {
        self.inner.create_role(name).await
    }

    async fn find_identity(
        &self,
        username: &str,
        normalized_email: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.inner.find_identity(username, normalized_email).await
    }

    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        if take(&self.identity_failures) {
            return Err(StoreError::unavailable("connection reset"));
        }
        self.inner.create_identity(identity).await
    }
}

pub fn admin(password: &str) -> AdminAccount {
    AdminAccount {
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        password: SecretString::from(password),
        role: "Admin".to_string(),
    }
}

/// Roles `Admin` and `User` plus a compliant administrator.
pub fn standard_plan() -> SeedPlan {
    SeedPlan {
        roles: vec!["Admin".to_string(), "User".to_string()],
        admin: Some(admin("Adm1n!pass")),
    }
}
