//! Process-local identity store.
//!
//! Enforces the same uniqueness rules as the relational schema and counts
//! successful writes, so seeding idempotence can be observed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::migrations::{self, MIGRATIONS};
use super::{
    Identity, IdentityStore, MigrationReport, MigrationStatus, NewIdentity, Role, StoreError,
};

#[derive(Debug, Default)]
struct State {
    roles: BTreeMap<String, Role>,
    identities: BTreeMap<String, Identity>,
    applied_migrations: BTreeSet<u32>,
}

/// In-memory [`IdentityStore`].
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    state: RwLock<State>,
    writes: AtomicU64,
}

impl InMemoryIdentityStore {
    /// Create an empty store with no migrations applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes (migrations, roles, identities).
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored roles.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.state.read().roles.len()
    }

    /// Number of stored identities.
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.state.read().identities.len()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn migrate(&self) -> Result<MigrationReport, StoreError> {
        let mut state = self.state.write();
        let pending: Vec<u32> = migrations::pending(&state.applied_migrations)
            .map(|migration| migration.version)
            .collect();

        for version in &pending {
            state.applied_migrations.insert(*version);
            self.record_write();
        }

        Ok(MigrationReport {
            applied: pending.len(),
            version: state.applied_migrations.last().copied().unwrap_or(0),
        })
    }

    async fn migration_status(&self) -> Result<MigrationStatus, StoreError> {
        let state = self.state.read();
        let applied = state.applied_migrations.len();
        Ok(MigrationStatus {
            applied,
            pending: MIGRATIONS.len().saturating_sub(applied),
        })
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.state.read().roles.get(name).cloned())
    }

    async fn create_role(&self, name: &str) -> Result<Role, StoreError> {
        let mut state = self.state.write();
        if state.roles.contains_key(name) {
            return Err(StoreError::conflict("role", name));
        }

        let role = Role::new(name);
        state.roles.insert(name.to_string(), role.clone());
        self.record_write();
        Ok(role)
    }

    async fn find_identity(
        &self,
        username: &str,
        normalized_email: &str,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .state
            .read()
            .identities
            .values()
            .find(|identity| {
                identity.username == username || identity.normalized_email == normalized_email
            })
            .cloned())
    }

    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let normalized_email = identity.normalized_email();
        let mut state = self.state.write();

        if state.identities.values().any(|existing| existing.username == identity.username) {
            return Err(StoreError::conflict("identity", identity.username));
        }
        if state
            .identities
            .values()
            .any(|existing| existing.normalized_email == normalized_email)
        {
            return Err(StoreError::conflict("identity", normalized_email));
        }
        if let Some(missing) = identity.roles.iter().find(|role| !state.roles.contains_key(*role)) {
            return Err(StoreError::Query(format!("role {missing} does not exist")));
        }

        let stored = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            username: identity.username,
            email: identity.email,
            normalized_email,
            password_hash: identity.password_hash,
            roles: identity.roles,
            created_at: Utc::now(),
        };
        state.identities.insert(stored.id.clone(), stored.clone());
        self.record_write();
        Ok(stored)
    }
}
