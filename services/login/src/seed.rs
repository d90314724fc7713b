//! Idempotent seeding of baseline roles and the administrator account.
//!
//! Every step is read-or-create. A uniqueness conflict on create means a
//! concurrent process won the race and counts as "already exists", so a
//! seed can be rerun after any partial failure and converges.

use std::collections::BTreeSet;
use std::ops::AddAssign;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::SeedError;
use crate::password::{check_policy, hash_password};
use crate::store::{IdentityStore, NewIdentity, StoreError, normalize_email};

/// Administrator account to ensure at startup.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext secret; hashed before it reaches the store
    pub password: SecretString,
    /// Role granted to the account
    pub role: String,
}

/// What to seed.
#[derive(Debug, Clone, Default)]
pub struct SeedPlan {
    /// Baseline role names
    pub roles: Vec<String>,
    /// Optional administrator account
    pub admin: Option<AdminAccount>,
}

/// Records created by one seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Roles created
    pub roles_created: usize,
    /// Identities created
    pub identities_created: usize,
}

impl SeedReport {
    /// Total records written.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.roles_created + self.identities_created
    }
}

impl AddAssign for SeedReport {
    fn add_assign(&mut self, other: Self) {
        self.roles_created += other.roles_created;
        self.identities_created += other.identities_created;
    }
}

/// Ensures roles and the administrator exist.
#[derive(Clone)]
pub struct Seeder {
    store: Arc<dyn IdentityStore>,
}

impl Seeder {
    /// Create a seeder over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Read-or-create each named role. Blank names are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a read or write fails for a reason other than a
    /// uniqueness conflict.
    pub async fn ensure_roles<I, S>(&self, names: I) -> Result<SeedReport, SeedError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = SeedReport::default();
        let mut seen = BTreeSet::new();

        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || !seen.insert(name.to_string()) {
                continue;
            }
            if self.ensure_role(name).await? {
                report.roles_created += 1;
            }
        }
        Ok(report)
    }

    /// Ensure the administrator account exists.
    ///
    /// The password policy is checked before the store is touched. An
    /// existing identity with the same username or email is left as is.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` for a weak password, `Hashing` if hashing
    /// fails and `Store` for store failures other than conflicts.
    pub async fn ensure_administrator(&self, admin: &AdminAccount) -> Result<SeedReport, SeedError> {
        check_policy(admin.password.expose_secret())?;

        let mut report = SeedReport::default();
        let normalized_email = normalize_email(&admin.email);
        if let Some(existing) = self.store.find_identity(&admin.username, &normalized_email).await? {
            debug!(username = %existing.username, "Administrator already present");
            return Ok(report);
        }

        let role = admin.role.trim();
        if self.ensure_role(role).await? {
            report.roles_created += 1;
        }

        let password_hash = hash_password(admin.password.expose_secret())?;
        let identity = NewIdentity {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            roles: BTreeSet::from([role.to_string()]),
        };

        match self.store.create_identity(identity).await {
            Ok(created) => {
                info!(username = %created.username, role, "Created administrator");
                report.identities_created += 1;
            }
            Err(StoreError::Conflict { .. }) => {
                debug!(username = %admin.username, "Administrator created concurrently");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(report)
    }

    /// Run a full seeding pass: roles, then the administrator if configured.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` before any write for a weak administrator
    /// password. Otherwise returns the first failure; earlier writes stay
    /// in place.
    pub async fn seed(&self, plan: &SeedPlan) -> Result<SeedReport, SeedError> {
        if let Some(admin) = &plan.admin {
            check_policy(admin.password.expose_secret())?;
        }

        let mut report = self.ensure_roles(&plan.roles).await?;
        if let Some(admin) = &plan.admin {
            report += self.ensure_administrator(admin).await?;
        }

        info!(
            roles_created = report.roles_created,
            identities_created = report.identities_created,
            "Seeding complete"
        );
        Ok(report)
    }

    /// Returns whether the role was created by this call.
    async fn ensure_role(&self, name: &str) -> Result<bool, SeedError> {
        if self.store.find_role(name).await?.is_some() {
            return Ok(false);
        }

        match self.store.create_role(name).await {
            Ok(_) => {
                info!(role = name, "Created role");
                Ok(true)
            }
            Err(StoreError::Conflict { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
