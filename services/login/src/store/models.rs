//! Identity store records.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A role, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Role {
    /// Unique role name
    pub name: String,
}

impl Role {
    /// Create a role record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A stored identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque unique key
    pub id: String,
    /// Unique username
    pub username: String,
    /// Email as given
    pub email: String,
    /// Unique lookup form of the email
    pub normalized_email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Assigned role names
    pub roles: BTreeSet<String>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("normalized_email", &self.normalized_email)
            .field("password_hash", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Insert payload for an identity and its initial role assignments.
#[derive(Clone)]
pub struct NewIdentity {
    /// Unique username
    pub username: String,
    /// Email as given
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Roles assigned in the same write
    pub roles: BTreeSet<String>,
}

impl NewIdentity {
    /// Lookup form of the email.
    #[must_use]
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Normalize an email for uniqueness checks: trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Outcome of one `migrate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations applied by this call
    pub applied: usize,
    /// Schema version after the call
    pub version: u32,
}

/// Applied and pending migration counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Migrations recorded as applied
    pub applied: usize,
    /// Migrations not yet applied
    pub pending: usize,
}
