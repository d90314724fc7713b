//! Forward-only schema migrations.
//!
//! Versions are strictly increasing and never edited once released; a new
//! schema change is a new entry at the end of [`MIGRATIONS`].

use std::collections::BTreeSet;

/// One schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Ordering key, recorded in `schema_migrations`
    pub version: u32,
    /// Short name for logs
    pub name: &'static str,
    /// DDL to run
    pub sql: &'static str,
}

/// Bookkeeping table, created before any migration runs.
pub const MIGRATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_roles",
        sql: r"
            CREATE TABLE IF NOT EXISTS roles (
                name TEXT PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
    },
    Migration {
        version: 2,
        name: "create_identities",
        sql: r"
            CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                normalized_email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT identities_username_key UNIQUE (username),
                CONSTRAINT identities_normalized_email_key UNIQUE (normalized_email)
            )",
    },
    Migration {
        version: 3,
        name: "create_identity_roles",
        sql: r"
            CREATE TABLE IF NOT EXISTS identity_roles (
                identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
                role_name TEXT NOT NULL REFERENCES roles(name),
                PRIMARY KEY (identity_id, role_name)
            )",
    },
];

/// Migrations not in `applied`, in version order.
pub fn pending(applied: &BTreeSet<u32>) -> impl Iterator<Item = &'static Migration> + '_ {
    MIGRATIONS
        .iter()
        .filter(move |migration| !applied.contains(&migration.version))
}

/// Highest known version.
#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}
