//! Login service core.
//!
//! Issues and validates HS256 session tokens, keeps identities and roles
//! in a relational store, and brings the service up through a bounded-retry
//! bootstrap (connect, migrate, seed) that reports readiness.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod health;
pub mod jwt;
pub mod metrics;
pub mod password;
pub mod seed;
pub mod shutdown;
pub mod store;

// Re-exports for convenience
pub use bootstrap::{BootstrapReport, BootstrapSequencer, BootstrapState};
pub use config::{Config, ConfigError};
pub use error::{BootstrapError, ErrorCode, ErrorResponse, SeedError, TokenError};
pub use health::{HealthChecker, HealthReport, HealthStatus, Readiness, ReadinessHandle};
pub use jwt::{ClaimSet, ClaimsCodec, TokenAuthority};
pub use seed::{AdminAccount, SeedPlan, SeedReport, Seeder};
pub use store::{IdentityStore, StoreError};
