//! Readiness and health reporting.
//!
//! Readiness follows the bootstrap state machine; health additionally
//! probes the identity store and the schema version on demand.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;

use crate::bootstrap::BootstrapState;
use crate::store::IdentityStore;

/// Name of the store connectivity check.
pub const STORE_CHECK: &str = "identity-store";
/// Name of the schema version check.
pub const MIGRATIONS_CHECK: &str = "migrations";

/// Outcome of a check or of the whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Check passed
    Healthy,
    /// Check failed
    Unhealthy,
}

/// Point-in-time readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    /// Bootstrap state
    pub state: BootstrapState,
    /// Whether the service may receive traffic
    pub ready_for_traffic: bool,
}

impl From<BootstrapState> for Readiness {
    fn from(state: BootstrapState) -> Self {
        Self {
            state,
            ready_for_traffic: state == BootstrapState::Ready,
        }
    }
}

/// Read side of the bootstrap state channel.
#[derive(Debug, Clone)]
pub struct ReadinessHandle {
    rx: watch::Receiver<BootstrapState>,
}

impl ReadinessHandle {
    /// Wrap a state receiver.
    #[must_use]
    pub const fn new(rx: watch::Receiver<BootstrapState>) -> Self {
        Self { rx }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BootstrapState {
        *self.rx.borrow()
    }

    /// Current readiness.
    #[must_use]
    pub fn snapshot(&self) -> Readiness {
        Readiness::from(self.state())
    }

    /// Wait until the bootstrap is `Ready` or `Failed`.
    pub async fn wait_until_terminal(&mut self) -> BootstrapState {
        let waited = self.rx.wait_for(BootstrapState::is_terminal).await.map(|state| *state);
        waited.unwrap_or_else(|_| *self.rx.borrow())
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Check name
    pub name: &'static str,
    /// Outcome
    pub status: HealthStatus,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent
    pub duration_ms: u64,
}

/// Full health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `Healthy` only when every check passed and the bootstrap is ready
    pub status: HealthStatus,
    /// Bootstrap state
    pub state: BootstrapState,
    /// Whether the service may receive traffic
    pub ready_for_traffic: bool,
    /// Individual checks
    pub checks: Vec<CheckResult>,
    /// Time spent on all checks
    pub total_duration_ms: u64,
}

/// Runs the health checks.
#[derive(Clone)]
pub struct HealthChecker {
    store: Arc<dyn IdentityStore>,
    readiness: ReadinessHandle,
}

impl HealthChecker {
    /// Create a checker over `store`, reporting `readiness`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, readiness: ReadinessHandle) -> Self {
        Self { store, readiness }
    }

    /// Run every check and build a report.
    pub async fn report(&self) -> HealthReport {
        let started = Instant::now();
        let checks = vec![self.check_store().await, self.check_migrations().await];
        let readiness = self.readiness.snapshot();

        let status = if readiness.ready_for_traffic
            && checks.iter().all(|check| check.status == HealthStatus::Healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            state: readiness.state,
            ready_for_traffic: readiness.ready_for_traffic,
            checks,
            total_duration_ms: elapsed_ms(started),
        }
    }

    async fn check_store(&self) -> CheckResult {
        let started = Instant::now();
        let error = self.store.ping().await.err().map(|e| e.to_string());
        check_result(STORE_CHECK, error, started)
    }

    async fn check_migrations(&self) -> CheckResult {
        let started = Instant::now();
        let error = match self.store.migration_status().await {
            Ok(status) if status.pending == 0 => None,
            Ok(status) => Some(format!("{} migrations pending", status.pending)),
            Err(e) => Some(e.to_string()),
        };
        check_result(MIGRATIONS_CHECK, error, started)
    }
}

fn check_result(name: &'static str, error: Option<String>, started: Instant) -> CheckResult {
    CheckResult {
        name,
        status: if error.is_none() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        error,
        duration_ms: elapsed_ms(started),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
