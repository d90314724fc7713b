//! Startup sequencing: connectivity probe, schema migration, seeding.
//!
//! ```text
//! Disconnected -> Connecting -> Migrating -> Seeding -> Ready
//!       ^              |            |           |
//!       +---- retry ---+------------+-----------+----> Failed
//! ```
//!
//! Retryable failures in any phase draw from one shared budget and restart
//! from `Connecting` after the fixed delay. Non-retryable failures end the
//! run at once.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_common::{RetryDecision, RetryPolicy};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::error::BootstrapError;
use crate::health::ReadinessHandle;
use crate::metrics;
use crate::seed::{SeedPlan, SeedReport, Seeder};
use crate::store::{IdentityStore, MigrationReport};

/// Bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootstrapState {
    /// Not yet started, or waiting to retry
    Disconnected,
    /// Probing the store
    Connecting,
    /// Applying migrations
    Migrating,
    /// Ensuring roles and the administrator
    Seeding,
    /// Ready for traffic
    Ready,
    /// Gave up
    Failed,
}

impl BootstrapState {
    /// Get the string representation of the state
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Migrating => "migrating",
            Self::Seeding => "seeding",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Gauge value
    #[must_use]
    pub const fn ordinal(&self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Migrating => 2,
            Self::Seeding => 3,
            Self::Ready => 4,
            Self::Failed => 5,
        }
    }

    /// `Ready` and `Failed` are final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Migrations applied by the successful attempt
    pub migrations: MigrationReport,
    /// Records created by the successful attempt
    pub seed: SeedReport,
    /// Wall time from start to `Ready`
    pub elapsed: Duration,
}

/// Drives one bootstrap run.
pub struct BootstrapSequencer {
    store: Arc<dyn IdentityStore>,
    seeder: Seeder,
    policy: RetryPolicy,
    plan: SeedPlan,
    state_tx: watch::Sender<BootstrapState>,
    span: Span,
}

impl BootstrapSequencer {
    /// Create a sequencer in `Disconnected`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, policy: RetryPolicy, plan: SeedPlan) -> Self {
        let (state_tx, _) = watch::channel(BootstrapState::Disconnected);
        Self {
            seeder: Seeder::new(Arc::clone(&store)),
            store,
            policy,
            plan,
            state_tx,
            span: Span::none(),
        }
    }

    /// Scope this sequencer's events under `span`.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Handle that observes state transitions, before, during and after the run.
    #[must_use]
    pub fn readiness(&self) -> ReadinessHandle {
        ReadinessHandle::new(self.state_tx.subscribe())
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BootstrapState {
        *self.state_tx.borrow()
    }

    /// Run to `Ready` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` when the budget is spent, or the non-retryable
    /// failure that ended the run.
    pub async fn run(self) -> Result<BootstrapReport, BootstrapError> {
        let span = self.span.clone();
        self.drive().instrument(span).await
    }

    /// Run until finished or until `abort` resolves, whichever comes first.
    ///
    /// # Errors
    ///
    /// As [`Self::run`], plus `Aborted` when `abort` wins.
    pub async fn run_until<F>(self, abort: F) -> Result<BootstrapReport, BootstrapError>
    where
        F: Future<Output = ()>,
    {
        let span = self.span.clone();
        async {
            tokio::select! {
                biased;
                () = abort => {
                    let err = BootstrapError::Aborted;
                    self.fail(&err);
                    Err(err)
                }
                result = self.drive() => result,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self) -> Result<BootstrapReport, BootstrapError> {
        let started = Instant::now();
        let mut budget = self.policy.budget();
        info!(
            max_attempts = self.policy.max_attempts(),
            delay_secs = self.policy.delay().as_secs(),
            "Starting bootstrap"
        );

        loop {
            match self.attempt().await {
                Ok((migrations, seed)) => {
                    let attempts = budget.attempts_made() + 1;
                    metrics::record_bootstrap_attempt(BootstrapState::Seeding.as_str(), "success");
                    self.transition(BootstrapState::Ready);
                    let elapsed = started.elapsed();
                    info!(
                        attempts,
                        migrations_applied = migrations.applied,
                        schema_version = migrations.version,
                        roles_created = seed.roles_created,
                        identities_created = seed.identities_created,
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "Bootstrap complete, ready for traffic"
                    );
                    return Ok(BootstrapReport {
                        attempts,
                        migrations,
                        seed,
                        elapsed,
                    });
                }
                Err(err) => {
                    metrics::record_bootstrap_attempt(err.phase(), "failure");
                    match budget.record_failure(&err) {
                        RetryDecision::RetryAfter(delay) => {
                            warn!(
                                phase = err.phase(),
                                attempt = budget.attempts_made(),
                                remaining = budget.attempts_remaining(),
                                delay_secs = delay.as_secs(),
                                error = %err,
                                "Bootstrap attempt failed, retrying"
                            );
                            self.transition(BootstrapState::Disconnected);
                            budget.wait().await;
                        }
                        RetryDecision::Exhausted => {
                            let err = BootstrapError::Exhausted {
                                attempts: budget.attempts_made(),
                                last: Box::new(err),
                            };
                            self.fail(&err);
                            return Err(err);
                        }
                        RetryDecision::Fatal => {
                            self.fail(&err);
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    async fn attempt(&self) -> Result<(MigrationReport, SeedReport), BootstrapError> {
        self.transition(BootstrapState::Connecting);
        self.store.ping().await.map_err(BootstrapError::Connectivity)?;

        self.transition(BootstrapState::Migrating);
        let migrations = self.store.migrate().await.map_err(BootstrapError::Migration)?;

        self.transition(BootstrapState::Seeding);
        let seed = self.seeder.seed(&self.plan).await?;

        Ok((migrations, seed))
    }

    fn transition(&self, next: BootstrapState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            metrics::record_bootstrap_state(next);
            debug!(from = %previous, to = %next, "Bootstrap state changed");
        }
    }

    fn fail(&self, err: &BootstrapError) {
        self.transition(BootstrapState::Failed);
        metrics::record_bootstrap_attempt(err.phase(), "fatal");
        error!(phase = err.phase(), error = %err, "Bootstrap failed");
    }
}

impl fmt::Debug for BootstrapSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapSequencer")
            .field("state", &self.state())
            .field("max_attempts", &self.policy.max_attempts())
            .field("delay", &self.policy.delay())
            .finish_non_exhaustive()
    }
}
