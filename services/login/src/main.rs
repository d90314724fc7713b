//! Login Service - Main Entry Point
//!
//! Loads configuration, runs the bootstrap and stays up until signalled.
//! Exit status 2 means bad configuration, 1 means the bootstrap failed.

use std::process::ExitCode;

use anyhow::Context;
use rust_common::{RetryPolicy, init_tracing};
use tracing::{error, info, info_span};

use login_service::config::{self, Config};
use login_service::shutdown::wait_for_signal;
use login_service::{BootstrapSequencer, HealthChecker, TokenAuthority, store};

const EXIT_BOOTSTRAP_FAILED: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let tracing_config = config::tracing_from_env();
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("failed to initialise tracing: {e}");
    }

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Invalid configuration");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = Config::from_env().context("loading configuration")?;
    info!(
        store = config.store.descriptor.kind(),
        issuer = %config.jwt.issuer,
        audience = %config.jwt.audience,
        "Starting Login Service"
    );

    let authority = TokenAuthority::new(&config.jwt)
        .context("building token authority")?
        .with_span(info_span!("token_authority"));
    let store = store::open(&config.store).context("opening identity store")?;

    let sequencer = BootstrapSequencer::new(
        store.clone(),
        RetryPolicy::new(config.bootstrap.retry),
        config.bootstrap.seed.clone(),
    )
    .with_span(info_span!("bootstrap"));
    let health = HealthChecker::new(store, sequencer.readiness());

    if let Err(e) = sequencer.run_until(wait_for_signal()).await {
        error!(error = %e, phase = e.phase(), "Login Service not started");
        return Ok(ExitCode::from(EXIT_BOOTSTRAP_FAILED));
    }

    let report = health.report().await;
    info!(
        status = ?report.status,
        ready_for_traffic = report.ready_for_traffic,
        issuer = %authority.policy().issuer,
        "Login Service ready"
    );

    wait_for_signal().await;
    info!("Login Service stopped");
    Ok(ExitCode::SUCCESS)
}
