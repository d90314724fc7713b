//! Prometheus metrics for the login service.
//!
//! Registered lazily in the default registry; the host exposes them.

use once_cell::sync::Lazy;
use prometheus::{
    IntCounter, IntCounterVec, IntGauge, register_int_counter, register_int_counter_vec,
    register_int_gauge,
};

use crate::bootstrap::BootstrapState;
use crate::error::TokenError;

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("login_tokens_issued_total", "Total number of tokens issued")
        .expect("Failed to register tokens_issued metric")
});

/// Token validations counter, by outcome.
pub static TOKEN_VALIDATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "login_token_validations_total",
        "Total number of token validations",
        &["outcome"]
    )
    .expect("Failed to register token_validations metric")
});

/// Bootstrap attempts counter, by phase reached and outcome.
pub static BOOTSTRAP_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "login_bootstrap_attempts_total",
        "Total number of bootstrap attempts",
        &["phase", "outcome"]
    )
    .expect("Failed to register bootstrap_attempts metric")
});

/// Current bootstrap state as its ordinal.
pub static BOOTSTRAP_STATE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "login_bootstrap_state",
        "Bootstrap state (0 disconnected .. 4 ready, 5 failed)"
    )
    .expect("Failed to register bootstrap_state metric")
});

/// Record a token issuance.
pub fn record_token_issued() {
    TOKENS_ISSUED.inc();
}

/// Record a validation outcome.
pub fn record_validation(result: Result<(), &TokenError>) {
    let outcome = match result {
        Ok(()) => "valid",
        Err(err) => err.code().label(),
    };
    TOKEN_VALIDATIONS.with_label_values(&[outcome]).inc();
}

/// Record a finished bootstrap attempt.
pub fn record_bootstrap_attempt(phase: &str, outcome: &str) {
    BOOTSTRAP_ATTEMPTS.with_label_values(&[phase, outcome]).inc();
}

/// Record a bootstrap state transition.
pub fn record_bootstrap_state(state: BootstrapState) {
    BOOTSTRAP_STATE.set(state.ordinal());
}
