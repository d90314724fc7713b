//! Shared library for cross-cutting concerns in login-service Rust crates.
//!
//! This crate provides centralized implementations for:
//! - Retryability classification of error types
//! - Fixed-delay retry budgets for startup sequences
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod retry;
pub mod tracing_config;

pub use error::{FailureClass, Retryable};
pub use retry::{RetryBudget, RetryConfig, RetryDecision, RetryPolicy};
pub use tracing_config::{LogFormat, TracingConfig, TracingError, init_tracing};
