//! Retryability classification shared by the workspace's error types.
//!
//! Errors are classified as either transient or permanent, which lets a
//! [`RetryBudget`](crate::RetryBudget) decide whether a failure consumes an
//! attempt or ends the operation immediately.

/// An error that knows whether retrying the failed operation can help.
pub trait Retryable {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry,
    /// such as an unreachable database or a failed write.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::Retryable;
    ///
    /// struct Unreachable;
    ///
    /// impl Retryable for Unreachable {
    ///     fn is_retryable(&self) -> bool {
    ///         true
    ///     }
    /// }
    ///
    /// assert!(Unreachable.is_retryable());
    /// ```
    fn is_retryable(&self) -> bool;
}

/// Coarse failure class, used as a log field and metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// May succeed on retry
    Transient,
    /// Retrying will not change the outcome
    Permanent,
}

impl FailureClass {
    /// Classify an error.
    #[must_use]
    pub fn of<E: Retryable + ?Sized>(error: &E) -> Self {
        if error.is_retryable() {
            Self::Transient
        } else {
            Self::Permanent
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}
