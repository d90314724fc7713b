//! Error handling for the login service core.
//!
//! - Token validation failures carry their specific kind for logs and
//!   metrics, but map to one uniform "unauthorized" response.
//! - Bootstrap failures are classified as retryable or fatal through
//!   [`rust_common::Retryable`].

use rust_common::Retryable;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::password::{HashingError, PolicyViolation};
use crate::store::StoreError;

/// Token issuance and validation errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong structure, undecodable segment or unsupported algorithm
    #[error("Token malformed: {reason}")]
    Malformed {
        /// Description of the malformation
        reason: String,
    },

    /// MAC does not match the header and payload
    #[error("Token signature invalid")]
    BadSignature,

    /// Issued by someone else
    #[error("Token issuer not accepted: {found}")]
    WrongIssuer {
        /// Issuer found in the token
        found: String,
    },

    /// Intended for someone else
    #[error("Token audience not accepted: {found}")]
    WrongAudience {
        /// Audience found in the token
        found: String,
    },

    /// Past its expiry instant
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry as Unix seconds
        expired_at: i64,
    },

    /// Signing failed while issuing
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Create a malformed-token error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed { .. } => ErrorCode::TokenMalformed,
            Self::BadSignature => ErrorCode::TokenBadSignature,
            Self::WrongIssuer { .. } => ErrorCode::TokenWrongIssuer,
            Self::WrongAudience { .. } => ErrorCode::TokenWrongAudience,
            Self::Expired { .. } => ErrorCode::TokenExpired,
            Self::Encoding(_) => ErrorCode::Internal,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
                Self::malformed("unsupported algorithm")
            }
            ErrorKind::Base64(_) => Self::malformed("segment is not base64url"),
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => Self::malformed("segment is not valid JSON"),
            ErrorKind::InvalidToken => Self::malformed("expected three segments"),
            _ => Self::malformed("token could not be decoded"),
        }
    }
}

/// Error codes for logs and metrics. Never sent to the remote caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TokenMalformed,
    TokenBadSignature,
    TokenWrongIssuer,
    TokenWrongAudience,
    TokenExpired,
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TokenMalformed => "AUTH_TOKEN_MALFORMED",
            Self::TokenBadSignature => "AUTH_TOKEN_BAD_SIGNATURE",
            Self::TokenWrongIssuer => "AUTH_TOKEN_WRONG_ISSUER",
            Self::TokenWrongAudience => "AUTH_TOKEN_WRONG_AUDIENCE",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Metrics label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TokenMalformed => "malformed",
            Self::TokenBadSignature => "bad_signature",
            Self::TokenWrongIssuer => "wrong_issuer",
            Self::TokenWrongAudience => "wrong_audience",
            Self::TokenExpired => "expired",
            Self::Internal => "internal",
        }
    }

    /// HTTP status the transport layer should answer with
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Internal => 500,
            _ => 401,
        }
    }
}

/// Caller-facing rejection. The specific [`ErrorCode`] is kept for the
/// host's logs but is not serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for logs and metrics
    #[serde(skip)]
    pub code: ErrorCode,
    /// HTTP status
    #[serde(skip)]
    pub status: u16,
    /// Uniform message
    pub error: &'static str,
    /// Correlation ID for tracing
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Create a new error response from a token error.
    #[must_use]
    pub fn from_error(error: &TokenError, correlation_id: Uuid) -> Self {
        let code = error.code();
        let message = match code {
            ErrorCode::Internal => "internal error",
            _ => "unauthorized",
        };

        Self {
            code,
            status: code.http_status(),
            error: message,
            correlation_id,
        }
    }

    /// Uniform rejection with a fresh correlation ID.
    #[must_use]
    pub fn unauthorized(error: &TokenError) -> Self {
        Self::from_error(error, Uuid::new_v4())
    }
}

/// Seeding errors.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Administrator password fails the policy
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),

    /// Role or identity write failed for a reason other than "already exists"
    #[error("Identity store write failed: {0}")]
    Store(#[from] StoreError),

    /// Hashing the administrator password failed
    #[error(transparent)]
    Hashing(#[from] HashingError),
}

impl Retryable for SeedError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Bootstrap failures, as seen at the sequencer boundary.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Store unreachable
    #[error("Identity store unreachable: {0}")]
    Connectivity(#[source] StoreError),

    /// Schema migration failed
    #[error("Schema migration failed: {0}")]
    Migration(#[source] StoreError),

    /// Role or administrator creation failed
    #[error("Seeding failed: {0}")]
    Seeding(#[source] SeedError),

    /// Administrator password fails the policy
    #[error(transparent)]
    PolicyViolation(PolicyViolation),

    /// Retry budget spent
    #[error("Bootstrap failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Failure of the final attempt
        #[source]
        last: Box<BootstrapError>,
    },

    /// Host aborted the run
    #[error("Bootstrap aborted")]
    Aborted,
}

impl BootstrapError {
    /// Phase label for logs and metrics.
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Connectivity(_) => "connecting",
            Self::Migration(_) => "migrating",
            Self::Seeding(_) | Self::PolicyViolation(_) => "seeding",
            Self::Exhausted { last, .. } => last.phase(),
            Self::Aborted => "aborted",
        }
    }
}

impl From<SeedError> for BootstrapError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::PolicyViolation(violation) => Self::PolicyViolation(violation),
            other => Self::Seeding(other),
        }
    }
}

impl Retryable for BootstrapError {
    fn is_retryable(&self) -> bool {
        match self {
            // Migration failures share the connectivity retry class.
            Self::Connectivity(_) | Self::Migration(_) => true,
            Self::Seeding(err) => err.is_retryable(),
            Self::PolicyViolation(_) | Self::Exhausted { .. } | Self::Aborted => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordRule;

    #[test]
    fn test_token_error_codes() {
        assert_eq!(TokenError::BadSignature.code(), ErrorCode::TokenBadSignature);
        assert_eq!(TokenError::Expired { expired_at: 0 }.code(), ErrorCode::TokenExpired);
        assert_eq!(TokenError::malformed("x").code().as_str(), "AUTH_TOKEN_MALFORMED");
    }

    #[test]
    fn test_response_is_uniform() {
        let errors = [
            TokenError::malformed("bad header"),
            TokenError::BadSignature,
            TokenError::WrongIssuer { found: "evil".to_string() },
            TokenError::WrongAudience { found: "other".to_string() },
            TokenError::Expired { expired_at: 10 },
        ];

        for error in &errors {
            let response = ErrorResponse::from_error(error, Uuid::new_v4());
            assert_eq!(response.status, 401);
            assert_eq!(response.error, "unauthorized");

            let body = serde_json::to_string(&response).unwrap();
            assert!(!body.contains("AUTH_TOKEN"));
            assert!(!body.contains("evil"));
        }
    }

    #[test]
    fn test_encoding_failure_is_internal() {
        let response = ErrorResponse::from_error(&TokenError::Encoding("boom".to_string()), Uuid::nil());
        assert_eq!(response.status, 500);
        assert_eq!(response.error, "internal error");
    }

    #[test]
    fn test_bootstrap_retryability() {
        assert!(BootstrapError::Connectivity(StoreError::unavailable("down")).is_retryable());
        assert!(BootstrapError::Migration(StoreError::unavailable("down")).is_retryable());
        assert!(BootstrapError::Seeding(SeedError::Store(StoreError::Query("x".to_string()))).is_retryable());
        assert!(!BootstrapError::Aborted.is_retryable());
    }

    #[test]
    fn test_policy_violation_is_fatal() {
        let violation = PolicyViolation {
            unmet: vec![PasswordRule::Digit],
        };
        let err = BootstrapError::from(SeedError::PolicyViolation(violation));

        assert!(matches!(err, BootstrapError::PolicyViolation(_)));
        assert!(!err.is_retryable());
        assert_eq!(err.phase(), "seeding");
    }
}
