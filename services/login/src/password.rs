//! Password policy and one-way credential hashing.
//!
//! Credentials are stored as Argon2id PHC strings with a random salt.

use std::fmt;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use thiserror::Error;

/// Minimum number of characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One rule of the password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    /// At least [`MIN_PASSWORD_LENGTH`] characters
    MinLength,
    /// At least one ASCII digit
    Digit,
    /// At least one uppercase letter
    Uppercase,
    /// At least one character that is neither letter nor digit
    NonAlphanumeric,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength => write!(f, "at least {MIN_PASSWORD_LENGTH} characters"),
            Self::Digit => f.write_str("a digit"),
            Self::Uppercase => f.write_str("an uppercase letter"),
            Self::NonAlphanumeric => f.write_str("a non-alphanumeric character"),
        }
    }
}

/// The configured administrator password fails the policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Password does not satisfy policy, requires {}", join_rules(.unmet))]
pub struct PolicyViolation {
    /// Every rule the password misses
    pub unmet: Vec<PasswordRule>,
}

fn join_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Hashing failed.
#[derive(Error, Debug)]
#[error("Password hashing failed: {0}")]
pub struct HashingError(String);

/// Check a secret against the policy.
///
/// # Errors
///
/// Returns every unmet rule at once.
pub fn check_policy(secret: &str) -> Result<(), PolicyViolation> {
    let mut unmet = Vec::new();

    if secret.chars().count() < MIN_PASSWORD_LENGTH {
        unmet.push(PasswordRule::MinLength);
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        unmet.push(PasswordRule::Digit);
    }
    if !secret.chars().any(char::is_uppercase) {
        unmet.push(PasswordRule::Uppercase);
    }
    if !secret.chars().any(|c| !c.is_alphanumeric()) {
        unmet.push(PasswordRule::NonAlphanumeric);
    }

    if unmet.is_empty() {
        Ok(())
    } else {
        Err(PolicyViolation { unmet })
    }
}

/// Hash a secret with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns an error if the hasher rejects its input.
pub fn hash_password(secret: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashingError(e.to_string()))
}

/// Verify a secret against a stored PHC string.
#[must_use]
pub fn verify_password(phc: &str, secret: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}
