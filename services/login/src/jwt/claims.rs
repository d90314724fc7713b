//! Claim set carried inside a session token.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims issued by the login service.
///
/// Instants are whole Unix seconds; sub-second precision of the issuing
/// clock is truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject identifier
    pub sub: String,
    /// Granted role names; absent in the payload means none
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

impl ClaimSet {
    /// Build a claim set issued at `issued_at` and valid for `lifetime`.
    pub fn new<I, R>(
        subject: impl Into<String>,
        roles: I,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let iat = issued_at.timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: subject.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            iss: issuer.into(),
            aud: audience.into(),
            iat,
            exp: iat.saturating_add(lifetime),
        }
    }

    /// Check whether a role was granted.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Check whether the token is expired at `now`, allowing `skew`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = i64::try_from(skew.as_secs()).unwrap_or(i64::MAX);
        now.timestamp() >= self.exp.saturating_add(skew)
    }

    /// Expiry as a timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Issue instant as a timestamp, if representable.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}
