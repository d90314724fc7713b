//! Issues and validates session tokens against the configured policy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tracing::{Span, debug};

use crate::config::{ConfigError, JwtConfig};
use crate::error::TokenError;
use crate::jwt::claims::ClaimSet;
use crate::jwt::codec::ClaimsCodec;
use crate::jwt::token::{ClaimRequirements, Token};
use crate::metrics;
use crate::store::Identity;

/// Authentication scheme accepted by [`TokenAuthority::authorize_bearer`].
const BEARER_SCHEME: &str = "Bearer";

/// Immutable issuance and validation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Issuer written into and required from tokens
    pub issuer: String,
    /// Audience written into and required from tokens
    pub audience: String,
    /// Token lifetime
    pub lifetime: Duration,
    /// Tolerance added to the expiry instant
    pub clock_skew: Duration,
}

impl TokenPolicy {
    fn requirements(&self) -> ClaimRequirements<'_> {
        ClaimRequirements {
            issuer: &self.issuer,
            audience: &self.audience,
            clock_skew: self.clock_skew,
        }
    }
}

/// Token issuer and validator.
///
/// Holds no mutable state; share it freely across tasks.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    codec: ClaimsCodec,
    policy: TokenPolicy,
    span: Span,
}

impl TokenAuthority {
    /// Build an authority from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is empty.
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        let secret = config.secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "JWT_SECRET".to_string(),
                reason: "signing secret must not be empty".to_string(),
            });
        }

        Ok(Self {
            codec: ClaimsCodec::from_secret(secret.as_bytes()),
            policy: TokenPolicy {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                lifetime: config.lifetime,
                clock_skew: config.clock_skew,
            },
            span: Span::none(),
        })
    }

    /// Scope this authority's events under `span`.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue a token for `subject` with `roles`, valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if signing fails.
    pub fn issue_token<I, R>(
        &self,
        subject: &str,
        roles: I,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let _guard = self.span.enter();
        let claims = ClaimSet::new(
            subject,
            roles,
            self.policy.issuer.as_str(),
            self.policy.audience.as_str(),
            now,
            self.policy.lifetime,
        );

        let token = self.codec.encode(&claims)?;
        metrics::record_token_issued();
        debug!(subject, roles = claims.roles.len(), exp = claims.exp, "Issued token");
        Ok(token)
    }

    /// Issue a token for a stored identity and its roles.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if signing fails.
    pub fn issue_for(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.issue_token(&identity.id, identity.roles.iter().cloned(), now)
    }

    /// Validate a compact token and return its claims.
    ///
    /// Checks run in order: structure, signature, issuer, audience, expiry.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate_token(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, TokenError> {
        let _guard = self.span.enter();
        let result = self
            .codec
            .decode(token)
            .and_then(|verified| verified.validate_claims(&self.policy.requirements(), now))
            .map(Token::into_claims);

        metrics::record_validation(result.as_ref().map(|_| ()));
        match &result {
            Ok(claims) => debug!(subject = %claims.sub, "Token accepted"),
            Err(err) => debug!(kind = err.code().label(), error = %err, "Token rejected"),
        }
        result
    }

    /// Validate the value of an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` unless the value is `Bearer <token>`, otherwise
    /// the result of [`Self::validate_token`].
    pub fn authorize_bearer(
        &self,
        header_value: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimSet, TokenError> {
        let token = header_value
            .trim()
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty());

        match token {
            Some(token) => self.validate_token(token, now),
            None => {
                let err = TokenError::malformed("expected a bearer token");
                metrics::record_validation(Err(&err));
                let _guard = self.span.enter();
                debug!(kind = err.code().label(), "Authorization header rejected");
                Err(err)
            }
        }
    }
}
