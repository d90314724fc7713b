//! Type-state session token.
//!
//! Claims are only reachable on a [`Token<Validated>`], so a caller cannot
//! read roles from a token whose signature or claims were never checked.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};

use crate::error::TokenError;
use crate::jwt::claims::ClaimSet;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token validation states
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Parsed structurally, nothing verified
#[derive(Debug)]
pub struct Unverified;
impl private::Sealed for Unverified {}
impl TokenState for Unverified {
    fn state_name() -> &'static str {
        "Unverified"
    }
}

/// MAC verified, claims not yet checked
#[derive(Debug)]
pub struct SignatureVerified {
    claims: ClaimSet,
}
impl private::Sealed for SignatureVerified {}
impl TokenState for SignatureVerified {
    fn state_name() -> &'static str {
        "SignatureVerified"
    }
}

/// Signature and claims verified
#[derive(Debug)]
pub struct Validated {
    claims: ClaimSet,
}
impl private::Sealed for Validated {}
impl TokenState for Validated {
    fn state_name() -> &'static str {
        "Validated"
    }
}

/// Issuer, audience and clock tolerance a token is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequirements<'a> {
    /// Accepted issuer
    pub issuer: &'a str,
    /// Accepted audience
    pub audience: &'a str,
    /// Tolerance added to the expiry instant
    pub clock_skew: Duration,
}

/// Type-state token wrapper.
#[derive(Debug)]
pub struct Token<State: TokenState> {
    raw: String,
    header: Header,
    state: State,
}

impl Token<Unverified> {
    /// Parse the structure of a compact token.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` unless the token has three segments, a decodable
    /// header, algorithm HS256 and type `JWT` (or none).
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        if raw.split('.').count() != 3 {
            return Err(TokenError::malformed("expected three segments"));
        }

        let header = decode_header(raw)?;
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::malformed(format!("unsupported algorithm {:?}", header.alg)));
        }
        if let Some(typ) = header.typ.as_deref() {
            if !typ.eq_ignore_ascii_case("JWT") {
                return Err(TokenError::malformed(format!("unsupported type {typ}")));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            header,
            state: Unverified,
        })
    }

    /// Verify the MAC and decode the payload.
    ///
    /// # Errors
    ///
    /// Returns `BadSignature` if the MAC does not match, `Malformed` if the
    /// payload is not a claim set.
    pub fn verify_signature(self, key: &DecodingKey) -> Result<Token<SignatureVerified>, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ClaimSet>(&self.raw, key, &validation)?;

        Ok(Token {
            raw: self.raw,
            header: self.header,
            state: SignatureVerified {
                claims: data.claims,
            },
        })
    }
}

impl Token<SignatureVerified> {
    /// Check issuer, audience and expiry, in that order.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate_claims(
        self,
        requirements: &ClaimRequirements<'_>,
        now: DateTime<Utc>,
    ) -> Result<Token<Validated>, TokenError> {
        let claims = self.state.claims;

        if claims.iss != requirements.issuer {
            return Err(TokenError::WrongIssuer { found: claims.iss });
        }
        if claims.aud != requirements.audience {
            return Err(TokenError::WrongAudience { found: claims.aud });
        }
        if claims.is_expired_at(now, requirements.clock_skew) {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
            });
        }

        Ok(Token {
            raw: self.raw,
            header: self.header,
            state: Validated { claims },
        })
    }

    /// Claims whose signature holds but which are not yet checked.
    #[must_use]
    pub const fn peek_claims(&self) -> &ClaimSet {
        &self.state.claims
    }
}

impl Token<Validated> {
    /// Access claims - only available on fully validated tokens
    #[must_use]
    pub const fn claims(&self) -> &ClaimSet {
        &self.state.claims
    }

    /// Consume the token, keeping the claims.
    #[must_use]
    pub fn into_claims(self) -> ClaimSet {
        self.state.claims
    }

    /// Get the subject claim
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.state.claims.sub
    }

    /// Check if the token grants a role
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.state.claims.has_role(role)
    }

    /// Get the raw token string
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl<S: TokenState> Token<S> {
    /// Get the current state name
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    /// Get the token header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{EncodingKey, encode};

    const SECRET: &[u8] = b"s3cr3t";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn requirements() -> ClaimRequirements<'static> {
        ClaimRequirements {
            issuer: "login-svc",
            audience: "clients",
            clock_skew: Duration::ZERO,
        }
    }

    fn sign(claims: &ClaimSet, alg: Algorithm) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn claims() -> ClaimSet {
        ClaimSet::new("42", ["Admin"], "login-svc", "clients", now(), Duration::from_secs(900))
    }

    #[test]
    fn test_state_transitions() {
        let token = Token::parse(&sign(&claims(), Algorithm::HS256)).unwrap();
        assert_eq!(token.state_name(), "Unverified");

        let token = token.verify_signature(&DecodingKey::from_secret(SECRET)).unwrap();
        assert_eq!(token.state_name(), "SignatureVerified");
        assert_eq!(token.peek_claims().sub, "42");

        let token = token.validate_claims(&requirements(), now()).unwrap();
        assert_eq!(token.state_name(), "Validated");
        assert_eq!(token.subject(), "42");
        assert!(token.has_role("Admin"));
    }

    #[test]
    fn test_two_segments_malformed() {
        assert!(matches!(Token::parse("abc.def"), Err(TokenError::Malformed { .. })));
        assert!(matches!(Token::parse(""), Err(TokenError::Malformed { .. })));
    }

    #[test]
    fn test_other_algorithm_malformed() {
        let raw = sign(&claims(), Algorithm::HS512);
        assert!(matches!(Token::parse(&raw), Err(TokenError::Malformed { .. })));
    }

    #[test]
    fn test_wrong_key_bad_signature() {
        let token = Token::parse(&sign(&claims(), Algorithm::HS256)).unwrap();
        let result = token.verify_signature(&DecodingKey::from_secret(b"other"));
        assert!(matches!(result, Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_issuer_checked_before_expiry() {
        let mut foreign = claims();
        foreign.iss = "someone-else".to_string();
        foreign.exp = foreign.iat;

        let token = Token::parse(&sign(&foreign, Algorithm::HS256))
            .unwrap()
            .verify_signature(&DecodingKey::from_secret(SECRET))
            .unwrap();

        let result = token.validate_claims(&requirements(), now());
        assert!(matches!(result, Err(TokenError::WrongIssuer { found }) if found == "someone-else"));
    }

    #[test]
    fn test_clock_skew_extends_expiry() {
        let token = Token::parse(&sign(&claims(), Algorithm::HS256))
            .unwrap()
            .verify_signature(&DecodingKey::from_secret(SECRET))
            .unwrap();
        let late = now() + chrono::Duration::seconds(910);
        let lenient = ClaimRequirements {
            clock_skew: Duration::from_secs(30),
            ..requirements()
        };

        assert!(token.validate_claims(&lenient, late).is_ok());
    }
}
