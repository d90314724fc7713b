//! Property-based tests for token issuance and validation.
//!
//! Property 1: Issue/Validate Round-Trip
//! Property 2: Tamper Detection
//! Property 3: Expiry Boundary
//! Property 4: Issuer and Audience Isolation

use std::collections::BTreeSet;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use login_service::config::JwtConfig;
use login_service::{ErrorResponse, TokenAuthority, TokenError};
use proptest::prelude::*;
use secrecy::SecretString;

fn authority(secret: &str, issuer: &str, audience: &str, lifetime: Duration) -> TokenAuthority {
    TokenAuthority::new(&JwtConfig {
        secret: SecretString::from(secret),
        issuer: issuer.to_string(),
        audience: audience.to_string(),
        lifetime,
        clock_skew: Duration::ZERO,
    })
    .unwrap()
}

fn default_authority() -> TokenAuthority {
    authority("s3cr3t", "login-svc", "clients", Duration::from_secs(900))
}

/// Flip one bit in one segment of a compact token, keeping it valid base64url.
fn flip_bit(token: &str, segment: usize, position: usize) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut bytes = URL_SAFE_NO_PAD.decode(&parts[segment]).unwrap();
    let index = position % bytes.len();
    bytes[index] ^= 1 << (position % 8);
    parts[segment] = URL_SAFE_NO_PAD.encode(bytes);
    parts.join(".")
}

fn instant(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

/// Generate arbitrary subject strings.
fn arb_subject() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,64}"
}

/// Generate arbitrary role sets.
fn arb_roles() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[A-Z][a-zA-Z]{0,15}", 0..5)
}

/// Generate arbitrary lifetimes (1 second to 24 hours).
fn arb_lifetime() -> impl Strategy<Value = u64> {
    1u64..86_400
}

/// Generate arbitrary issue instants (Unix seconds around 2024).
fn arb_issued_at() -> impl Strategy<Value = i64> {
    0i64..(365 * 24 * 3600)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1: any issued token validates before expiry to the same claims.
    #[test]
    fn prop_round_trip(
        subject in arb_subject(),
        roles in arb_roles(),
        lifetime in arb_lifetime(),
        issued_at in arb_issued_at(),
    ) {
        let authority = authority("s3cr3t", "login-svc", "clients", Duration::from_secs(lifetime));
        let now = instant(issued_at);

        let token = authority.issue_token(&subject, roles.iter().cloned(), now).unwrap();
        let claims = authority.validate_token(&token, now).unwrap();

        prop_assert_eq!(&claims.sub, &subject);
        prop_assert_eq!(&claims.roles, &roles);
        prop_assert_eq!(claims.iss.as_str(), "login-svc");
        prop_assert_eq!(claims.aud.as_str(), "clients");
        prop_assert_eq!(claims.iat, now.timestamp());
        prop_assert_eq!(claims.exp, now.timestamp() + i64::try_from(lifetime).unwrap());
    }

    /// Property 2: altering any bit of payload or signature is detected.
    #[test]
    fn prop_tampered_token_rejected(
        subject in arb_subject(),
        roles in arb_roles(),
        segment in 1usize..3,
        position in any::<usize>(),
    ) {
        let authority = default_authority();
        let now = instant(0);
        let token = authority.issue_token(&subject, roles, now).unwrap();

        let tampered = flip_bit(&token, segment, position);
        prop_assert_ne!(&tampered, &token);

        let result = authority.validate_token(&tampered, now);
        prop_assert!(matches!(result, Err(TokenError::BadSignature)), "got {:?}", result);
    }

    /// Property 3: valid strictly before `iat + lifetime`, expired from then on.
    #[test]
    fn prop_expiry_boundary(
        lifetime in arb_lifetime(),
        elapsed in 0u64..200_000,
    ) {
        let authority = authority("s3cr3t", "login-svc", "clients", Duration::from_secs(lifetime));
        let token = authority.issue_token("42", ["User"], instant(0)).unwrap();

        let result = authority.validate_token(&token, instant(i64::try_from(elapsed).unwrap()));
        if elapsed < lifetime {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(
                matches!(result, Err(TokenError::Expired { expired_at }) if expired_at == instant(0).timestamp() + i64::try_from(lifetime).unwrap()),
                "got {:?}", result
            );
        }
    }

    /// Property 4: a token never validates against another issuer or audience.
    #[test]
    fn prop_issuer_and_audience_isolation(
        issuer_a in "[a-z]{1,12}",
        issuer_b in "[a-z]{1,12}",
        audience_a in "[a-z]{1,12}",
        audience_b in "[a-z]{1,12}",
    ) {
        let lifetime = Duration::from_secs(900);
        let now = instant(0);
        let token = authority("shared", &issuer_a, &audience_a, lifetime)
            .issue_token("42", ["Admin"], now)
            .unwrap();

        let result = authority("shared", &issuer_b, &audience_b, lifetime).validate_token(&token, now);

        if issuer_a != issuer_b {
            prop_assert!(matches!(result, Err(TokenError::WrongIssuer { .. })), "got {:?}", result);
        } else if audience_a != audience_b {
            prop_assert!(matches!(result, Err(TokenError::WrongAudience { .. })), "got {:?}", result);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Every rejection produces the same caller-facing body.
    #[test]
    fn prop_rejections_are_uniform(input in "[a-zA-Z0-9._-]{0,64}") {
        if let Err(err) = default_authority().validate_token(&input, instant(0)) {
            let response = ErrorResponse::unauthorized(&err);
            prop_assert_eq!(response.error, "unauthorized");
            prop_assert_eq!(response.status, 401);
        }
    }
}

#[test]
fn test_fifteen_minute_token_scenario() {
    let authority = default_authority();
    let issued = instant(0);

    let token = authority.issue_token("42", ["Admin"], issued).unwrap();

    let claims = authority
        .validate_token(&token, issued + chrono::Duration::minutes(1))
        .unwrap();
    assert_eq!(claims.sub, "42");
    assert_eq!(claims.roles, BTreeSet::from(["Admin".to_string()]));

    let expired = authority.validate_token(&token, issued + chrono::Duration::minutes(16));
    assert!(matches!(expired, Err(TokenError::Expired { .. })));
}

#[test]
fn test_signature_checked_before_issuer() {
    let foreign = authority("other-secret", "evil", "clients", Duration::from_secs(900));
    let token = foreign.issue_token("42", ["Admin"], instant(0)).unwrap();

    let result = default_authority().validate_token(&token, instant(0));
    assert!(matches!(result, Err(TokenError::BadSignature)));
}

#[test]
fn test_expired_and_foreign_audience_reports_audience() {
    let foreign = authority("s3cr3t", "login-svc", "admin-console", Duration::from_secs(60));
    let token = foreign.issue_token("42", ["Admin"], instant(0)).unwrap();

    let result = default_authority().validate_token(&token, instant(3600));
    assert!(matches!(result, Err(TokenError::WrongAudience { .. })));
}

#[test]
fn test_unsigned_token_rejected() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        br#"{"sub":"42","roles":["Admin"],"iss":"login-svc","aud":"clients","iat":0,"exp":9999999999}"#,
    );
    let token = format!("{header}.{payload}.");

    let result = default_authority().validate_token(&token, instant(0));
    assert!(matches!(result, Err(TokenError::Malformed { .. })));
}
