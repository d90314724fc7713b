//! Compact HS256 encoding of claim sets.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};

use crate::error::TokenError;
use crate::jwt::claims::ClaimSet;
use crate::jwt::token::{SignatureVerified, Token};

/// The only algorithm issued or accepted.
pub const SUPPORTED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and verifies claim sets with a shared secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl ClaimsCodec {
    /// Build a codec from the raw secret bytes.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Serialize and sign a claim set.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if serialization or signing fails.
    pub fn encode(&self, claims: &ClaimSet) -> Result<String, TokenError> {
        let header = Header::new(SUPPORTED_ALGORITHM);
        encode(&header, claims, &self.encoding_key).map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Parse a compact token and verify its MAC.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for structural problems and `BadSignature` when
    /// the MAC does not match.
    pub fn decode(&self, raw: &str) -> Result<Token<SignatureVerified>, TokenError> {
        Token::parse(raw)?.verify_signature(&self.decoding_key)
    }
}

impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &SUPPORTED_ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;
    use std::time::Duration;

    fn claims() -> ClaimSet {
        ClaimSet::new("42", ["Admin"], "login-svc", "clients", Utc::now(), Duration::from_secs(900))
    }

    #[test]
    fn test_encode_decode() {
        let codec = ClaimsCodec::from_secret(b"s3cr3t");
        let claims = claims();

        let raw = codec.encode(&claims).unwrap();
        assert_eq!(raw.split('.').count(), 3);

        let token = codec.decode(&raw).unwrap();
        assert_eq!(token.peek_claims(), &claims);
    }

    #[test]
    fn test_header_is_hs256_jwt() {
        let raw = ClaimsCodec::from_secret(b"s3cr3t").encode(&claims()).unwrap();
        let header = raw.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();

        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_different_secret_rejected() {
        let raw = ClaimsCodec::from_secret(b"s3cr3t").encode(&claims()).unwrap();
        let result = ClaimsCodec::from_secret(b"other").decode(&raw);
        assert!(matches!(result, Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_non_claim_payload_malformed() {
        let codec = ClaimsCodec::from_secret(b"s3cr3t");
        let raw = encode(
            &Header::new(SUPPORTED_ALGORITHM),
            &serde_json::json!({ "hello": "world" }),
            &EncodingKey::from_secret(b"s3cr3t"),
        )
        .unwrap();

        assert!(matches!(codec.decode(&raw), Err(TokenError::Malformed { .. })));
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", ClaimsCodec::from_secret(b"s3cr3t"));
        assert!(!debug.contains("s3cr3t"));
    }
}
