// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuance and validation.
//!
//! Tokens are HMAC-signed JWTs carrying `{sub, iat, exp}`. Validation pins
//! the configured algorithm and allows no clock skew: a token is accepted
//! while `now <= exp`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::SessionClaims;

/// Default session lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 1440;

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Signs and checks session tokens with a process-wide key.
pub struct TokenIssuer {
    algorithm: Algorithm,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            algorithm: config.algorithm,
            ttl: config.ttl,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `subject` using the configured lifetime.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, self.ttl)
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// A negative `ttl` yields a token that is already expired.
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenConfig::new("unit-test-secret"))
    }

    fn flip_bit(segment: &str, bit: usize) -> String {
        let mut bytes = URL_SAFE_NO_PAD.decode(segment).unwrap();
        bytes[bit / 8] ^= 1 << (bit % 8);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    #[test]
    fn issued_token_validates_with_subject() {
        let issuer = issuer();
        let token = issuer.issue("a@b.com").unwrap();
        let claims = issuer.validate(&token).unwrap();

        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 1440 * 60);
    }

    #[test]
    fn short_positive_ttl_validates_immediately() {
        let issuer = issuer();
        let token = issuer.issue_with_ttl("a@b.com", Duration::seconds(5)).unwrap();
        assert_eq!(issuer.validate(&token).unwrap().sub, "a@b.com");
    }

    #[test]
    fn negative_ttl_is_expired() {
        let issuer = issuer();
        let token = issuer
            .issue_with_ttl("a@b.com", Duration::seconds(-1))
            .unwrap();
        assert!(matches!(issuer.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = issuer().issue("a@b.com").unwrap();
        let other = TokenIssuer::new(&TokenConfig::new("rotated-secret"));
        assert!(matches!(other.validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let mut config = TokenConfig::new("unit-test-secret");
        config.algorithm = Algorithm::HS512;
        let token = TokenIssuer::new(&config).issue("a@b.com").unwrap();
        assert!(matches!(issuer().validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = issuer();
        for token in ["", "not-a-jwt", "a.b.c", "..."] {
            assert!(matches!(issuer.validate(token), Err(TokenError::Invalid)));
        }
    }

    #[test]
    fn any_single_bit_flip_in_payload_or_signature_is_rejected() {
        let issuer = issuer();
        let token = issuer.issue("a@b.com").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let payload_bits = URL_SAFE_NO_PAD.decode(parts[1]).unwrap().len() * 8;
        for bit in 0..payload_bits {
            let tampered = format!("{}.{}.{}", parts[0], flip_bit(parts[1], bit), parts[2]);
            assert!(
                matches!(issuer.validate(&tampered), Err(TokenError::Invalid)),
                "payload bit {bit} flip was accepted"
            );
        }

        let signature_bits = URL_SAFE_NO_PAD.decode(parts[2]).unwrap().len() * 8;
        for bit in 0..signature_bits {
            let tampered = format!("{}.{}.{}", parts[0], parts[1], flip_bit(parts[2], bit));
            assert!(
                matches!(issuer.validate(&tampered), Err(TokenError::Invalid)),
                "signature bit {bit} flip was accepted"
            );
        }
    }

    #[test]
    fn token_without_subject_is_rejected() {
        #[derive(serde::Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSubject {
                exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert!(matches!(issuer().validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", TokenConfig::new("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }
}
