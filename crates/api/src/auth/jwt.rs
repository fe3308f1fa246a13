//! Session token codec
//!
//! Tokens are HS256 JWTs carrying the caller's email. They are stateless:
//! signature and expiry alone decide validity, nothing is stored server-side.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;

/// The only algorithm tokens are signed with or accepted under
pub const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity of the caller
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Unique per issuance, so re-issuing for the same identity never repeats a token
    pub jti: String,
}

/// A freshly issued token and what it says
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub claims: Claims,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    SignatureInvalid,
    #[error("Token has expired")]
    Expired,
    #[error("Token is malformed")]
    Malformed,
    #[error("Cannot issue a token for an empty identity")]
    EmptyIdentity,
    #[error("Token encoding failed")]
    Encoding,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Issues and parses session tokens with the process signing secret
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(SESSION_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_hours.saturating_mul(3600)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.session_ttl_hours)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `email`, valid from now for the configured TTL
    pub fn issue(&self, email: &str) -> Result<SessionToken, TokenError> {
        self.issue_at(email, OffsetDateTime::now_utc())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, email: &str, now: OffsetDateTime) -> Result<SessionToken, TokenError> {
        if email.trim().is_empty() {
            return Err(TokenError::EmptyIdentity);
        }

        let expires_at = now.checked_add(self.ttl).ok_or_else(|| {
            tracing::error!(ttl = %self.ttl, "Session expiry is out of range");
            TokenError::Encoding
        })?;
        let claims = Claims {
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sign session token");
                TokenError::Encoding
            })?;

        Ok(SessionToken {
            token,
            claims,
            issued_at: now,
            expires_at,
        })
    }

    /// Verify signature, algorithm and expiry, and return the typed claims
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-jwt-secret-key-for-testing-only";

    fn manager() -> JwtManager {
        JwtManager::new(SECRET, 24)
    }

    #[test]
    fn test_issue_and_parse_round_trip() {
        let jwt = manager();
        for email in ["a@example.com", "x", "ünïcødé@example.org", "with space@example.com"] {
            let issued = jwt.issue(email).unwrap();
            let claims = jwt.parse(&issued.token).unwrap();
            assert_eq!(claims.email, email);
            assert_eq!(claims, issued.claims);
        }
    }

    #[test]
    fn test_expiry_matches_ttl() {
        let jwt = JwtManager::new(SECRET, 168);
        let issued = jwt.issue("a@example.com").unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, 7 * 24 * 60 * 60);
        assert_eq!(issued.expires_at - issued.issued_at, Duration::days(7));
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error_not_a_panic() {
        for hours in [100_000_000, i64::MAX] {
            let result = JwtManager::new(SECRET, hours).issue("a@example.com");
            assert_eq!(result.unwrap_err(), TokenError::Encoding);
        }
    }

    #[test]
    fn test_longest_configured_ttl_issues() {
        let jwt = JwtManager::new(SECRET, crate::config::MAX_SESSION_TTL_HOURS);
        let issued = jwt.issue("a@example.com").unwrap();
        assert_eq!(jwt.parse(&issued.token).unwrap().email, "a@example.com");
    }

    #[test]
    fn test_tokens_are_not_idempotent() {
        let jwt = manager();
        let now = OffsetDateTime::now_utc();
        let first = jwt.issue_at("a@example.com", now).unwrap();
        let second = jwt.issue_at("a@example.com", now).unwrap();
        assert_ne!(first.token, second.token);
        assert_ne!(first.claims.jti, second.claims.jti);
    }

    #[test]
    fn test_empty_identity_refused() {
        assert_eq!(
            manager().issue("").unwrap_err(),
            TokenError::EmptyIdentity
        );
        assert_eq!(
            manager().issue("   ").unwrap_err(),
            TokenError::EmptyIdentity
        );
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let issued = JwtManager::new("secret-one", 24).issue("a@example.com").unwrap();
        let result = JwtManager::new("secret-two", 24).parse(&issued.token);
        assert_eq!(result.unwrap_err(), TokenError::SignatureInvalid);
    }

    #[test]
    fn test_expired_token() {
        let jwt = manager();
        let issued = jwt
            .issue_at("a@example.com", OffsetDateTime::now_utc() - Duration::hours(25))
            .unwrap();
        assert_eq!(jwt.parse(&issued.token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims {
            email: "a@example.com".to_string(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(manager().parse(&token).unwrap_err(), TokenError::SignatureInvalid);
    }

    #[test]
    fn test_missing_identity_claim_is_malformed() {
        #[derive(Serialize)]
        struct NoEmail {
            iat: i64,
            exp: i64,
        }

        let now = OffsetDateTime::now_utc();
        let token = encode(
            &Header::new(SESSION_ALGORITHM),
            &NoEmail {
                iat: now.unix_timestamp(),
                exp: (now + Duration::hours(1)).unix_timestamp(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(manager().parse(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let jwt = manager();
        for garbage in ["", "invalid.token.here", "a.b", "not a token at all"] {
            assert!(jwt.parse(garbage).is_err(), "accepted {:?}", garbage);
        }
        assert_eq!(jwt.parse("invalid.token.here").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_any_single_signature_change_is_rejected() {
        let jwt = manager();
        let issued = jwt.issue("a@example.com").unwrap();
        let signature_start = issued.token.rfind('.').unwrap() + 1;

        for position in signature_start..issued.token.len() {
            let mut bytes = issued.token.clone().into_bytes();
            bytes[position] = if bytes[position] == b'A' { b'Q' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                jwt.parse(&tampered).is_err(),
                "tampered signature at {} was accepted",
                position
            );
        }
    }

    #[test]
    fn test_payload_swap_is_rejected() {
        let jwt = manager();
        let alice = jwt.issue("alice@example.com").unwrap();
        let mallory = jwt.issue("mallory@example.com").unwrap();

        let alice_parts: Vec<&str> = alice.token.split('.').collect();
        let mallory_parts: Vec<&str> = mallory.token.split('.').collect();
        let forged = format!("{}.{}.{}", alice_parts[0], alice_parts[1], mallory_parts[2]);

        assert_eq!(jwt.parse(&forged).unwrap_err(), TokenError::SignatureInvalid);
    }
}
