// Token signing and verification: HS256 over a single shared secret

use crate::core::errors::{CryptoError, TokenError};
use crate::core::models::{Claims, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::fmt;

/// The only algorithm tokens are issued with or accepted under
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Token lifetime of the reference deployment
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;

/// Below this length the secret is accepted but flagged at startup
pub const RECOMMENDED_SECRET_LEN: usize = 32;

/// Symmetric key shared by every process that signs or verifies tokens
#[derive(Clone)]
pub struct SharedSecret(Secret<String>);

impl SharedSecret {
    /// Wrap a provisioned secret; an empty value is refused
    pub fn new(value: impl Into<String>) -> Result<Self, CryptoError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CryptoError::SecretError("shared secret is empty".to_string()));
        }
        Ok(Self(Secret::new(value)))
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_weak(&self) -> bool {
        self.len() < RECOMMENDED_SECRET_LEN
    }

    /// Fixed secret for tests and local tooling, never for a deployment
    pub fn test_secret() -> Self {
        Self(Secret::new("finplan-test-secret-not-for-deployment".to_string()))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret").field(&"<REDACTED>").finish()
    }
}

/// Claims as they come off the wire; `sub` is optional so its absence can be
/// told apart from a broken token
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    exp: i64,
}

/// Issues and verifies tokens for one shared secret
///
/// Built once at startup and shared behind an `Arc`; holds no mutable state.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &SharedSecret, ttl: Duration) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked against our own clock in `verify_at`, with no leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` expiring one lifetime from now
    pub fn issue(&self, subject: &UserId) -> Result<String, CryptoError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current instant were `issued_at`
    pub fn issue_at(&self, subject: &UserId, issued_at: DateTime<Utc>) -> Result<String, CryptoError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (issued_at + self.ttl).timestamp(),
            iat: issued_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CryptoError::SigningError(e.to_string()))
    }

    /// Verify a token against the current instant
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current instant were `now`
    ///
    /// Order: structure and algorithm, signature, expiry, subject.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let data = decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| classify(e.kind()))?;

        // Valid only while now < exp.
        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        data.claims
            .sub
            .as_deref()
            .and_then(UserId::parse)
            .ok_or(TokenError::MissingSubject)
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::AlgorithmMismatch,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        other => TokenError::Malformed(format!("{:?}", other)),
    }
}
