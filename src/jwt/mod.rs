//! Token encoding and verification

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token type discriminator (prevents token confusion attacks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Email,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
            TokenKind::Email => write!(f, "email"),
        }
    }
}

/// Signed token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience set
    pub aud: Vec<String>,
    /// Token type discriminator
    pub token_type: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Verification failures surfaced by the codec.
///
/// Issuer/audience/type checks are deliberately not here: those are semantic
/// checks owned by the caller (the gateway filter), not by the codec.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Malformed(String),

    #[error("signing key not configured")]
    KeyMissing,
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Symmetric token codec (HS256)
///
/// Holds the one-time-loaded signing key. A codec constructed without a
/// secret stays usable but fails every encode/verify, so deployments that
/// intentionally run keyless degrade to rejecting all protected traffic
/// instead of crashing.
#[derive(Clone)]
pub struct JwtCodec {
    issuer: String,
    audience: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    email_ttl_secs: i64,
    keys: Option<KeyPair>,
}

impl JwtCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let keys = match config.signing_secret.as_ref() {
            Some(secret) => Some(KeyPair {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            None => {
                tracing::error!(
                    "No signing secret found in configuration, environment, or secret file; \
                     token issuance and verification are disabled"
                );
                None
            }
        };
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            email_ttl_secs: config.email_token_ttl_secs,
            keys,
        }
    }

    /// Whether a signing key was resolved at startup
    pub fn has_key(&self) -> bool {
        self.keys.is_some()
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the default 60 seconds.
    /// Audience validation is off: the gateway owns the semantic checks.
    fn strict_validation() -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 5;
        v.validate_aud = false;
        v
    }

    /// Verify signature and expiry, returning the decoded claims.
    ///
    /// Does not check issuer, audience, or token type; callers apply those
    /// to the returned claims.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::KeyMissing)?;

        let token_data = decode::<Claims>(token, &keys.decoding, &Self::strict_validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Issue an access token for a subject
    pub fn issue_access_token(&self, subject: &str) -> Result<String> {
        self.issue(subject, TokenKind::Access, self.access_ttl_secs)
    }

    /// Issue a refresh token for a subject
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String> {
        self.issue(subject, TokenKind::Refresh, self.refresh_ttl_secs)
    }

    /// Issue an email-scoped token for a subject
    pub fn issue_email_token(&self, subject: &str) -> Result<String> {
        self.issue(subject, TokenKind::Email, self.email_ttl_secs)
    }

    fn issue(&self, subject: &str, kind: TokenKind, ttl_secs: i64) -> Result<String> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("signing key not configured")))?;

        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_secs);

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: vec![self.audience.clone()],
            token_type: kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &keys.encoding).map_err(|e| AppError::Internal(e.into()))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Get access token TTL in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.access_ttl_secs
    }
}
