//! Bearer token service.
//!
//! The web layer only ever asks two questions of a credential: is it valid,
//! and whose is it. [`Hs256TokenService`] answers them for HS256 JWTs and also
//! issues tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};
use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token time window")]
    InvalidTimeWindow,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token issuer mismatch")]
    WrongIssuer,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token carries no subject")]
    MissingSubject,

    #[error("failed to encode token: {0}")]
    Encode(String),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            TokenValidationError::NotYetValid => TokenError::NotYetValid,
            TokenValidationError::InvalidTimeWindow => TokenError::InvalidTimeWindow,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Credential validation contract consumed by the authentication middleware.
pub trait TokenService: Send + Sync {
    /// Whether `token` is acceptable at all (signature, structure, time window).
    fn validate(&self, token: &str) -> bool;

    /// Subject identifier carried by `token`.
    fn subject(&self, token: &str) -> Result<String, TokenError>;
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token issuing contract consumed by the login endpoint.
pub trait TokenIssuer: Send + Sync {
    fn issue_for(&self, subject: &str, roles: Vec<Role>) -> Result<IssuedToken, TokenError>;
}

/// HS256 JWT implementation.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    issuer: String,
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration, issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            issuer: issuer.into(),
        }
    }

    /// Issue a token for `subject` valid from now for the configured TTL.
    pub fn issue(&self, subject: &str, roles: Vec<Role>) -> Result<String, TokenError> {
        let now = Utc::now();
        self.issue_window(subject, roles, now, now + self.ttl)
    }

    /// Issue a token with an explicit validity window.
    pub fn issue_window(
        &self,
        subject: &str,
        roles: Vec<Role>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::MissingSubject);
        }

        let claims = JwtClaims {
            sub: subject.to_string(),
            roles,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::now_v7().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature and issuer, then the claim time window.
    pub fn decode(&self, token: &str) -> Result<JwtClaims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Malformed("empty token".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if !self.issuer.is_empty() {
            validation.set_issuer(&[&self.issuer]);
        }

        let claims = decode::<JwtClaims>(token, &self.decoding, &validation)?.claims;
        validate_claims(&claims, Utc::now())?;
        Ok(claims)
    }
}

impl TokenService for Hs256TokenService {
    fn validate(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                false
            }
        }
    }

    fn subject(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.decode(token)?;
        let sub = claims.sub.trim();
        if sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        Ok(sub.to_string())
    }
}

impl TokenIssuer for Hs256TokenService {
    fn issue_for(&self, subject: &str, roles: Vec<Role>) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let token = self.issue_window(subject, roles, now, expires_at)?;
        Ok(IssuedToken { token, expires_at })
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
