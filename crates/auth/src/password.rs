//! Password hashing for stored credentials (argon2id, PHC string format).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed")]
    MalformedHash,
}

/// A PHC-encoded password hash, e.g. `$argon2id$v=19$...`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Hash `plain` with a fresh random salt.
    pub fn from_plain(plain: &str) -> Result<Self, PasswordError> {
        if plain.is_empty() {
            return Err(PasswordError::Empty);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Wrap an already encoded hash, checking that it parses.
    pub fn from_phc(encoded: impl Into<String>) -> Result<Self, PasswordError> {
        let encoded = encoded.into();
        PasswordHash::new(&encoded).map_err(|_| PasswordError::MalformedHash)?;
        Ok(Self(encoded))
    }

    /// Whether `plain` matches. A hash that no longer parses never matches.
    pub fn verify(&self, plain: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                tracing::warn!("stored password hash is malformed");
                false
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}
