//! Username/password login: credential check plus account status.

use async_trait::async_trait;
use thiserror::Error;

use haocai_core::{AppError, business};

use crate::identity::{InMemoryIdentityLoader, UserStatus};
use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown user or wrong password; the two are indistinguishable.
    #[error("bad credentials")]
    BadCredentials,

    #[error("user '{0}' is disabled")]
    Disabled(String),

    #[error("user '{0}' is locked")]
    Locked(String),

    #[error("credential backend failure: {0}")]
    Backend(String),
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::BadCredentials => {
                AppError::business(business::PASSWORD_ERROR, "用户名或密码错误")
            }
            LoginError::Disabled(_) => AppError::business(business::USER_DISABLED, "用户已被禁用"),
            LoginError::Locked(_) => AppError::business(business::USER_LOCKED, "用户已被锁定"),
            LoginError::Backend(detail) => AppError::internal(detail),
        }
    }
}

/// Checks a username/password pair and yields the principal to issue a
/// token for.
///
/// The password is checked before the account status, so a caller without
/// the password learns nothing about the account.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<Principal, LoginError>;
}

#[async_trait]
impl CredentialVerifier for InMemoryIdentityLoader {
    async fn verify(&self, username: &str, password: &str) -> Result<Principal, LoginError> {
        let user = self.user(username).ok_or(LoginError::BadCredentials)?;
        let matches = user
            .password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(password));
        if !matches {
            return Err(LoginError::BadCredentials);
        }

        match user.status {
            UserStatus::Normal => Ok(self.principal_for(user)),
            UserStatus::Disabled => Err(LoginError::Disabled(username.to_string())),
            UserStatus::Locked => Err(LoginError::Locked(username.to_string())),
        }
    }
}
