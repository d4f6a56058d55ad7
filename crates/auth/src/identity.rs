//! Identity resolution: subject identifier → [`Principal`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::password::{HashedPassword, PasswordError};
use crate::{Permission, Principal, Role, RoleCatalog};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user '{0}' not found")]
    NotFound(String),

    #[error("user '{0}' is disabled")]
    Disabled(String),

    #[error("user '{0}' is locked")]
    Locked(String),

    #[error("identity backend failure: {0}")]
    Backend(String),
}

/// Resolves a token subject into the full principal for one request.
///
/// Implementations may perform I/O; callers bound them with a deadline.
#[async_trait]
pub trait IdentityLoader: Send + Sync {
    async fn resolve(&self, subject: &str) -> Result<Principal, IdentityError>;
}

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Can authenticate.
    #[default]
    Normal,
    Disabled,
    Locked,
}

/// Stored view of a user, as far as authentication cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Permissions granted directly, in addition to role grants.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Users without a stored hash cannot log in with a password.
    #[serde(default)]
    pub password_hash: Option<HashedPassword>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            status: UserStatus::Normal,
            roles: Vec::new(),
            permissions: Vec::new(),
            password_hash: None,
        }
    }

    /// Hash and store `plain` as the login password.
    pub fn with_password(mut self, plain: &str) -> Result<Self, PasswordError> {
        self.password_hash = Some(HashedPassword::from_plain(plain)?);
        Ok(self)
    }

    pub fn with_password_hash(mut self, hash: HashedPassword) -> Self {
        self.password_hash = Some(hash);
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

/// Seed file layout for [`InMemoryIdentityLoader::from_json`].
#[derive(Debug, Deserialize)]
struct Seed {
    #[serde(default)]
    roles: Option<RoleCatalog>,
    users: Vec<UserRecord>,
}

/// Identity loader over a fixed set of users and a role catalogue.
///
/// Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityLoader {
    users: HashMap<String, UserRecord>,
    catalog: RoleCatalog,
}

impl InMemoryIdentityLoader {
    pub fn new(catalog: RoleCatalog) -> Self {
        Self {
            users: HashMap::new(),
            catalog,
        }
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.username.clone(), user);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Load users (and optionally a role catalogue) from JSON:
    ///
    /// ```json
    /// { "roles": { "viewer": ["supplier:query"] },
    ///   "users": [ { "username": "alice", "roles": ["viewer"] } ] }
    /// ```
    ///
    /// Without a `roles` key, `default_catalog` is used. A user may carry a
    /// `password_hash` (argon2 PHC string) to enable password login.
    pub fn from_json(json: &str, default_catalog: RoleCatalog) -> anyhow::Result<Self> {
        let seed: Seed = serde_json::from_str(json)?;
        let catalog = seed.roles.unwrap_or(default_catalog);

        Ok(seed
            .users
            .into_iter()
            .fold(Self::new(catalog), |loader, user| loader.with_user(user)))
    }

    pub(crate) fn user(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub(crate) fn principal_for(&self, user: &UserRecord) -> Principal {
        let mut permissions = self.catalog.expand(&user.roles);
        permissions.extend(user.permissions.iter().cloned());

        Principal::new(user.username.clone())
            .with_roles(user.roles.iter().cloned())
            .with_permissions(permissions)
    }
}

#[async_trait]
impl IdentityLoader for InMemoryIdentityLoader {
    async fn resolve(&self, subject: &str) -> Result<Principal, IdentityError> {
        let user = self
            .users
            .get(subject)
            .ok_or_else(|| IdentityError::NotFound(subject.to_string()))?;

        match user.status {
            UserStatus::Normal => Ok(self.principal_for(user)),
            UserStatus::Disabled => Err(IdentityError::Disabled(subject.to_string())),
            UserStatus::Locked => Err(IdentityError::Locked(subject.to_string())),
        }
    }
}
