use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Permission, Role};

/// The authenticated actor of one request.
///
/// Built by the identity loader, attached to the request by the
/// authentication middleware and only read afterwards. Never cached or
/// shared across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject: String,
    permissions: HashSet<Permission>,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            permissions: HashSet::new(),
            roles: BTreeSet::new(),
        }
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

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Granted permission codes.
    pub fn permissions(&self) -> &HashSet<Permission> {
        &self.permissions
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Permission codes in a stable order, for logs and responses.
    pub fn sorted_permissions(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.permissions.iter().map(Permission::as_str).collect();
        codes.sort_unstable();
        codes
    }
}
