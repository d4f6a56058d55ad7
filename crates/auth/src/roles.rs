use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::Permission;
use crate::permissions::materials;

/// Role name used for RBAC.
///
/// Roles are informational on the principal; authorization decisions are made
/// on the expanded permission set, never on role names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// Role → permission mapping.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCatalog {
    roles: HashMap<Role, BTreeSet<Permission>>,
}

impl RoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permissions` to `role` (additive).
    pub fn grant<I, P>(mut self, role: impl Into<Role>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.roles
            .entry(role.into())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn permissions_of(&self, role: &Role) -> impl Iterator<Item = &Permission> {
        self.roles.get(role).into_iter().flatten()
    }

    /// Union of the permissions granted by `roles`. Unknown roles grant nothing.
    pub fn expand<'a, I>(&self, roles: I) -> HashSet<Permission>
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles
            .into_iter()
            .flat_map(|role| self.permissions_of(role))
            .cloned()
            .collect()
    }

    /// Default mapping for the materials backend.
    ///
    /// Production deployments can load their own catalogue instead.
    pub fn materials_defaults() -> Self {
        use materials::*;

        Self::new()
            .grant(
                "admin",
                [
                    CATEGORY_QUERY,
                    CATEGORY_CREATE,
                    SUPPLIER_QUERY,
                    SUPPLIER_CREATE,
                    SUPPLIER_UPDATE,
                    SUPPLIER_DELETE,
                    INVENTORY_QUERY,
                    INVENTORY_UPDATE,
                    INVENTORY_ADJUST,
                ],
            )
            .grant(
                "warehouse",
                [CATEGORY_QUERY, INVENTORY_QUERY, INVENTORY_UPDATE, INVENTORY_ADJUST],
            )
            .grant(
                "purchaser",
                [CATEGORY_QUERY, SUPPLIER_QUERY, SUPPLIER_CREATE, SUPPLIER_UPDATE],
            )
            .grant("viewer", [CATEGORY_QUERY, SUPPLIER_QUERY, INVENTORY_QUERY])
    }
}
