use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission code.
///
/// Permissions are opaque strings in `resource:action` form
/// (e.g. `"supplier:query"`). Matching is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource part of a `resource:action` code, if it has one.
    pub fn resource(&self) -> Option<&str> {
        self.0.split_once(':').map(|(resource, _)| resource)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Permission codes guarding the materials routes.
pub mod materials {
    use std::borrow::Cow;

    use super::Permission;

    pub const CATEGORY_QUERY: Permission = Permission(Cow::Borrowed("category:query"));
    pub const CATEGORY_CREATE: Permission = Permission(Cow::Borrowed("category:create"));
    pub const SUPPLIER_QUERY: Permission = Permission(Cow::Borrowed("supplier:query"));
    pub const SUPPLIER_CREATE: Permission = Permission(Cow::Borrowed("supplier:create"));
    pub const SUPPLIER_UPDATE: Permission = Permission(Cow::Borrowed("supplier:update"));
    pub const SUPPLIER_DELETE: Permission = Permission(Cow::Borrowed("supplier:delete"));
    pub const INVENTORY_QUERY: Permission = Permission(Cow::Borrowed("inventory:query"));
    pub const INVENTORY_UPDATE: Permission = Permission(Cow::Borrowed("inventory:update"));
    pub const INVENTORY_ADJUST: Permission = Permission(Cow::Borrowed("inventory:adjust"));
}
