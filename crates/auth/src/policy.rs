//! Declarative access policies and their static registry.
//!
//! A [`PolicyDescriptor`] is attached to an operation once, at startup, and
//! looked up by [`OperationId`] on every request. The registry is immutable
//! after [`PolicyRegistryBuilder::build`], so concurrent readers need no
//! synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Permission;

/// How multiple required permissions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logical {
    /// Every required permission must be granted.
    All,
    /// At least one required permission must be granted.
    #[default]
    Any,
}

impl core::fmt::Display for Logical {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Logical::All => f.write_str("ALL"),
            Logical::Any => f.write_str("ANY"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy requires at least one permission")]
    EmptyRequirement,

    #[error("blank permission code in policy")]
    BlankPermission,

    #[error("operation '{0}' already has a policy")]
    DuplicateOperation(OperationId),
}

/// Access requirement of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDescriptor {
    required: Vec<Permission>,
    logical: Logical,
}

impl PolicyDescriptor {
    /// Build a descriptor; `required` must be non-empty and contain no blank
    /// codes. Order is kept and only affects short-circuiting.
    pub fn new<I, P>(logical: Logical, required: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        let required: Vec<Permission> = required.into_iter().map(Into::into).collect();
        if required.is_empty() {
            return Err(PolicyError::EmptyRequirement);
        }
        if required.iter().any(|p| p.as_str().trim().is_empty()) {
            return Err(PolicyError::BlankPermission);
        }
        Ok(Self { required, logical })
    }

    pub fn all<I, P>(required: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self::new(Logical::All, required)
    }

    pub fn any<I, P>(required: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self::new(Logical::Any, required)
    }

    /// Single-permission shorthand; a blank code is rejected like in
    /// [`new`](Self::new).
    pub fn requires(permission: impl Into<Permission>) -> Result<Self, PolicyError> {
        Self::new(Logical::default(), [permission])
    }

    pub fn required(&self) -> &[Permission] {
        &self.required
    }

    pub fn logical(&self) -> Logical {
        self.logical
    }
}

impl core::fmt::Display for PolicyDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}[", self.logical)?;
        for (i, p) in self.required.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(p.as_str())?;
        }
        f.write_str("]")
    }
}

/// Identity of an operation: `"{METHOD} {route template}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// The method is upper-cased; the route template is kept as registered.
    pub fn new(method: &str, route: &str) -> Self {
        Self(format!("{} {}", method.to_ascii_uppercase(), route))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable operation → policy mapping.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: Arc<HashMap<OperationId, PolicyDescriptor>>,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    /// Policy for `operation`, or `None` if the operation is unprotected.
    pub fn lookup(&self, operation: &OperationId) -> Option<&PolicyDescriptor> {
        self.policies.get(operation)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperationId, &PolicyDescriptor)> {
        self.policies.iter()
    }
}

/// Startup-time collector for [`PolicyRegistry`].
#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    policies: HashMap<OperationId, PolicyDescriptor>,
    duplicate: Option<OperationId>,
}

impl PolicyRegistryBuilder {
    pub fn register(mut self, operation: OperationId, policy: PolicyDescriptor) -> Self {
        self.insert(operation, policy);
        self
    }

    /// In-place variant of [`register`](Self::register).
    pub fn insert(&mut self, operation: OperationId, policy: PolicyDescriptor) {
        if self.policies.contains_key(&operation) {
            self.duplicate.get_or_insert(operation);
            return;
        }
        self.policies.insert(operation, policy);
    }

    /// Merge another builder's registrations into this one.
    pub fn merge(mut self, other: PolicyRegistryBuilder) -> Self {
        if let Some(dup) = other.duplicate {
            self.duplicate.get_or_insert(dup);
        }
        for (operation, policy) in other.policies {
            self.insert(operation, policy);
        }
        self
    }

    /// Freeze the registry. Registering one operation twice is an error.
    pub fn build(self) -> Result<PolicyRegistry, PolicyError> {
        if let Some(dup) = self.duplicate {
            return Err(PolicyError::DuplicateOperation(dup));
        }
        Ok(PolicyRegistry {
            policies: Arc::new(self.policies),
        })
    }
}
