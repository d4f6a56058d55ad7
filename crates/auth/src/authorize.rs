use serde::Serialize;
use thiserror::Error;

use haocai_core::{AppError, ErrorKind};

use crate::{Logical, Permission, PolicyDescriptor, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("principal has no permissions")]
    NoPermissions,

    #[error("missing permission '{0}'")]
    MissingPermission(Permission),

    #[error("none of the required permissions is granted")]
    NoneGranted,
}

impl AuthzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::Unauthenticated => ErrorKind::Unauthorized,
            AuthzError::NoPermissions
            | AuthzError::MissingPermission(_)
            | AuthzError::NoneGranted => ErrorKind::Forbidden,
        }
    }
}

/// Authorization failures render with the default message of their kind;
/// the missing permission stays in the logs.
impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        AppError::new(err.kind()).with_detail(err.to_string())
    }
}

/// Evaluate `policy` against the request's principal.
///
/// - No IO
/// - No panics
/// - Pure: same inputs, same outcome
///
/// `All` stops at the first missing permission, `Any` at the first match.
pub fn evaluate(principal: Option<&Principal>, policy: &PolicyDescriptor) -> Result<(), AuthzError> {
    let principal = principal.ok_or(AuthzError::Unauthenticated)?;

    if principal.permissions().is_empty() {
        return Err(AuthzError::NoPermissions);
    }

    match policy.logical() {
        Logical::All => {
            if let Some(missing) = policy
                .required()
                .iter()
                .find(|p| !principal.has_permission(p))
            {
                return Err(AuthzError::MissingPermission(missing.clone()));
            }
            Ok(())
        }
        Logical::Any => {
            if policy.required().iter().any(|p| principal.has_permission(p)) {
                Ok(())
            } else {
                Err(AuthzError::NoneGranted)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Auditable account of a policy decision.
///
/// Meant for logs and operator tooling, never for response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub subject: Option<String>,
    pub policy: String,
    pub granted: bool,
    pub reason: String,
    /// Required codes the principal does not hold (all of them, not just the
    /// first one evaluation stopped at).
    pub missing: Vec<String>,
}

/// Explain why [`evaluate`] would allow or deny.
pub fn explain(principal: Option<&Principal>, policy: &PolicyDescriptor) -> AuthorizationExplanation {
    let outcome = evaluate(principal, policy);

    let missing: Vec<String> = match principal {
        Some(p) => policy
            .required()
            .iter()
            .filter(|perm| !p.has_permission(perm))
            .map(|perm| perm.as_str().to_string())
            .collect(),
        None => policy
            .required()
            .iter()
            .map(|perm| perm.as_str().to_string())
            .collect(),
    };

    let reason = match &outcome {
        Ok(()) => match policy.logical() {
            Logical::All => "principal holds every required permission".to_string(),
            Logical::Any => "principal holds at least one required permission".to_string(),
        },
        Err(e) => e.to_string(),
    };

    AuthorizationExplanation {
        subject: principal.map(|p| p.subject().to_string()),
        policy: policy.to_string(),
        granted: outcome.is_ok(),
        reason,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn principal(perms: &[&'static str]) -> Principal {
        Principal::new("alice").with_permissions(perms.iter().copied())
    }

    #[test]
    fn all_requires_every_permission() {
        let policy = PolicyDescriptor::all(["A", "B"]).unwrap();

        assert_eq!(evaluate(Some(&principal(&["A", "B", "C"])), &policy), Ok(()));
        assert_eq!(
            evaluate(Some(&principal(&["A"])), &policy),
            Err(AuthzError::MissingPermission(Permission::new("B")))
        );
        assert_eq!(evaluate(None, &policy), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn any_requires_one_permission() {
        let policy = PolicyDescriptor::any(["A", "B"]).unwrap();

        assert_eq!(evaluate(Some(&principal(&["B"])), &policy), Ok(()));
        assert_eq!(
            evaluate(Some(&principal(&["C"])), &policy),
            Err(AuthzError::NoneGranted)
        );
    }

    #[test]
    fn empty_permission_set_is_forbidden_not_unauthorized() {
        let policy = PolicyDescriptor::any(["A"]).unwrap();
        let err = evaluate(Some(&principal(&[])), &policy).unwrap_err();
        assert_eq!(err, AuthzError::NoPermissions);
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn all_reports_first_missing_in_declared_order() {
        let policy = PolicyDescriptor::all(["A", "B", "C"]).unwrap();
        let err = evaluate(Some(&principal(&["A"])), &policy).unwrap_err();
        assert_eq!(err, AuthzError::MissingPermission(Permission::new("B")));
    }

    #[test]
    fn converts_to_taxonomy_with_safe_message() {
        let app: AppError = AuthzError::MissingPermission(Permission::new("user:write")).into();
        assert_eq!(app.code(), 403);
        assert_eq!(app.message(), "权限不足");
        assert!(app.detail().unwrap().contains("user:write"));

        let app: AppError = AuthzError::Unauthenticated.into();
        assert_eq!(app.code(), 401);
    }

    #[test]
    fn explanation_lists_all_missing() {
        let policy = PolicyDescriptor::all(["A", "B", "C"]).unwrap();
        let exp = explain(Some(&principal(&["B"])), &policy);
        assert!(!exp.granted);
        assert_eq!(exp.missing, ["A", "C"]);
        assert_eq!(exp.subject.as_deref(), Some("alice"));

        let exp = explain(Some(&principal(&["A", "B", "C"])), &policy);
        assert!(exp.granted);
        assert!(exp.missing.is_empty());
    }

    fn perm_set() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-d]:(read|write)", 0..6)
    }

    proptest! {
        #[test]
        fn evaluation_is_idempotent(granted in perm_set(), required in perm_set(), all in any::<bool>()) {
            prop_assume!(!required.is_empty());
            let p = Principal::new("p").with_permissions(granted);
            let logical = if all { Logical::All } else { Logical::Any };
            let policy = PolicyDescriptor::new(logical, required).unwrap();

            let first = evaluate(Some(&p), &policy);
            let second = evaluate(Some(&p), &policy);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn order_of_requirements_does_not_change_outcome(granted in perm_set(), required in perm_set(), all in any::<bool>()) {
            prop_assume!(!required.is_empty());
            let p = Principal::new("p").with_permissions(granted);
            let logical = if all { Logical::All } else { Logical::Any };

            let mut reversed = required.clone();
            reversed.reverse();
            let forward = PolicyDescriptor::new(logical, required).unwrap();
            let backward = PolicyDescriptor::new(logical, reversed).unwrap();

            prop_assert_eq!(
                evaluate(Some(&p), &forward).is_ok(),
                evaluate(Some(&p), &backward).is_ok()
            );
        }

        #[test]
        fn superset_principal_passes_all(required in perm_set(), extra in perm_set()) {
            prop_assume!(!required.is_empty());
            let p = Principal::new("p").with_permissions(required.iter().cloned().chain(extra));
            let policy = PolicyDescriptor::all(required).unwrap();
            prop_assert!(evaluate(Some(&p), &policy).is_ok());
        }
    }
}
