//! API-side authorization: the per-route policy guard and the registry
//! builder that ties routes to their policies.
//!
//! Authentication never rejects (see [`crate::middleware`]); this is the
//! single place where a missing or under-privileged principal is turned away.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    handler::Handler,
    http::Method,
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{MethodFilter, on},
};
use thiserror::Error;

use haocai_auth::{
    OperationId, PolicyDescriptor, PolicyError, PolicyRegistry, PolicyRegistryBuilder,
    authorize::explain, evaluate,
};
use haocai_core::AppError;

use crate::context::AuthContext;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("method '{0}' cannot be routed")]
    UnsupportedMethod(Method),

    #[error("operation '{0}' is routed twice")]
    DuplicateRoute(OperationId),
}

/// Check `policy` against the request's authentication outcome.
///
/// Handlers that need finer-grained checks than their route policy call
/// this directly.
pub fn enforce(ctx: &AuthContext, policy: &PolicyDescriptor) -> Result<(), AppError> {
    evaluate(ctx.principal(), policy).map_err(|e| {
        let explanation = explain(ctx.principal(), policy);
        tracing::warn!(
            subject = explanation.subject.as_deref().unwrap_or("anonymous"),
            policy = %explanation.policy,
            missing = ?explanation.missing,
            reason = %explanation.reason,
            "access denied"
        );
        AppError::from(e)
    })
}

/// What a single route's guard enforces. Cloned into every request.
#[derive(Clone, Debug)]
pub struct RouteGuard {
    operation: OperationId,
    policy: Arc<PolicyDescriptor>,
}

impl RouteGuard {
    pub fn new(operation: OperationId, policy: PolicyDescriptor) -> Self {
        Self {
            operation,
            policy: Arc::new(policy),
        }
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn policy(&self) -> &PolicyDescriptor {
        &self.policy
    }
}

/// Route-level guard: enforce the route's policy before the handler runs.
///
/// The guard is layered onto the route's own endpoint, so it follows the
/// handler wherever the router is nested or merged and also covers the
/// `HEAD` requests axum answers with a `GET` handler.
pub async fn policy_guard(State(guard): State<RouteGuard>, req: Request, next: Next) -> Response {
    match check(&guard, &req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn check(guard: &RouteGuard, req: &Request) -> Result<(), AppError> {
    // Absence of a context is treated like an anonymous caller.
    let anonymous = AuthContext::anonymous();
    let ctx = req.extensions().get::<AuthContext>().unwrap_or(&anonymous);

    let span = tracing::debug_span!(
        "authorize",
        operation = %guard.operation,
        method = %req.method(),
    );
    let _entered = span.enter();
    enforce(ctx, &guard.policy)?;
    tracing::debug!(policy = %guard.policy, "access granted");
    Ok(())
}

/// Routes together with the policies that protect them.
///
/// Registering a route and its policy in one call keeps the two from
/// drifting apart; [`SecuredRoutes::build`] fails on duplicate operations.
pub struct SecuredRoutes {
    router: Router,
    policies: PolicyRegistryBuilder,
    operations: BTreeSet<OperationId>,
    error: Option<RouteError>,
}

impl Default for SecuredRoutes {
    fn default() -> Self {
        Self::new()
    }
}

impl SecuredRoutes {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            policies: PolicyRegistry::builder(),
            operations: BTreeSet::new(),
            error: None,
        }
    }

    /// Route reachable without any permission.
    pub fn public<H, T>(self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(method, path, handler, None)
    }

    /// Route guarded by `policy`.
    pub fn protected<H, T>(
        self,
        method: Method,
        path: &str,
        handler: H,
        policy: PolicyDescriptor,
    ) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(method, path, handler, Some(policy))
    }

    fn add<H, T>(
        mut self,
        method: Method,
        path: &str,
        handler: H,
        policy: Option<PolicyDescriptor>,
    ) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => {
                self.error.get_or_insert(RouteError::UnsupportedMethod(method));
                return self;
            }
        };

        let operation = OperationId::new(method.as_str(), path);
        if self.operations.contains(&operation) {
            self.error.get_or_insert(RouteError::DuplicateRoute(operation));
            return self;
        }

        let endpoint = match policy {
            Some(policy) => {
                self.policies.insert(operation.clone(), policy.clone());
                on(filter, handler).route_layer(from_fn_with_state(
                    RouteGuard::new(operation.clone(), policy),
                    policy_guard,
                ))
            }
            None => on(filter, handler),
        };
        self.router = self.router.route(path, endpoint);
        self.operations.insert(operation);
        self
    }

    pub fn merge(mut self, other: SecuredRoutes) -> Self {
        if let Some(e) = other.error {
            self.error.get_or_insert(e);
        }
        // Overlapping method routes would panic inside the router.
        if let Some(dup) = self.operations.intersection(&other.operations).next() {
            self.error
                .get_or_insert(RouteError::DuplicateRoute(dup.clone()));
            return self;
        }

        self.router = self.router.merge(other.router);
        self.policies = self.policies.merge(other.policies);
        self.operations.extend(other.operations);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Every routed operation, sorted.
    pub fn operations(&self) -> impl Iterator<Item = &OperationId> {
        self.operations.iter()
    }

    /// Freeze the policy registry and hand back the router. Guards are
    /// already attached to their routes.
    pub fn build(self) -> Result<(Router, PolicyRegistry), RouteError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let policies = self.policies.build()?;
        Ok((self.router, policies))
    }
}
