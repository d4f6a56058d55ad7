use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use haocai_auth::Principal;
use haocai_core::AppError;

/// Authentication outcome of one request.
///
/// Inserted by the auth middleware on every request that reaches a handler;
/// anonymous when no credential was presented or it did not check out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    principal: Option<Arc<Principal>>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(Arc::new(principal)),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

/// Extractor for handlers that need a principal; rejects with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Arc<Principal>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(|ctx| ctx.principal.clone())
            .map(Authenticated)
            .ok_or_else(AppError::unauthorized)
    }
}

/// Extractor for handlers that serve both anonymous and known callers.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Arc<Principal>>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthenticated(
            parts
                .extensions
                .get::<AuthContext>()
                .and_then(|ctx| ctx.principal.clone()),
        ))
    }
}
