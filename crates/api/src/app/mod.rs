//! HTTP application wiring.
//!
//! - `secure`: wraps any set of [`SecuredRoutes`] in the request pipeline
//! - `routes/`: the materials endpoints, one file per area
//! - `dto.rs`: request/response bodies and their validation
//! - `store.rs`: in-memory backing data for the routes

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Router,
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use haocai_auth::{CredentialVerifier, IdentityLoader, TokenIssuer, TokenService};

use crate::authz::{RouteError, SecuredRoutes};
use crate::config::ApiConfig;
use crate::errors;
use crate::middleware::{self, AuthState, Deadline};

pub mod dto;
pub mod routes;
pub mod store;

/// Collaborators of the password login endpoint.
#[derive(Clone)]
pub struct Login {
    pub issuer: Arc<dyn TokenIssuer>,
    pub credentials: Arc<dyn CredentialVerifier>,
}

/// Collaborators and limits shared by the whole pipeline.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<dyn TokenService>,
    pub identities: Arc<dyn IdentityLoader>,
    pub auth_timeout: Duration,
    pub request_timeout: Duration,
    /// `POST /api/auth/login` is only routed when set.
    pub login: Option<Login>,
}

impl AppState {
    /// State with the default timeouts.
    pub fn new(tokens: Arc<dyn TokenService>, identities: Arc<dyn IdentityLoader>) -> Self {
        let defaults = ApiConfig::default();
        Self {
            tokens,
            identities,
            auth_timeout: defaults.auth_timeout,
            request_timeout: defaults.request_timeout,
            login: None,
        }
    }

    pub fn from_config(
        tokens: Arc<dyn TokenService>,
        identities: Arc<dyn IdentityLoader>,
        config: &ApiConfig,
    ) -> Self {
        Self {
            auth_timeout: config.auth_timeout,
            request_timeout: config.request_timeout,
            ..Self::new(tokens, identities)
        }
    }

    pub fn with_timeouts(mut self, auth_timeout: Duration, request_timeout: Duration) -> Self {
        self.auth_timeout = auth_timeout;
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_login(
        mut self,
        issuer: Arc<dyn TokenIssuer>,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        self.login = Some(Login { issuer, credentials });
        self
    }
}

/// Compose the request pipeline around `routes`.
///
/// Outermost first: tracing, request id, error normalization, panic
/// capture, deadline, authentication, then routing with the policy guard on
/// each protected route. Unknown paths hit the NotFound fallback.
pub fn secure(routes: SecuredRoutes, state: &AppState) -> Result<Router, RouteError> {
    let (router, policies) = routes.build()?;
    tracing::info!(protected = policies.len(), "policy registry built");

    let auth = AuthState {
        tokens: state.tokens.clone(),
        identities: state.identities.clone(),
        timeout: state.auth_timeout,
    };

    Ok(router
        .fallback(errors::fallback)
        .layer(from_fn_with_state(auth, middleware::auth_middleware))
        .layer(from_fn_with_state(
            Deadline(state.request_timeout),
            middleware::deadline_middleware,
        ))
        .layer(CatchPanicLayer::custom(errors::handle_panic))
        .layer(from_fn(errors::normalize_error_response))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http()))
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Result<Router, RouteError> {
    let store = Arc::new(store::MaterialsStore::default());
    let mut routes = routes::all()?;
    if state.login.is_some() {
        routes = routes.merge(routes::auth::routes());
    } else {
        tracing::warn!("no credential verifier configured; login is not routed");
    }

    let mut app = secure(routes, &state)?.layer(Extension(store));
    if let Some(login) = state.login {
        app = app.layer(Extension(login));
    }
    Ok(app)
}
