//! Request pipeline middleware: correlation ids, authentication and the
//! per-request deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use haocai_auth::{IdentityError, IdentityLoader, TokenService};
use haocai_core::{AppError, RequestId};

use crate::context::AuthContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenService>,
    pub identities: Arc<dyn IdentityLoader>,
    /// Upper bound on identity resolution.
    pub timeout: Duration,
}

/// Fail-open authentication.
///
/// Every request continues with an [`AuthContext`] attached; a missing,
/// malformed, expired or unresolvable credential only means the context is
/// anonymous. The one exception is an identity lookup that outlives
/// `timeout`, which ends the request with a Timeout envelope.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = match authenticate(&state, req.headers()).await {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

async fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let Some(token) = extract_bearer(headers) else {
        tracing::debug!("no bearer credential, continuing anonymously");
        return Ok(AuthContext::anonymous());
    };

    if !state.tokens.validate(token) {
        tracing::warn!("rejected bearer credential, continuing anonymously");
        return Ok(AuthContext::anonymous());
    }

    let subject = match state.tokens.subject(token) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::warn!(error = %e, "bearer credential has no usable subject");
            return Ok(AuthContext::anonymous());
        }
    };

    match tokio::time::timeout(state.timeout, state.identities.resolve(&subject)).await {
        Err(_elapsed) => {
            tracing::warn!(%subject, timeout = ?state.timeout, "identity resolution timed out");
            Err(AppError::timeout().with_detail(format!("identity resolution for '{subject}' timed out")))
        }
        Ok(Err(e @ IdentityError::Backend(_))) => {
            tracing::error!(%subject, error = %e, "identity backend failed, continuing anonymously");
            Ok(AuthContext::anonymous())
        }
        Ok(Err(e)) => {
            tracing::warn!(%subject, error = %e, "identity not resolved, continuing anonymously");
            Ok(AuthContext::anonymous())
        }
        Ok(Ok(principal)) => {
            tracing::debug!(%subject, permissions = principal.permissions().len(), "authenticated");
            Ok(AuthContext::authenticated(principal))
        }
    }
}

/// Token from `Authorization: Bearer <token>`, if there is a non-empty one.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Echo a usable caller `x-request-id` or mint one; expose it to handlers as
/// an extension, to logs as a span field and to the caller as a header.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<RequestId>().ok())
        .unwrap_or_else(RequestId::generate);

    req.extensions_mut().insert(id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut resp = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

/// Whole-request time limit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub Duration);

/// Abandon the rest of the pipeline once the deadline passes.
pub async fn deadline_middleware(
    State(Deadline(limit)): State<Deadline>,
    req: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(resp) => resp,
        Err(_elapsed) => AppError::timeout()
            .with_detail(format!("request exceeded {limit:?}"))
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Extension,
    };
    use async_trait::async_trait;
    use tower::ServiceExt;

    use haocai_auth::{Hs256TokenService, Principal, TokenError};

    use super::*;

    struct StaticTokens;

    impl TokenService for StaticTokens {
        fn validate(&self, token: &str) -> bool {
            token.starts_with("good-")
        }

        fn subject(&self, token: &str) -> Result<String, TokenError> {
            token
                .strip_prefix("good-")
                .map(str::to_string)
                .ok_or(TokenError::MissingSubject)
        }
    }

    struct Loader;

    #[async_trait]
    impl IdentityLoader for Loader {
        async fn resolve(&self, subject: &str) -> Result<Principal, IdentityError> {
            match subject {
                "alice" => Ok(Principal::new("alice").with_permissions(["supplier:query"])),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Principal::new("slow"))
                }
                "broken" => Err(IdentityError::Backend("db down".into())),
                other => Err(IdentityError::NotFound(other.to_string())),
            }
        }
    }

    async fn who(Extension(ctx): Extension<AuthContext>) -> String {
        ctx.principal()
            .map(|p| p.subject().to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app() -> Router {
        let state = AuthState {
            tokens: Arc::new(StaticTokens),
            identities: Arc::new(Loader),
            timeout: Duration::from_millis(50),
        };
        Router::new()
            .route("/who", get(who))
            .layer(from_fn_with_state(state, auth_middleware))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/who");
        if let Some(v) = auth {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let resp = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_attaches_principal() {
        assert_eq!(call(app(), Some("Bearer good-alice")).await, (StatusCode::OK, "alice".into()));
    }

    #[tokio::test]
    async fn every_failure_mode_continues_anonymously() {
        for auth in [
            None,
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer "),
            Some("Bearer bad-token"),
            Some("Bearer good-nobody"),
            Some("Bearer good-broken"),
        ] {
            assert_eq!(
                call(app(), auth).await,
                (StatusCode::OK, "anonymous".into()),
                "auth header {auth:?}"
            );
        }
    }

    #[tokio::test]
    async fn slow_identity_lookup_times_out() {
        let (status, body) = call(app(), Some("Bearer good-slow")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["code"], 408);
    }

    #[tokio::test]
    async fn real_jwt_round_trip() {
        let tokens = Hs256TokenService::new(b"k", chrono::Duration::minutes(5), "haocai");
        let jwt = tokens.issue("alice", Vec::new()).unwrap();
        let state = AuthState {
            tokens: Arc::new(tokens),
            identities: Arc::new(Loader),
            timeout: Duration::from_secs(1),
        };
        let app = Router::new()
            .route("/who", get(who))
            .layer(from_fn_with_state(state, auth_middleware));

        let header = format!("Bearer {jwt}");
        assert_eq!(call(app, Some(&header)).await.1, "alice");
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  abc "));
        assert_eq!(extract_bearer(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[tokio::test]
    async fn request_id_is_echoed_or_generated() {
        let app = Router::new()
            .route("/", get(|Extension(id): Extension<RequestId>| async move { id.to_string() }))
            .layer(from_fn(request_id_middleware));

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/").header(REQUEST_ID_HEADER, "trace-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], "trace-1");

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!resp.headers()[REQUEST_ID_HEADER].is_empty());
    }

    #[tokio::test]
    async fn deadline_cuts_off_slow_handlers() {
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(from_fn_with_state(Deadline(Duration::from_millis(20)), deadline_middleware));

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
