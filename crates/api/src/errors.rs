//! Boundary failure mapping.
//!
//! `AppError` itself renders through `IntoResponse` (in `haocai-core`); the
//! pieces here catch what never becomes an `AppError` on its own: panics,
//! unknown routes, body rejections and bare error responses produced by the
//! router or by layers below this one.

use std::any::Any;

use axum::{
    Json,
    body::Body,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use haocai_core::{ApiResponse, AppError, ErrorKind, FieldError, RequestId};

/// Largest error body the normalizer will buffer to stamp a request id.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Panic handler for `CatchPanicLayer::custom`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    AppError::internal(format!("handler panicked: {detail}")).into_response()
}

/// Router fallback for unknown paths.
pub async fn fallback(uri: Uri) -> AppError {
    AppError::new(ErrorKind::NotFound).with_detail(format!("no route for {uri}"))
}

/// Make every error response an envelope.
///
/// Bare error responses (the router's 405, extractor rejections, anything
/// without a JSON body) are replaced with the envelope of the matching kind.
/// JSON envelopes get the request's correlation id filled in. Non-error
/// responses pass through untouched.
pub async fn normalize_error_response(req: Request, next: Next) -> Response {
    let request_id = req.extensions().get::<RequestId>().cloned();
    let resp = next.run(req).await;

    let status = resp.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return resp;
    }

    if is_json(resp.headers()) {
        match request_id {
            Some(id) => stamp_request_id(resp, &id).await,
            None => resp,
        }
    } else {
        let (parts, _body) = resp.into_parts();
        let mut envelope = bare_error_envelope(status);
        if let Some(id) = &request_id {
            envelope = envelope.with_request_id(id.as_str());
        }
        tracing::debug!(status = status.as_u16(), "replaced bare error response with envelope");

        let mut out = envelope.into_response();
        for (name, value) in parts.headers.iter() {
            if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
                out.headers_mut().append(name.clone(), value.clone());
            }
        }
        out
    }
}

fn bare_error_envelope(status: StatusCode) -> ApiResponse<()> {
    let code = u32::from(status.as_u16());
    let kind = ErrorKind::from_code(code);
    let message = if kind.code() == code {
        kind.default_message()
    } else {
        status.canonical_reason().unwrap_or(kind.default_message())
    };
    ApiResponse::error(code, message)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

async fn stamp_request_id(resp: Response, id: &RequestId) -> Response {
    let (mut parts, body) = resp.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "error body unreadable, replacing with envelope");
            return bare_error_envelope(parts.status)
                .with_request_id(id.as_str())
                .into_response();
        }
    };

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut obj)) if obj.get("requestId").is_some_and(Value::is_null) => {
            obj.insert("requestId".to_string(), Value::String(id.to_string()));
            match serde_json::to_vec(&obj) {
                Ok(v) => Body::from(v),
                Err(_) => Body::from(bytes),
            }
        }
        _ => Body::from(bytes),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, body)
}

/// Field-level validation for request bodies.
pub trait Validate {
    /// Every violation, in field order; empty when the value is acceptable.
    fn validate(&self) -> Vec<FieldError>;
}

/// JSON body extractor that maps both decode failures and field violations
/// to a single `Validation` error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::validation(rejection.body_text()))?;

        let violations = value.validate();
        if !violations.is_empty() {
            return Err(AppError::invalid_fields(violations));
        }
        Ok(Self(value))
    }
}
