//! HTTP rendering of envelopes and errors (axum).
//!
//! This is the terminal step of failure mapping: an [`AppError`] becomes
//! exactly one JSON envelope whose transport status agrees with its `code`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};
use crate::response::ApiResponse;

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (status_code(self.status()), Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::System => tracing::error!(
                code = self.code(),
                detail = self.detail().unwrap_or(self.message()),
                "request failed with internal error"
            ),
            kind if kind.is_server_fault() => tracing::error!(
                code = self.code(),
                message = self.message(),
                detail = self.detail(),
                "request failed"
            ),
            _ => tracing::warn!(
                code = self.code(),
                message = self.message(),
                "request rejected"
            ),
        }

        ApiResponse::from_error(&self).into_response()
    }
}
