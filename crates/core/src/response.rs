//! Uniform response envelope.
//!
//! Every outward-facing result, success or failure, is an [`ApiResponse`].
//! Wire shape: `{ code, message, data, timestamp, requestId }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, ErrorKind, SUCCESS_CODE, status_for_code};

const SUCCESS_MESSAGE: &str = "success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    code: u32,
    message: String,
    data: Option<T>,
    timestamp: DateTime<Utc>,
    request_id: Option<String>,
}

impl<T> ApiResponse<T> {
    fn build(code: u32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            timestamp: Utc::now(),
            request_id: None,
        }
    }

    pub fn success(data: T) -> Self {
        Self::build(SUCCESS_CODE, SUCCESS_MESSAGE, Some(data))
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self::build(SUCCESS_CODE, message, Some(data))
    }

    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::build(code, message, None)
    }

    /// Error envelope with the `SystemError` code.
    pub fn error_message(message: impl Into<String>) -> Self {
        Self::build(ErrorKind::System.code(), message, None)
    }

    /// Error envelope carrying a diagnostic payload.
    pub fn error_with_data(code: u32, message: impl Into<String>, data: T) -> Self {
        Self::build(code, message, Some(data))
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// HTTP status consistent with `code`.
    pub fn status(&self) -> u16 {
        status_for_code(self.code)
    }
}

impl ApiResponse<()> {
    /// Success without data.
    pub fn ok() -> Self {
        Self::build(SUCCESS_CODE, SUCCESS_MESSAGE, None)
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self::build(SUCCESS_CODE, message, None)
    }
}

impl ApiResponse<Value> {
    /// Render an error into its envelope.
    ///
    /// Uses the public message, so internal detail never reaches the body.
    pub fn from_error(err: &AppError) -> Self {
        Self::build(err.code(), err.public_message(), err.data().cloned())
    }
}
