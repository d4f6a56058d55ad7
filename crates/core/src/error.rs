//! Error taxonomy.
//!
//! Every failure that reaches a caller is an [`AppError`]: a closed
//! [`ErrorKind`] with a stable numeric code, a caller-safe message, an optional
//! data payload and an internal `detail` that is logged but never rendered.

use core::fmt;

use serde_json::Value;
use thiserror::Error;

/// Code carried by every successful envelope.
pub const SUCCESS_CODE: u32 = 200;

/// Codes at or above this value are business-specific sub-kinds.
///
/// They always classify as HTTP 400 regardless of the exact value, so domain
/// code can mint fine-grained codes without the mapper knowing them.
pub const BUSINESS_CODE_FLOOR: u32 = 10_000;

/// Result type used across the service layers.
pub type AppResult<T> = Result<T, AppError>;

/// Why an operation failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No valid authenticated principal.
    Unauthorized,
    /// Authenticated but insufficient permission.
    Forbidden,
    /// Target resource absent.
    NotFound,
    /// Operation not supported for resource.
    MethodNotAllowed,
    /// Upstream/processing exceeded its deadline.
    Timeout,
    /// Unique-key or optimistic-concurrency conflict.
    Conflict,
    /// Malformed or semantically invalid input.
    Validation,
    /// Business rule violation with a code `>= BUSINESS_CODE_FLOOR`.
    Business(u32),
    /// Unclassified internal failure.
    System,
    /// Dependency temporarily down.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Keep `Business` inside its range.
    ///
    /// A business code below [`BUSINESS_CODE_FLOOR`] would collide with the
    /// fixed table (or with `SUCCESS_CODE`); it is reclassified by
    /// [`from_code`](Self::from_code) when it names an HTTP error code and as
    /// `Validation` otherwise.
    pub const fn normalized(self) -> Self {
        match self {
            Self::Business(code) if code < BUSINESS_CODE_FLOOR => match code {
                400..=599 => Self::from_code(code),
                _ => Self::Validation,
            },
            kind => kind,
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Timeout => 408,
            Self::Conflict => 409,
            Self::Validation => 400,
            Self::Business(code) => code,
            Self::System => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unauthorized => "认证失败，请重新登录",
            Self::Forbidden => "权限不足",
            Self::NotFound => "请求的资源不存在",
            Self::MethodNotAllowed => "请求方法不支持",
            Self::Timeout => "请求超时，请稍后重试",
            Self::Conflict => "数据已存在，请使用其他值",
            Self::Validation => "参数验证失败",
            Self::Business(_) => "业务处理失败",
            Self::System => "系统内部错误",
            Self::ServiceUnavailable => "服务暂不可用，请稍后重试",
        }
    }

    /// Recover a kind from a wire code.
    ///
    /// Unknown 4xx codes fall back to `Validation`, everything else that is
    /// not a known code falls back to `System`.
    pub const fn from_code(code: u32) -> Self {
        match code {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            408 => Self::Timeout,
            409 => Self::Conflict,
            503 => Self::ServiceUnavailable,
            c if c >= BUSINESS_CODE_FLOOR => Self::Business(c),
            400..=499 => Self::Validation,
            _ => Self::System,
        }
    }

    /// HTTP status this kind is transported with.
    pub const fn status(self) -> u16 {
        status_for_code(self.code())
    }

    /// Whether this kind signals a server-side fault (5xx).
    pub const fn is_server_fault(self) -> bool {
        self.status() >= 500
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Forbidden => f.write_str("forbidden"),
            Self::NotFound => f.write_str("not_found"),
            Self::MethodNotAllowed => f.write_str("method_not_allowed"),
            Self::Timeout => f.write_str("timeout"),
            Self::Conflict => f.write_str("conflict"),
            Self::Validation => f.write_str("validation_error"),
            Self::Business(code) => write!(f, "business_{code}"),
            Self::System => f.write_str("system_error"),
            Self::ServiceUnavailable => f.write_str("service_unavailable"),
        }
    }
}

/// HTTP status classification of an envelope code.
///
/// The body `code` and the transport status are always derived through this
/// function, so callers can rely on either.
pub const fn status_for_code(code: u32) -> u16 {
    if code == SUCCESS_CODE {
        200
    } else if code >= BUSINESS_CODE_FLOOR {
        400
    } else if code >= 400 && code <= 599 {
        code as u16
    } else {
        500
    }
}

/// A single input-binding violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A classified failure on its way to becoming exactly one error envelope.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} ({code}): {message}", code = .kind.code())]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    data: Option<Value>,
    detail: Option<String>,
}

impl AppError {
    /// Error of `kind` with its default message.
    pub fn new(kind: ErrorKind) -> Self {
        let kind = kind.normalized();
        Self::with_message(kind, kind.default_message())
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: kind.normalized(),
            message: message.into(),
            data: None,
            detail: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Conflict, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Validation, message)
    }

    /// Flatten several field violations into one `Validation` error.
    ///
    /// The message is the comma-joined `"field: message"` list; an empty
    /// iterator yields the default validation message.
    pub fn invalid_fields<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = FieldError>,
    {
        let joined = errors
            .into_iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if joined.is_empty() {
            Self::new(ErrorKind::Validation)
        } else {
            Self::validation(joined)
        }
    }

    /// Business rule violation. Codes below `BUSINESS_CODE_FLOOR` are
    /// reclassified, see [`ErrorKind::normalized`].
    pub fn business(code: u32, message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Business(code), message)
    }

    /// Internal failure. `detail` is logged, the caller sees the generic text.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::System).with_detail(detail)
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable).with_detail(detail)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Message that is safe to put on the wire.
    ///
    /// System faults never echo anything but the generic text.
    pub fn public_message(&self) -> &str {
        match self.kind {
            ErrorKind::System => ErrorKind::System.default_message(),
            _ => &self.message,
        }
    }
}

impl From<ErrorKind> for AppError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("json: {err}"))
    }
}

/// Business codes used by the materials domain.
///
/// All codes sit above [`BUSINESS_CODE_FLOOR`] and therefore map to HTTP 400.
pub mod business {
    pub const USER_NOT_FOUND: u32 = 10_001;
    pub const USER_DISABLED: u32 = 10_002;
    pub const USERNAME_EXISTS: u32 = 10_003;
    pub const PASSWORD_ERROR: u32 = 10_006;
    pub const PARAM_ERROR: u32 = 10_009;
    pub const DATA_NOT_FOUND: u32 = 10_010;
    pub const USER_LOCKED: u32 = 10_014;
    pub const OPERATION_FAILED: u32 = 10_015;
    pub const SUPPLIER_EXISTS: u32 = 12_001;
    pub const CATEGORY_EXISTS: u32 = 13_001;
    pub const STOCK_INSUFFICIENT: u32 = 14_001;
}
