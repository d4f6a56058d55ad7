//! `haocai-core`: transport-agnostic building blocks shared by every layer.
//! Error taxonomy, response envelope and request correlation ids.
//!
//! Nothing in here knows about HTTP unless the `axum` feature is enabled.

pub mod error;
pub mod id;
pub mod response;

#[cfg(feature = "axum")]
pub mod http;

pub use error::{
    AppError, AppResult, BUSINESS_CODE_FLOOR, ErrorKind, FieldError, SUCCESS_CODE, business,
    status_for_code,
};
pub use id::RequestId;
pub use response::ApiResponse;
