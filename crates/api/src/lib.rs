//! HTTP API: the request security pipeline wired into axum, plus a thin
//! materials surface that exercises it.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod errors;
pub mod middleware;
