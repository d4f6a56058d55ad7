use axum::{Extension, http::Method};

use haocai_core::{ApiResponse, AppError, AppResult, RequestId};

use crate::app::Login;
use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::routes::respond;
use crate::authz::SecuredRoutes;
use crate::errors::ValidJson;

pub fn routes() -> SecuredRoutes {
    SecuredRoutes::new().public(Method::POST, "/api/auth/login", login)
}

/// Exchange a username and password for a bearer token.
pub async fn login(
    Extension(login): Extension<Login>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let username = req.username.trim();
    let principal = match login.credentials.verify(username, &req.password).await {
        Ok(principal) => principal,
        Err(err) => {
            tracing::info!(username, reason = %err, "login rejected");
            return Err(err.into());
        }
    };

    let roles: Vec<_> = principal.roles().iter().cloned().collect();
    let issued = login
        .issuer
        .issue_for(principal.subject(), roles)
        .map_err(|e| AppError::internal(e.to_string()))?;
    tracing::info!(username = principal.subject(), "login succeeded");

    Ok(respond(
        LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            username: principal.subject().to_string(),
            roles: principal.roles().iter().map(|r| r.as_str().to_string()).collect(),
        },
        &request_id,
    ))
}
