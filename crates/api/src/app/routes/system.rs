use axum::{Extension, http::Method};
use serde_json::{Value, json};

use haocai_core::{ApiResponse, RequestId};

use crate::app::dto::WhoAmI;
use crate::app::routes::respond;
use crate::authz::SecuredRoutes;
use crate::context::MaybeAuthenticated;

pub fn routes() -> SecuredRoutes {
    SecuredRoutes::new()
        .public(Method::GET, "/health", health)
        .public(Method::GET, "/api/whoami", whoami)
}

pub async fn health(Extension(request_id): Extension<RequestId>) -> ApiResponse<Value> {
    respond(json!({ "status": "UP" }), &request_id)
}

/// Public, so callers can see what (if anything) their credential resolved to.
pub async fn whoami(
    Extension(request_id): Extension<RequestId>,
    MaybeAuthenticated(principal): MaybeAuthenticated,
) -> ApiResponse<WhoAmI> {
    respond(WhoAmI::from_principal(principal.as_deref()), &request_id)
}
