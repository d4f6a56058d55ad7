use haocai_core::{ApiResponse, RequestId};

use crate::authz::{RouteError, SecuredRoutes};

pub mod auth;
pub mod categories;
pub mod inventory;
pub mod suppliers;
pub mod system;

/// Every route of the materials API, with its policy.
pub fn all() -> Result<SecuredRoutes, RouteError> {
    Ok(system::routes()
        .merge(categories::routes()?)
        .merge(suppliers::routes()?)
        .merge(inventory::routes()?))
}

/// Success envelope correlated with the current request.
pub(crate) fn respond<T>(data: T, request_id: &RequestId) -> ApiResponse<T> {
    ApiResponse::success(data).with_request_id(request_id.as_str())
}
