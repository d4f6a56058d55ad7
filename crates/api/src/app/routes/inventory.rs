use std::sync::Arc;

use axum::{
    Extension,
    extract::Path,
    http::Method,
};

use haocai_auth::{PolicyDescriptor, permissions::materials};
use haocai_core::{ApiResponse, AppResult, RequestId};

use crate::app::dto::{AdjustStockRequest, StockLevel};
use crate::app::routes::respond;
use crate::app::store::MaterialsStore;
use crate::authz::{RouteError, SecuredRoutes};
use crate::context::Authenticated;
use crate::errors::ValidJson;

pub fn routes() -> Result<SecuredRoutes, RouteError> {
    Ok(SecuredRoutes::new()
        .protected(
            Method::GET,
            "/api/inventory/:material_id",
            get_stock,
            PolicyDescriptor::requires(materials::INVENTORY_QUERY)?,
        )
        .protected(
            Method::POST,
            "/api/inventory/:material_id/adjust",
            adjust_stock,
            PolicyDescriptor::all([materials::INVENTORY_UPDATE, materials::INVENTORY_ADJUST])?,
        ))
}

pub async fn get_stock(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Path(material_id): Path<u64>,
) -> ApiResponse<StockLevel> {
    respond(store.stock(material_id).await, &request_id)
}

pub async fn adjust_stock(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Authenticated(principal): Authenticated,
    Path(material_id): Path<u64>,
    ValidJson(body): ValidJson<AdjustStockRequest>,
) -> AppResult<ApiResponse<StockLevel>> {
    let level = store.adjust_stock(material_id, body.delta).await?;
    tracing::info!(
        material_id,
        delta = body.delta,
        reason = body.reason.as_deref().unwrap_or(""),
        by = principal.subject(),
        "stock adjusted"
    );
    Ok(respond(level, &request_id))
}
