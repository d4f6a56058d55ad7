use std::sync::Arc;

use axum::{
    Extension,
    extract::Path,
    http::Method,
};

use haocai_auth::{PolicyDescriptor, permissions::materials};
use haocai_core::{ApiResponse, AppResult, RequestId};

use crate::app::dto::{CreateSupplierRequest, Supplier};
use crate::app::routes::respond;
use crate::app::store::MaterialsStore;
use crate::authz::{RouteError, SecuredRoutes};
use crate::context::Authenticated;
use crate::errors::ValidJson;

pub fn routes() -> Result<SecuredRoutes, RouteError> {
    Ok(SecuredRoutes::new()
        .protected(
            Method::GET,
            "/api/suppliers",
            list_suppliers,
            PolicyDescriptor::requires(materials::SUPPLIER_QUERY)?,
        )
        .protected(
            Method::POST,
            "/api/suppliers",
            create_supplier,
            PolicyDescriptor::requires(materials::SUPPLIER_CREATE)?,
        )
        .protected(
            Method::GET,
            "/api/suppliers/:id",
            get_supplier,
            PolicyDescriptor::requires(materials::SUPPLIER_QUERY)?,
        )
        .protected(
            Method::PUT,
            "/api/suppliers/:id",
            update_supplier,
            PolicyDescriptor::requires(materials::SUPPLIER_UPDATE)?,
        )
        .protected(
            Method::DELETE,
            "/api/suppliers/:id",
            delete_supplier,
            PolicyDescriptor::requires(materials::SUPPLIER_DELETE)?,
        ))
}

pub async fn list_suppliers(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResponse<Vec<Supplier>> {
    respond(store.list_suppliers().await, &request_id)
}

pub async fn get_supplier(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<u64>,
) -> AppResult<ApiResponse<Supplier>> {
    Ok(respond(store.get_supplier(id).await?, &request_id))
}

pub async fn create_supplier(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Authenticated(principal): Authenticated,
    ValidJson(body): ValidJson<CreateSupplierRequest>,
) -> AppResult<ApiResponse<Supplier>> {
    let supplier = store.create_supplier(body).await?;
    tracing::info!(supplier_id = supplier.id, by = principal.subject(), "supplier created");
    Ok(respond(supplier, &request_id))
}

pub async fn update_supplier(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<u64>,
    ValidJson(body): ValidJson<CreateSupplierRequest>,
) -> AppResult<ApiResponse<Supplier>> {
    Ok(respond(store.update_supplier(id, body).await?, &request_id))
}

pub async fn delete_supplier(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    Authenticated(principal): Authenticated,
    Path(id): Path<u64>,
) -> AppResult<ApiResponse<()>> {
    store.delete_supplier(id).await?;
    tracing::info!(supplier_id = id, by = principal.subject(), "supplier deleted");
    Ok(ApiResponse::ok_with_message("删除成功").with_request_id(request_id.as_str()))
}
