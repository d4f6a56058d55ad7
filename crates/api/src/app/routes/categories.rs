use std::sync::Arc;

use axum::{Extension, http::Method};

use haocai_auth::{PolicyDescriptor, permissions::materials};
use haocai_core::{ApiResponse, AppResult, RequestId};

use crate::app::dto::{Category, CreateCategoryRequest};
use crate::app::routes::respond;
use crate::app::store::MaterialsStore;
use crate::authz::{RouteError, SecuredRoutes};
use crate::errors::ValidJson;

pub fn routes() -> Result<SecuredRoutes, RouteError> {
    Ok(SecuredRoutes::new()
        .protected(
            Method::GET,
            "/api/categories",
            list_categories,
            // Anyone who may create categories may also see them.
            PolicyDescriptor::any([materials::CATEGORY_QUERY, materials::CATEGORY_CREATE])?,
        )
        .protected(
            Method::POST,
            "/api/categories",
            create_category,
            PolicyDescriptor::requires(materials::CATEGORY_CREATE)?,
        ))
}

pub async fn list_categories(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResponse<Vec<Category>> {
    respond(store.list_categories().await, &request_id)
}

pub async fn create_category(
    Extension(store): Extension<Arc<MaterialsStore>>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(body): ValidJson<CreateCategoryRequest>,
) -> AppResult<ApiResponse<Category>> {
    let category = store.create_category(body).await?;
    tracing::info!(category_id = category.id, "category created");
    Ok(respond(category, &request_id))
}
