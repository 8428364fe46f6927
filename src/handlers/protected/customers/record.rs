use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{Customer, CustomerUpdate};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CustomerService;
use crate::state::AppState;

fn service(state: &AppState) -> CustomerService {
    CustomerService::new(state.store.clone(), state.config.api.notes_preview)
}

/// GET /api/customers/:id - Full note history
pub async fn customer_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Customer> {
    Ok(ApiResponse::success(service(&state).get(&user, id).await?))
}

/// PATCH /api/customers/:id
pub async fn customer_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CustomerUpdate>,
) -> ApiResult<Customer> {
    body.validate()?;
    Ok(ApiResponse::success(service(&state).update(&user, id, body).await?))
}

/// DELETE /api/customers/:id - Permanent
pub async fn customer_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    service(&state).delete(&user, id).await?;
    Ok(ApiResponse::no_content())
}
