use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{Lead, LeadUpdate};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::LeadService;
use crate::state::AppState;

/// GET /api/leads/:id
pub async fn lead_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Lead> {
    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.get(&user, id).await?))
}

/// PATCH /api/leads/:id - Field edits and status changes
pub async fn lead_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<LeadUpdate>,
) -> ApiResult<Lead> {
    body.validate()?;

    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.update(&user, id, body).await?))
}

/// DELETE /api/leads/:id - Archives the lead and returns it
pub async fn lead_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Lead> {
    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.archive(&user, id).await?))
}
