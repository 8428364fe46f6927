use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::ApiPath;
use crate::database::models::Lead;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{Conversion, LeadService};
use crate::state::AppState;

/// POST /api/leads/:id/convert - Returns `{lead, customer}`; 409 if already converted or archived
pub async fn convert_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Conversion> {
    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::created(leads.convert(&user, id).await?))
}

/// POST /api/leads/:id/restore - Undo an archive
pub async fn restore_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Lead> {
    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.restore(&user, id).await?))
}
