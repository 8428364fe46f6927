use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{Lead, ReassignLead};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::LeadService;
use crate::state::AppState;

/// POST /api/leads/:id/reassign - Hands the lead to another active user
pub async fn reassign_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReassignLead>,
) -> ApiResult<Lead> {
    body.validate()?;
    let agent = body
        .assigned_agent
        .ok_or_else(|| ApiError::bad_request("assignedAgent is required"))?;

    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.reassign(&user, id, agent).await?))
}
