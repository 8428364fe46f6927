use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{parse_param, ApiJson, ApiQuery, Page, Validate};
use crate::database::models::{Lead, LeadFilter, NewLead};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::LeadService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub source: Option<String>,
    /// Case-insensitive substring of name, email or company
    pub q: Option<String>,
    /// `true` includes archived leads
    pub archived: Option<bool>,
    /// Admin only; ignored for agents
    pub assigned_agent: Option<Uuid>,
}

/// GET /api/leads - Newest first, archived leads hidden unless `archived=true`
pub async fn leads_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<LeadListQuery>,
) -> ApiResult<Page<Lead>> {
    let filter = LeadFilter {
        owner: query.assigned_agent,
        status: parse_param("status", query.status.as_deref())?,
        source: query.source.filter(|s| !s.trim().is_empty()),
        search: query.q.filter(|q| !q.trim().is_empty()),
        include_archived: query.archived.unwrap_or(false),
    };
    let page = state.pagination(query.page, query.limit);

    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::success(leads.list(&user, filter, page).await?))
}

/// POST /api/leads - Agents always own the leads they create
pub async fn leads_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewLead>,
) -> ApiResult<Lead> {
    body.validate()?;

    let leads = LeadService::new(state.store.clone());
    Ok(ApiResponse::created(leads.create(&user, body).await?))
}
