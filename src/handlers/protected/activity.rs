use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{parse_param, ApiQuery, FieldError};
use crate::database::models::{Activity, EntityType};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ActivityService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
}

/// GET /api/activity - Most recent first; `entityType` and `entityId` narrow to one record
pub async fn activity_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Vec<Activity>> {
    let entity_type: Option<EntityType> = parse_param("entityType", query.entity_type.as_deref())?;
    let entity = match (entity_type, query.entity_id) {
        (Some(kind), Some(id)) => Some((kind, id)),
        (None, None) => None,
        _ => {
            return Err(vec![FieldError::new(
                "entityType",
                "entityType and entityId must be given together",
            )]
            .into())
        }
    };

    let api = &state.config.api;
    let feed = ActivityService::new(state.store.clone(), api.activity_default_limit, api.activity_max_limit);
    Ok(ApiResponse::success(feed.feed(&user, entity, query.limit).await?))
}
