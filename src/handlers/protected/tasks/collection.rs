use axum::extract::{Extension, State};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{parse_param, ApiJson, ApiQuery, FieldError, Page, Validate};
use crate::database::models::{NewTask, RelatedRef, RelatedType, TaskFilter, TaskView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::TaskService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub related_type: Option<String>,
    pub related_id: Option<Uuid>,
    /// `true` keeps only open tasks whose due date has passed
    pub overdue: Option<bool>,
    pub owner: Option<Uuid>,
}

impl TaskListQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        let related_type: Option<RelatedType> = parse_param("relatedType", self.related_type.as_deref())?;
        let related = match (related_type, self.related_id) {
            (Some(kind), Some(id)) => Some(RelatedRef::new(kind, id)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(vec![FieldError::new("relatedId", "relatedId is required with relatedType")].into())
            }
            (None, Some(_)) => {
                return Err(vec![FieldError::new("relatedType", "relatedType is required with relatedId")].into())
            }
        };

        Ok(TaskFilter {
            owner: self.owner,
            status: parse_param("status", self.status.as_deref())?,
            priority: parse_param("priority", self.priority.as_deref())?,
            related,
            overdue_at: self.overdue.unwrap_or(false).then(Utc::now),
        })
    }
}

/// GET /api/tasks - Newest first, each task flagged `overdue` at read time
pub async fn tasks_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Page<TaskView>> {
    let page = state.pagination(query.page, query.limit);
    let filter = query.into_filter()?;

    let tasks = TaskService::new(state.store.clone());
    Ok(ApiResponse::success(tasks.list(&user, filter, page).await?))
}

/// POST /api/tasks
pub async fn tasks_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewTask>,
) -> ApiResult<TaskView> {
    body.validate()?;

    let tasks = TaskService::new(state.store.clone());
    Ok(ApiResponse::created(tasks.create(&user, body).await?))
}
