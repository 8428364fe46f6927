use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{TaskUpdate, TaskView};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::TaskService;
use crate::state::AppState;

/// GET /api/tasks/:id
pub async fn task_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<TaskView> {
    let tasks = TaskService::new(state.store.clone());
    Ok(ApiResponse::success(tasks.get(&user, id).await?))
}

/// PATCH /api/tasks/:id - Moving to `done` is logged as a completion
pub async fn task_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<TaskUpdate>,
) -> ApiResult<TaskView> {
    body.validate()?;

    let tasks = TaskService::new(state.store.clone());
    Ok(ApiResponse::success(tasks.update(&user, id, body).await?))
}

/// DELETE /api/tasks/:id
pub async fn task_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    let tasks = TaskService::new(state.store.clone());
    tasks.delete(&user, id).await?;
    Ok(ApiResponse::no_content())
}
