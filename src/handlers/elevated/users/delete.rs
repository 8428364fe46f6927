use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::ApiPath;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::state::AppState;

/// DELETE /api/auth/users/:id - Soft delete; owned records keep pointing at the user
pub async fn user_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    let users = UserService::new(state.store.clone());
    users.deactivate(&user, id).await?;
    Ok(ApiResponse::no_content())
}
