use axum::extract::State;
use uuid::Uuid;

use crate::api::ApiPath;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;
use crate::state::AppState;

/// GET /api/auth/users/:id
pub async fn user_get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<User> {
    let users = UserService::new(state.store.clone());
    Ok(ApiResponse::success(users.get(id).await?))
}
