use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{User, UserUpdate};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::state::AppState;

/// PATCH /api/auth/users/:id - Deactivating or resetting the password ends the user's sessions
pub async fn user_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<User> {
    body.validate()?;

    let users = UserService::new(state.store.clone());
    Ok(ApiResponse::success(users.update(&user, id, body).await?))
}
