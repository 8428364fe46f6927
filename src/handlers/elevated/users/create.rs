use axum::extract::{Extension, State};

use crate::api::{ApiJson, Validate};
use crate::database::models::{NewUser, User};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;
use crate::state::AppState;

/// POST /api/auth/register - Admins create accounts; there is no self sign-up
pub async fn register_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<User> {
    body.validate()?;

    let users = UserService::new(state.store.clone());
    Ok(ApiResponse::created(users.register(&user, body).await?))
}
