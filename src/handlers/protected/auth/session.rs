use axum::extract::{Extension, State};

use crate::api::{ApiJson, Validate};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AuthService, RefreshRequest};
use crate::state::AppState;

/// GET /api/auth/me - The caller's own account
pub async fn me_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<User> {
    let auth = AuthService::new(state.store.clone(), state.tokens.clone());
    Ok(ApiResponse::success(auth.me(&user).await?))
}

/// POST /api/auth/logout - Revoke the given refresh token
pub async fn logout_post(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<()> {
    body.validate()?;

    let auth = AuthService::new(state.store.clone(), state.tokens.clone());
    auth.logout(body.refresh_token.as_deref().unwrap_or_default()).await?;

    Ok(ApiResponse::no_content())
}
