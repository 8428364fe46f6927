// handlers/public/auth/refresh.rs - POST /api/auth/refresh

use axum::extract::State;

use crate::api::{ApiJson, Validate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuthService, RefreshRequest, TokenPair};
use crate::state::AppState;

/// Exchange a refresh token for a new access/refresh pair. The presented
/// refresh token is revoked on success.
pub async fn refresh_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<TokenPair> {
    body.validate()?;

    let auth = AuthService::new(state.store.clone(), state.tokens.clone());
    let tokens = auth.refresh(body.refresh_token.as_deref().unwrap_or_default()).await?;

    Ok(ApiResponse::success(tokens))
}
