// handlers/public/auth/login.rs - POST /api/auth/login

use axum::extract::State;

use crate::api::{ApiJson, Validate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuthService, LoginRequest, LoginResponse};
use crate::state::AppState;

/// Authenticate with email and password.
///
/// Returns `{accessToken, refreshToken, expiresIn, user}`. Unknown emails,
/// wrong passwords and inactive accounts all answer 401 with the same message.
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    body.validate()?;

    let auth = AuthService::new(state.store.clone(), state.tokens.clone());
    let response = auth
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::success(response))
}
