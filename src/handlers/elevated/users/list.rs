use axum::extract::State;
use serde::Deserialize;

use crate::api::{parse_param, ApiQuery, Page};
use crate::database::models::{User, UserFilter};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

/// GET /api/auth/users
pub async fn users_get(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Page<User>> {
    let filter = UserFilter {
        role: parse_param("role", query.role.as_deref())?,
        active: query.active,
    };
    let page = state.pagination(query.page, query.limit);

    let users = UserService::new(state.store.clone());
    Ok(ApiResponse::success(users.list(&filter, page).await?))
}
