use axum::extract::{Extension, State};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{Dashboard, DashboardService};
use crate::state::AppState;

/// GET /api/dashboard - Counts scoped to the caller unless admin
pub async fn dashboard_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Dashboard> {
    let dashboard = DashboardService::new(state.store.clone());
    Ok(ApiResponse::success(dashboard.summary(&user).await?))
}
