use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiQuery, Page, Validate};
use crate::database::models::{Customer, CustomerFilter, CustomerSummary, NewCustomer};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CustomerService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub tag: Option<String>,
    pub owner: Option<Uuid>,
}

/// GET /api/customers - Each item carries only its most recent notes
pub async fn customers_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<CustomerListQuery>,
) -> ApiResult<Page<CustomerSummary>> {
    let filter = CustomerFilter {
        owner: query.owner,
        search: query.q.filter(|q| !q.trim().is_empty()),
        tag: query
            .tag
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty()),
    };
    let page = state.pagination(query.page, query.limit);

    let customers = CustomerService::new(state.store.clone(), state.config.api.notes_preview);
    Ok(ApiResponse::success(customers.list(&user, filter, page).await?))
}

/// POST /api/customers
pub async fn customers_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<NewCustomer>,
) -> ApiResult<Customer> {
    body.validate()?;

    let customers = CustomerService::new(state.store.clone(), state.config.api.notes_preview);
    Ok(ApiResponse::created(customers.create(&user, body).await?))
}
