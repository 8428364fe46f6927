use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, Validate};
use crate::database::models::{Customer, NewNote};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CustomerService;
use crate::state::AppState;

/// POST /api/customers/:id/notes - Returns the customer with the new note appended
pub async fn note_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewNote>,
) -> ApiResult<Customer> {
    body.validate()?;
    let text = body.body.as_deref().unwrap_or_default();

    let customers = CustomerService::new(state.store.clone(), state.config.api.notes_preview);
    Ok(ApiResponse::created(customers.add_note(&user, id, text).await?))
}
