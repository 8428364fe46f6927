pub mod activity_service;
pub mod auth_service;
pub mod customer_service;
pub mod dashboard_service;
pub mod lead_service;
pub mod task_service;
pub mod user_service;

pub use activity_service::ActivityService;
pub use auth_service::{AuthService, LoginRequest, LoginResponse, RefreshRequest, TokenPair};
pub use customer_service::CustomerService;
pub use dashboard_service::{Dashboard, DashboardService};
pub use lead_service::{Conversion, LeadService};
pub use task_service::TaskService;
pub use user_service::UserService;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::api::FieldError;
use crate::auth::JwtError;
use crate::database::models::{Activity, User};
use crate::database::{DatabaseError, Store};
use crate::middleware::AuthUser;

/// Business-rule failures shared by every service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidToken,

    #[error("Email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Agents may only touch rows they own; admins are unconstrained
pub(crate) fn ensure_owner(actor: &AuthUser, owner: Uuid, what: &str) -> ServiceResult<()> {
    if actor.is_admin() || actor.id == owner {
        Ok(())
    } else {
        warn!("User {} denied access to {} owned by {}", actor.id, what, owner);
        Err(ServiceError::Forbidden(format!("You do not have access to this {}", what)))
    }
}

/// Resolves the owner for a new or updated record. Agents can only name
/// themselves; admins may name any active user.
pub(crate) async fn resolve_owner(
    store: &dyn Store,
    actor: &AuthUser,
    requested: Option<Uuid>,
    field: &str,
) -> ServiceResult<Uuid> {
    match requested {
        None => Ok(actor.id),
        Some(id) if id == actor.id => Ok(id),
        Some(id) if actor.is_admin() => Ok(require_active_user(store, id, field).await?.id),
        Some(_) => Err(ServiceError::Forbidden(format!("Only admins can set {}", field))),
    }
}

pub(crate) async fn require_active_user(store: &dyn Store, id: Uuid, field: &str) -> ServiceResult<User> {
    match store.find_user(id).await? {
        Some(user) if user.active => Ok(user),
        _ => Err(ServiceError::field(field, "Must reference an active user")),
    }
}

/// Appends to the activity log. The mutation has already been committed,
/// so a failed write is logged and swallowed.
pub(crate) async fn record_activity(store: &dyn Store, activity: Activity) {
    if let Err(e) = store.insert_activity(&activity).await {
        warn!(
            "Failed to record {} activity for {} {}: {}",
            activity.kind, activity.entity_type, activity.entity_id, e
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;

    #[tokio::test]
    async fn agents_cannot_assign_others() {
        let store = fixtures::store();
        let agent = fixtures::user(&store, "Ann", Role::Agent).await;
        let other = fixtures::user(&store, "Bob", Role::Agent).await;

        assert_eq!(resolve_owner(store.as_ref(), &agent, None, "owner").await.unwrap(), agent.id);
        assert_eq!(resolve_owner(store.as_ref(), &agent, Some(agent.id), "owner").await.unwrap(), agent.id);
        assert!(matches!(
            resolve_owner(store.as_ref(), &agent, Some(other.id), "owner").await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn admins_must_name_an_active_user() {
        let store = fixtures::store();
        let admin = fixtures::user(&store, "Root", Role::Admin).await;
        let agent = fixtures::user(&store, "Ann", Role::Agent).await;

        assert_eq!(resolve_owner(store.as_ref(), &admin, Some(agent.id), "owner").await.unwrap(), agent.id);
        assert!(matches!(
            resolve_owner(store.as_ref(), &admin, Some(Uuid::new_v4()), "owner").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn ownership_check() {
        let agent = AuthUser { id: Uuid::new_v4(), role: Role::Agent, name: "Ann".into() };
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin, name: "Root".into() };
        assert!(ensure_owner(&agent, agent.id, "lead").is_ok());
        assert!(ensure_owner(&admin, agent.id, "lead").is_ok());
        assert!(matches!(ensure_owner(&agent, admin.id, "lead"), Err(ServiceError::Forbidden(_))));
    }
}
