use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::validation::normalize_email;
use crate::api::{Page, Pagination};
use crate::auth::hash_password;
use crate::config::SeedConfig;
use crate::database::models::{Activity, ActivityType, EntityType, NewUser, Role, User, UserFilter, UserUpdate};
use crate::database::{DatabaseError, Store};
use crate::middleware::AuthUser;
use super::{record_activity, ServiceError, ServiceResult};

/// Account administration
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn register(&self, actor: &AuthUser, input: NewUser) -> ServiceResult<User> {
        let user = self.create(input).await?;
        record_activity(
            self.store.as_ref(),
            Activity::new(
                ActivityType::UserCreated,
                actor.id,
                &actor.name,
                EntityType::User,
                user.id,
                format!("Registered {} as {}", user.email, user.role),
            ),
        )
        .await;
        Ok(user)
    }

    async fn create(&self, input: NewUser) -> ServiceResult<User> {
        let email = normalize_email(input.email.as_deref().unwrap_or_default());
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateEmail(email));
        }

        let password_hash = hash_password(input.password.as_deref().unwrap_or_default())
            .map_err(ServiceError::Internal)?;
        let user = User::new(
            input.name.unwrap_or_default().trim().to_string(),
            email.clone(),
            password_hash,
            input.role.unwrap_or(Role::Agent),
        );

        self.store.insert_user(&user).await.map_err(|e| match e {
            DatabaseError::Conflict(_) => ServiceError::DuplicateEmail(email),
            other => other.into(),
        })?;
        info!("Created {} account {}", user.role, user.id);
        Ok(user)
    }

    pub async fn list(&self, filter: &UserFilter, page: Pagination) -> ServiceResult<Page<User>> {
        let (items, total) = self.store.list_users(filter, page).await?;
        Ok(Page::new(page, total, items))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, update: UserUpdate) -> ServiceResult<User> {
        let mut user = self.get(id).await?;
        if id == actor.id {
            if update.role.map_or(false, |r| r != Role::Admin) {
                return Err(ServiceError::Forbidden("You cannot remove your own admin role".to_string()));
            }
            if update.active == Some(false) {
                return Err(ServiceError::Forbidden("You cannot deactivate your own account".to_string()));
            }
        }

        let mut changed: Vec<&str> = Vec::new();
        if let Some(name) = update.name.as_deref().map(str::trim) {
            if name != user.name {
                user.name = name.to_string();
                changed.push("name");
            }
        }
        if let Some(email) = update.email.as_deref().map(normalize_email) {
            if email != user.email {
                if self.store.find_user_by_email(&email).await?.is_some() {
                    return Err(ServiceError::DuplicateEmail(email));
                }
                user.email = email;
                changed.push("email");
            }
        }
        if let Some(password) = update.password.as_deref() {
            user.password_hash = hash_password(password).map_err(ServiceError::Internal)?;
            changed.push("password");
        }
        if let Some(role) = update.role {
            if role != user.role {
                user.role = role;
                changed.push("role");
            }
        }
        let deactivated = update.active == Some(false) && user.active;
        if let Some(active) = update.active {
            if active != user.active {
                user.active = active;
                changed.push("active");
            }
        }

        if changed.is_empty() {
            return Ok(user);
        }

        user.updated_at = Utc::now();
        self.store.update_user(&user).await.map_err(|e| match e {
            DatabaseError::Conflict(_) => ServiceError::DuplicateEmail(user.email.clone()),
            other => other.into(),
        })?;
        if deactivated || changed.contains(&"password") {
            self.store.revoke_user_refresh_tokens(user.id, Utc::now()).await?;
        }

        record_activity(
            self.store.as_ref(),
            Activity::new(
                ActivityType::UserUpdated,
                actor.id,
                &actor.name,
                EntityType::User,
                user.id,
                format!("Updated user {}", user.email),
            )
            .with_meta(json!({ "fields": changed })),
        )
        .await;
        Ok(user)
    }

    /// Soft delete: the account is deactivated and its sessions revoked
    pub async fn deactivate(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        if id == actor.id {
            return Err(ServiceError::Forbidden("You cannot deactivate your own account".to_string()));
        }

        let mut user = self.get(id).await?;
        let now = Utc::now();
        if user.active {
            user.active = false;
            user.updated_at = now;
            self.store.update_user(&user).await?;
        }
        let revoked = self.store.revoke_user_refresh_tokens(user.id, now).await?;
        info!("Deactivated user {} ({} sessions revoked)", user.id, revoked);

        record_activity(
            self.store.as_ref(),
            Activity::new(
                ActivityType::UserDeactivated,
                actor.id,
                &actor.name,
                EntityType::User,
                user.id,
                format!("Deactivated user {}", user.email),
            ),
        )
        .await;
        Ok(())
    }

    /// Creates the configured admin account when no users exist yet
    pub async fn ensure_seed_admin(&self, seed: &SeedConfig) -> ServiceResult<Option<User>> {
        if self.store.count_users().await? > 0 {
            return Ok(None);
        }
        let (Some(email), Some(password)) = (seed.admin_email.clone(), seed.admin_password.clone()) else {
            info!("No users and no seed admin configured");
            return Ok(None);
        };

        let admin = self
            .create(NewUser {
                name: Some(seed.admin_name.clone()),
                email: Some(email),
                password: Some(password),
                role: Some(Role::Admin),
            })
            .await?;
        info!("Seeded admin account {}", admin.email);
        Ok(Some(admin))
    }
}
