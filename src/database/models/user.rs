use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::validation::{Validate, Validator, FieldError};

string_enum! {
    Role {
        Admin => "admin",
        Agent => "agent",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Server-side record of an issued refresh token, keyed by its SHA-256 hash
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// POST /api/auth/register
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 120)
            .required("email", self.email.as_deref())
            .email("email", self.email.as_deref())
            .required("password", self.password.as_deref())
            .password("password", self.password.as_deref())
            .finish()
    }
}

/// PATCH /api/auth/users/:id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .not_blank("name", self.name.as_deref())
            .max_len("name", self.name.as_deref(), 120)
            .email("email", self.email.as_deref())
            .password("password", self.password.as_deref())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |r| user.role == r) && self.active.map_or(true, |a| user.active == a)
    }
}
