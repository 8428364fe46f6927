use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::validation::{normalize_email, FieldError, Validate, Validator};
use crate::auth::{token_hash, verify_password, TokenIssuer};
use crate::database::models::{RefreshToken, User};
use crate::database::Store;
use crate::middleware::AuthUser;
use super::{ServiceError, ServiceResult};

/// POST /api/auth/login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("email", self.email.as_deref())
            .required("password", self.password.as_deref())
            .finish()
    }
}

/// Body of refresh and logout requests
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("refreshToken", self.refresh_token.as_deref())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

/// Credential checks and the refresh-token lifecycle
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let email = normalize_email(email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!("Login failed: unknown email {}", email);
                return Err(ServiceError::InvalidCredentials);
            }
        };
        if !user.active {
            warn!("Login failed: account {} is inactive", user.id);
            return Err(ServiceError::InvalidCredentials);
        }
        if !verify_password(password, &user.password_hash) {
            warn!("Login failed: wrong password for {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&user).await?;
        info!("User {} logged in", user.id);
        Ok(LoginResponse { tokens, user })
    }

    /// Rotates a refresh token. The presented token is revoked and a new pair
    /// is issued; presenting an already revoked token revokes the whole family.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            warn!("Refresh rejected: {}", e);
            ServiceError::InvalidToken
        })?;

        let hash = token_hash(refresh_token);
        let record = self
            .store
            .find_refresh_token(&hash)
            .await?
            .filter(|record| record.user_id == claims.id)
            .ok_or(ServiceError::InvalidToken)?;

        let now = Utc::now();
        if record.revoked_at.is_some() {
            let revoked = self.store.revoke_user_refresh_tokens(record.user_id, now).await?;
            warn!(
                "Revoked refresh token reused for user {}; revoked {} live tokens",
                record.user_id, revoked
            );
            return Err(ServiceError::InvalidToken);
        }
        if !record.is_live(now) {
            return Err(ServiceError::InvalidToken);
        }

        let user = match self.store.find_user(record.user_id).await? {
            Some(user) if user.active => user,
            _ => return Err(ServiceError::InvalidToken),
        };

        // Losing this race means another request already rotated the token
        if !self.store.revoke_refresh_token(&hash, now).await? {
            return Err(ServiceError::InvalidToken);
        }

        self.issue_pair(&user).await
    }

    /// Revokes the given refresh token. Idempotent for tokens that verify.
    pub async fn logout(&self, refresh_token: &str) -> ServiceResult<()> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token)
            .map_err(|_| ServiceError::InvalidToken)?;

        if self
            .store
            .revoke_refresh_token(&token_hash(refresh_token), Utc::now())
            .await?
        {
            info!("User {} logged out", claims.id);
        }
        Ok(())
    }

    pub async fn me(&self, actor: &AuthUser) -> ServiceResult<User> {
        self.store
            .find_user(actor.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn issue_pair(&self, user: &User) -> ServiceResult<TokenPair> {
        let access_token = self.tokens.issue_access(user)?;
        let refresh = self.tokens.issue_refresh(user.id)?;

        self.store
            .insert_refresh_token(&RefreshToken {
                token_hash: token_hash(&refresh.token),
                user_id: user.id,
                expires_at: refresh.expires_at,
                revoked_at: None,
                created_at: Utc::now(),
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token,
            expires_in: self.tokens.access_expires_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::config::AppConfig;
    use crate::database::models::Role;
    use crate::services::fixtures;

    async fn setup() -> (AuthService, Arc<dyn Store>, User) {
        let store = fixtures::store();
        let tokens = Arc::new(TokenIssuer::from_config(&AppConfig::development().security).unwrap());
        let user = User::new(
            "Ann".into(),
            "ann@crm.com".into(),
            hash_password("Password1").unwrap(),
            Role::Agent,
        );
        store.insert_user(&user).await.unwrap();
        (AuthService::new(store.clone(), tokens), store, user)
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let (auth, _, user) = setup().await;
        let response = auth.login(" ANN@crm.com ", "Password1").await.unwrap();
        assert_eq!(response.user.id, user.id);
        assert!(!response.tokens.access_token.is_empty());
        assert!(!response.tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn bad_credentials_and_inactive_accounts_fail_alike() {
        let (auth, store, mut user) = setup().await;
        assert!(matches!(auth.login("ann@crm.com", "nope").await, Err(ServiceError::InvalidCredentials)));
        assert!(matches!(auth.login("who@crm.com", "Password1").await, Err(ServiceError::InvalidCredentials)));

        user.active = false;
        store.update_user(&user).await.unwrap();
        assert!(matches!(auth.login("ann@crm.com", "Password1").await, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn refresh_rotates_and_detects_reuse() {
        let (auth, _, _) = setup().await;
        let first = auth.login("ann@crm.com", "Password1").await.unwrap().tokens;

        let second = auth.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        // Replaying the rotated token fails and burns the newer one too
        assert!(matches!(auth.refresh(&first.refresh_token).await, Err(ServiceError::InvalidToken)));
        assert!(matches!(auth.refresh(&second.refresh_token).await, Err(ServiceError::InvalidToken)));
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_and_access_tokens() {
        let (auth, _, _) = setup().await;
        let pair = auth.login("ann@crm.com", "Password1").await.unwrap().tokens;
        assert!(matches!(auth.refresh("not-a-jwt").await, Err(ServiceError::InvalidToken)));
        assert!(matches!(auth.refresh(&pair.access_token).await, Err(ServiceError::InvalidToken)));
    }

    #[tokio::test]
    async fn logout_revokes_and_is_idempotent() {
        let (auth, _, _) = setup().await;
        let pair = auth.login("ann@crm.com", "Password1").await.unwrap().tokens;

        auth.logout(&pair.refresh_token).await.unwrap();
        auth.logout(&pair.refresh_token).await.unwrap();
        assert!(matches!(auth.refresh(&pair.refresh_token).await, Err(ServiceError::InvalidToken)));
        assert!(matches!(auth.logout("garbage").await, Err(ServiceError::InvalidToken)));
    }
}
