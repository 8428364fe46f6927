pub mod password;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::{Role, User};

pub use password::{hash_password, verify_password};

/// Claims carried by a short-lived access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token. `jti` keeps two tokens issued in the
/// same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
    InvalidToken(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// A freshly signed refresh token and what the server keeps about it
#[derive(Debug, Clone)]
pub struct IssuedRefresh {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies both token kinds. Access and refresh tokens use
/// separate secrets so one can never be replayed as the other.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        if security.jwt_access_secret.is_empty() || security.jwt_refresh_secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        if security.jwt_access_secret == security.jwt_refresh_secret {
            return Err(JwtError::InvalidSecret);
        }

        Ok(Self {
            access_encoding: EncodingKey::from_secret(security.jwt_access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(security.jwt_access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(security.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(security.jwt_refresh_secret.as_bytes()),
            access_ttl: Duration::minutes(security.jwt_access_expiry_minutes as i64),
            refresh_ttl: Duration::days(security.jwt_refresh_expiry_days as i64),
        })
    }

    /// Access token lifetime in seconds, as reported to clients
    pub fn access_expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user: &User) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = AccessClaims {
            id: user.id,
            role: user.role,
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<IssuedRefresh, JwtError> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            id: user_id,
            jti,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))?;
        Ok(IssuedRefresh { token, jti, expires_at })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(token, &self.access_decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}

/// Refresh tokens are stored by digest, never in the clear
pub fn token_hash(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            cors_origins: vec!["*".into()],
            jwt_access_secret: "access-test-secret".into(),
            jwt_refresh_secret: "refresh-test-secret".into(),
            jwt_access_expiry_minutes: 15,
            jwt_refresh_expiry_days: 7,
        }
    }

    fn user() -> User {
        User::new("Ann Agent".into(), "ann@crm.com".into(), "hash".into(), Role::Agent)
    }

    #[test]
    fn access_token_round_trip() {
        let issuer = TokenIssuer::from_config(&security()).unwrap();
        let user = user();
        let token = issuer.issue_access(&user).unwrap();
        let claims = issuer.verify_access(&token).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.name, "Ann Agent");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(issuer.access_expires_in(), 900);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let issuer = TokenIssuer::from_config(&security()).unwrap();
        let user = user();
        let access = issuer.issue_access(&user).unwrap();
        let refresh = issuer.issue_refresh(user.id).unwrap();

        assert!(issuer.verify_refresh(&access).is_err());
        assert!(issuer.verify_access(&refresh.token).is_err());
        assert_eq!(issuer.verify_refresh(&refresh.token).unwrap().jti, refresh.jti);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let issuer = TokenIssuer::from_config(&security()).unwrap();
        let id = Uuid::new_v4();
        let a = issuer.issue_refresh(id).unwrap();
        let b = issuer.issue_refresh(id).unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(token_hash(&a.token), token_hash(&b.token));
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let mut config = security();
        config.jwt_access_expiry_minutes = 0;
        let issuer = TokenIssuer::from_config(&config).unwrap();
        let token = issuer.issue_access(&user()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(matches!(issuer.verify_access(&token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn secrets_must_be_present_and_distinct() {
        let mut config = security();
        config.jwt_refresh_secret = config.jwt_access_secret.clone();
        assert!(matches!(TokenIssuer::from_config(&config), Err(JwtError::InvalidSecret)));

        config.jwt_access_secret.clear();
        assert!(matches!(TokenIssuer::from_config(&config), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let digest = token_hash("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
