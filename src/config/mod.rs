use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory://` for the in-process store
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
    pub activity_default_limit: u32,
    pub activity_max_limit: u32,
    pub notes_preview: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub jwt_access_expiry_minutes: u64,
    pub jwt_refresh_expiry_days: u64,
}

/// Admin account created at startup when the user table is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(port) = env::var("CRM_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.api.default_page_limit = v.parse().unwrap_or(self.api.default_page_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.api.max_page_limit = v.parse().unwrap_or(self.api.max_page_limit);
        }
        if let Ok(v) = env::var("ACTIVITY_DEFAULT_LIMIT") {
            self.api.activity_default_limit = v.parse().unwrap_or(self.api.activity_default_limit);
        }
        if let Ok(v) = env::var("ACTIVITY_MAX_LIMIT") {
            self.api.activity_max_limit = v.parse().unwrap_or(self.api.activity_max_limit);
        }

        // Security overrides
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("JWT_ACCESS_SECRET") {
            self.security.jwt_access_secret = v;
        }
        if let Ok(v) = env::var("JWT_REFRESH_SECRET") {
            self.security.jwt_refresh_secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRY_MINUTES") {
            self.security.jwt_access_expiry_minutes =
                v.parse().unwrap_or(self.security.jwt_access_expiry_minutes);
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRY_DAYS") {
            self.security.jwt_refresh_expiry_days =
                v.parse().unwrap_or(self.security.jwt_refresh_expiry_days);
        }

        // Seed overrides
        if let Ok(v) = env::var("SEED_ADMIN_EMAIL") {
            self.seed.admin_email = Some(v);
        }
        if let Ok(v) = env::var("SEED_ADMIN_PASSWORD") {
            self.seed.admin_password = Some(v);
        }
        if let Ok(v) = env::var("SEED_ADMIN_NAME") {
            self.seed.admin_name = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                default_page_limit: 20,
                max_page_limit: 100,
                activity_default_limit: 20,
                activity_max_limit: 100,
                notes_preview: 5,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_access_secret: "dev-access-secret".to_string(),
                jwt_refresh_secret: "dev-refresh-secret".to_string(),
                jwt_access_expiry_minutes: 15,
                jwt_refresh_expiry_days: 7,
            },
            seed: SeedConfig {
                admin_email: Some("admin@crm.com".to_string()),
                admin_password: Some("Admin@123".to_string()),
                admin_name: "Administrator".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                default_page_limit: 20,
                max_page_limit: 100,
                activity_default_limit: 20,
                activity_max_limit: 100,
                notes_preview: 5,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_access_secret: String::new(),
                jwt_refresh_secret: String::new(),
                jwt_access_expiry_minutes: 15,
                jwt_refresh_expiry_days: 7,
            },
            seed: SeedConfig {
                admin_email: None,
                admin_password: None,
                admin_name: "Administrator".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                default_page_limit: 20,
                max_page_limit: 50,
                activity_default_limit: 20,
                activity_max_limit: 50,
                notes_preview: 5,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_access_secret: String::new(),
                jwt_refresh_secret: String::new(),
                jwt_access_expiry_minutes: 15,
                jwt_refresh_expiry_days: 7,
            },
            seed: SeedConfig {
                admin_email: None,
                admin_password: None,
                admin_name: "Administrator".to_string(),
            },
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database.url.is_empty() && matches!(self.environment, Environment::Development)
            || self.database.url.starts_with("memory:")
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.uses_memory_store());
        assert_eq!(config.api.default_page_limit, 20);
        assert_eq!(config.seed.admin_email.as_deref(), Some("admin@crm.com"));
        assert!(!config.security.jwt_access_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.uses_memory_store());
        assert!(config.security.jwt_access_secret.is_empty());
        assert!(config.seed.admin_email.is_none());
    }

    #[test]
    fn activity_max_limit_reads_env() {
        env::set_var("ACTIVITY_MAX_LIMIT", "250");
        let config = AppConfig::staging().with_env_overrides();
        env::remove_var("ACTIVITY_MAX_LIMIT");
        assert_eq!(config.api.activity_max_limit, 250);

        env::set_var("ACTIVITY_MAX_LIMIT", "lots");
        let config = AppConfig::staging().with_env_overrides();
        env::remove_var("ACTIVITY_MAX_LIMIT");
        assert_eq!(config.api.activity_max_limit, 100);
    }

    #[test]
    fn access_and_refresh_secrets_are_independent() {
        let config = AppConfig::development();
        assert_ne!(config.security.jwt_access_secret, config.security.jwt_refresh_secret);
        assert!(config.security.jwt_refresh_expiry_days * 24 * 60 > config.security.jwt_access_expiry_minutes);
    }
}
