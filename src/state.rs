use std::sync::Arc;

use crate::api::Pagination;
use crate::auth::{JwtError, TokenIssuer};
use crate::config::AppConfig;
use crate::database::Store;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Result<Self, JwtError> {
        let tokens = TokenIssuer::from_config(&config.security)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        })
    }

    /// List window from raw `page`/`limit` query values, using the configured limits
    pub fn pagination(&self, page: Option<i64>, limit: Option<i64>) -> Pagination {
        Pagination::new(
            page,
            limit,
            self.config.api.default_page_limit,
            self.config.api.max_page_limit,
        )
    }
}
