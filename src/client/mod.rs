//! HTTP client for the CRM API with a persisted, self-refreshing session.

pub mod session;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

pub use session::{Session, SessionFile, SessionUser};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not logged in; run `crm auth login` first")]
    NotLoggedIn,

    #[error("Session expired; please log in again")]
    SessionExpired,

    #[error("{message} ({status})")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid server URL: {0}")]
    InvalidServer(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    access_token: String,
    refresh_token: String,
    user: SessionUser,
}

/// One client per process; it owns the only copy of the session.
pub struct CrmClient {
    http: reqwest::Client,
    base: Url,
    file: SessionFile,
    session: Mutex<Option<Session>>,
}

impl CrmClient {
    /// Loads any saved session. A session saved for a different server is ignored.
    pub fn open(file: SessionFile, server: Option<&str>) -> Result<Self, ClientError> {
        let saved = file.load()?;
        let server = server
            .map(str::to_string)
            .or_else(|| saved.as_ref().map(|s| s.server.clone()))
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let base = parse_server(&server)?;

        let session = saved.filter(|s| parse_server(&s.server).map(|u| u == base).unwrap_or(false));

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            file,
            session: Mutex::new(session),
        })
    }

    pub fn server(&self) -> &Url {
        &self.base
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidServer(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Exchange credentials for tokens and persist the new session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let url = self.url("/api/auth/login", &[])?;
        let response = self
            .http
            .post(url.as_str())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: LoginBody = decode(response).await?;

        let session = Session {
            server: self.base.to_string(),
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            user: body.user,
        };
        self.file.save(&session)?;
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    /// Revoke the refresh token server side, then forget the session locally
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(session) = self.session().await else {
            return self.file.clear();
        };

        let body = json!({ "refreshToken": session.refresh_token });
        if let Err(e) = self.send(Method::POST, "/api/auth/logout", &[], Some(&body)).await {
            warn!("Server-side logout failed: {}", e);
        }
        self.teardown().await
    }

    async fn teardown(&self) -> Result<(), ClientError> {
        *self.session.lock().await = None;
        self.file.clear()
    }

    /// Rotate the token pair. Any failure ends the session.
    async fn refresh(&self) -> Result<(), ClientError> {
        let refresh_token = match self.session().await {
            Some(session) => session.refresh_token,
            None => return Err(ClientError::NotLoggedIn),
        };

        let url = self.url("/api/auth/refresh", &[])?;
        let response = self
            .http
            .post(url.as_str())
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let tokens: TokenResponse = match decode(response).await {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("Refresh rejected: {}", e);
                self.teardown().await?;
                return Err(ClientError::SessionExpired);
            }
        };

        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            session.access_token = tokens.access_token;
            session.refresh_token = tokens.refresh_token;
            self.file.save(session)?;
        }
        Ok(())
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = match self.session().await {
            Some(session) => session.access_token,
            None => return Err(ClientError::NotLoggedIn),
        };

        let mut request = self.http.request(method.clone(), url.as_str()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Authenticated request; a 401 triggers one refresh and one retry
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.url(path, query)?;
        let response = self.attempt(&method, &url, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED || is_token_route(path) {
            return Ok(response);
        }

        debug!("Access token rejected for {} {}; refreshing", method, path);
        self.refresh().await?;
        self.attempt(&method, &url, body).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        decode(self.send(Method::GET, path, query, None).await?).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        decode(self.send(Method::POST, path, &[], Some(body)).await?).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        decode(self.send(Method::PATCH, path, &[], Some(body)).await?).await
    }

    /// For endpoints that answer 204, and for lead archive which answers with the lead
    pub async fn delete(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let response = self.send(Method::DELETE, path, &[], None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }
}

/// The path always ends in `/` so API paths resolve beneath any prefix
fn parse_server(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw).map_err(|e| ClientError::InvalidServer(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ClientError::InvalidServer(format!("unsupported scheme {}", other))),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Login and refresh answer 401 for bad credentials, never for a stale access token
fn is_token_route(path: &str) -> bool {
    matches!(path, "/api/auth/login" | "/api/auth/refresh")
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.message, body.code),
        Err(_) => (status.canonical_reason().unwrap_or("Request failed").to_string(), None),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
