#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crm_api::config::AppConfig;
use crm_api::database::DatabaseManager;
use crm_api::services::UserService;
use crm_api::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@crm.com";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const AGENT_PASSWORD: &str = "Agent@123";

/// The application on a fresh in-memory store, driven without a socket
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::development();
        let store = DatabaseManager::open_store(&config.database, true).await?;
        let state = AppState::new(store, config.clone())?;
        UserService::new(state.store.clone())
            .ensure_seed_admin(&config.seed)
            .await?
            .context("seed admin was not created")?;

        Ok(Self {
            router: app(state.clone()),
            state,
        })
    }

    /// One request through the router; empty bodies come back as `Value::Null`
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("router");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login: {}", body);
        body["accessToken"].as_str().expect("accessToken").to_string()
    }

    /// Registers an agent through the admin API and logs in as them
    pub async fn agent(&self, name: &str) -> (Uuid, String) {
        let admin = self.admin_token().await;
        let email = format!("{}@crm.com", name.to_lowercase());
        let (status, user) = self
            .post(
                "/api/auth/register",
                &admin,
                json!({ "name": name, "email": email, "password": AGENT_PASSWORD, "role": "agent" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, user);

        let (status, body) = self.login(&email, AGENT_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "agent login: {}", body);
        let id = user["id"].as_str().and_then(|s| s.parse().ok()).expect("user id");
        (id, body["accessToken"].as_str().expect("accessToken").to_string())
    }

    /// Serve the router on a free local port for tests that need a real socket
    pub async fn serve(&self) -> Result<String> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(format!("http://127.0.0.1:{}", port))
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id").to_string()
}
