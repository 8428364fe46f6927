mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CRM API");
    Ok(())
}

#[tokio::test]
async fn seeded_admin_can_log_in() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["accessToken"].as_str().unwrap_or_default().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap_or_default().is_empty());
    assert_eq!(body["expiresIn"], 900);
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("passwordHash").is_none());

    // Email matching ignores case
    let (status, _) = app.login("ADMIN@crm.com", ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_share_one_answer() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, wrong_password) = app.login(ADMIN_EMAIL, "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = app.login("ghost@crm.com", "whatever").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown["message"]);
    assert_eq!(unknown["code"], "UNAUTHORIZED");

    let (status, body) = app
        .call(Method::POST, "/api/auth/login", None, Some(json!({ "email": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_bearer() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app.call(Method::GET, "/api/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app.get("/api/leads", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is signed with the other secret
    let (_, login) = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let refresh = login["refreshToken"].as_str().unwrap_or_default();
    let (status, _) = app.get("/api/auth/me", refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let access = login["accessToken"].as_str().unwrap_or_default();
    let (status, me) = app.get("/api/auth/me", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, login) = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let first = login["refreshToken"].as_str().unwrap_or_default().to_string();

    let (status, rotated) = app
        .call(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": first })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = rotated["refreshToken"].as_str().unwrap_or_default().to_string();
    assert_ne!(first, second);
    assert!(rotated["accessToken"].is_string());

    // Replaying the rotated token fails and burns the whole family
    let (status, body) = app
        .call(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": first })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("accessToken").is_none());

    let (status, _) = app
        .call(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": second })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": "garbage" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_and_is_idempotent() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, login) = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = login["accessToken"].as_str().unwrap_or_default();
    let refresh = login["refreshToken"].as_str().unwrap_or_default();

    for _ in 0..2 {
        let (status, body) = app
            .post("/api/auth/logout", access, json!({ "refreshToken": refresh }))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());
    }

    let (status, _) = app
        .call(Method::POST, "/api/auth/refresh", None, Some(json!({ "refreshToken": refresh })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/auth/logout", access, json!({ "refreshToken": "forged" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn user_administration_is_admin_only() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await;
    let (agent_id, agent) = app.agent("Ann").await;

    let (status, _) = app
        .post(
            "/api/auth/register",
            &agent,
            json!({ "name": "Eve", "email": "eve@crm.com", "password": "Password1" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/auth/users", &agent).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Duplicate email, case-insensitively
    let (status, body) = app
        .post(
            "/api/auth/register",
            &admin,
            json!({ "name": "Ann 2", "email": "ANN@crm.com", "password": "Password1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app
        .post(
            "/api/auth/register",
            &admin,
            json!({ "name": "Short", "email": "short@crm.com", "password": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "password");

    let (status, page) = app.get("/api/auth/users?role=agent", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], agent_id.to_string());

    let (status, _) = app.get("/api/auth/users?role=wizard", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Deactivation locks the account out
    let (status, _) = app.delete(&format!("/api/auth/users/{}", agent_id), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.login("ann@crm.com", common::AGENT_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, user) = app.get(&format!("/api/auth/users/{}", agent_id), &admin).await;
    assert_eq!(user["active"], false);
    Ok(())
}

#[tokio::test]
async fn admin_cannot_demote_or_delete_itself() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await;
    let (_, me) = app.get("/api/auth/me", &admin).await;
    let path = format!("/api/auth/users/{}", me["id"].as_str().unwrap_or_default());

    let (status, _) = app.patch(&path, &admin, json!({ "role": "agent" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&path, &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = app.patch(&path, &admin, json!({ "name": "Root" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Root");
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_a_json_400() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await;

    let (status, body) = app.get("/api/leads/not-a-uuid", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = app.get("/api/leads?page=abc", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
    Ok(())
}
