mod common;

use anyhow::Result;
use serde_json::{json, Value};

use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use crm_api::client::{ClientError, CrmClient, SessionFile};

#[tokio::test]
async fn login_persists_the_session() -> Result<()> {
    let app = TestApp::new().await?;
    let base = app.serve().await?;
    let dir = tempfile::tempdir()?;

    let client = CrmClient::open(SessionFile::new(dir.path()), Some(&base))?;
    assert!(matches!(
        client.get::<Value>("/api/leads", &[]).await,
        Err(ClientError::NotLoggedIn)
    ));

    let session = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    assert_eq!(session.user.email, ADMIN_EMAIL);

    // A second process picks the session up from disk
    let again = CrmClient::open(SessionFile::new(dir.path()), None)?;
    assert_eq!(again.session().await.map(|s| s.user.id), Some(session.user.id));
    let me: Value = again.get("/api/auth/me", &[]).await?;
    assert_eq!(me["email"], ADMIN_EMAIL);

    let lead: Value = again.post("/api/leads", &json!({ "name": "Jane" })).await?;
    let page: Value = again.get("/api/leads", &[("q", "jane".to_string())]).await?;
    assert_eq!(page["items"][0]["id"], lead["id"]);

    again.logout().await?;
    assert!(again.session().await.is_none());
    assert!(SessionFile::new(dir.path()).load()?.is_none());
    Ok(())
}

#[tokio::test]
async fn stale_access_token_is_refreshed_once() -> Result<()> {
    let app = TestApp::new().await?;
    let base = app.serve().await?;
    let dir = tempfile::tempdir()?;
    let file = SessionFile::new(dir.path());

    let client = CrmClient::open(file.clone(), Some(&base))?;
    let original = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    // Simulate an expired access token
    let mut stale = original.clone();
    stale.access_token = "expired".into();
    file.save(&stale)?;

    let client = CrmClient::open(file.clone(), None)?;
    let dashboard: Value = client.get("/api/dashboard", &[]).await?;
    assert_eq!(dashboard["leadsByStatus"].as_array().map(Vec::len), Some(4));

    let rotated = file.load()?.expect("session kept");
    assert_ne!(rotated.access_token, "expired");
    assert_ne!(rotated.refresh_token, original.refresh_token);
    Ok(())
}

#[tokio::test]
async fn failed_refresh_ends_the_session() -> Result<()> {
    let app = TestApp::new().await?;
    let base = app.serve().await?;
    let dir = tempfile::tempdir()?;
    let file = SessionFile::new(dir.path());

    let client = CrmClient::open(file.clone(), Some(&base))?;
    let mut session = client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    session.access_token = "expired".into();
    session.refresh_token = "revoked".into();
    file.save(&session)?;

    let client = CrmClient::open(file.clone(), None)?;
    assert!(matches!(
        client.get::<Value>("/api/leads", &[]).await,
        Err(ClientError::SessionExpired)
    ));
    assert!(client.session().await.is_none());
    assert!(file.load()?.is_none());
    Ok(())
}

#[tokio::test]
async fn api_errors_carry_status_and_message() -> Result<()> {
    let app = TestApp::new().await?;
    let base = app.serve().await?;
    let dir = tempfile::tempdir()?;

    let client = CrmClient::open(SessionFile::new(dir.path()), Some(&base))?;
    match client.login(ADMIN_EMAIL, "wrong").await {
        Err(ClientError::Api { status, message, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("unexpected {:?}", other.map(|s| s.user.email)),
    }

    client.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    match client.post::<Value>("/api/leads", &json!({})).await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));
        }
        other => panic!("unexpected {:?}", other),
    }
    Ok(())
}
