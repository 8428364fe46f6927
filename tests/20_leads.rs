mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn agents_only_see_their_own_leads() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await;
    let (ann_id, ann) = app.agent("Ann").await;
    let (_, bob) = app.agent("Bob").await;

    for name in ["Jane", "John"] {
        let (status, lead) = app.post("/api/leads", &ann, json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(lead["assignedAgent"], ann_id.to_string());
        assert_eq!(lead["status"], "New");
        assert_eq!(lead["source"], "Other");
        assert_eq!(lead["history"][0]["action"], "created");
    }
    let (_, bobs) = app.post("/api/leads", &bob, json!({ "name": "Bea" })).await;

    let (_, page) = app.get("/api/leads", &ann).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["name"], "John");

    // Filtering by another agent does not widen an agent's view
    let bob_id = bobs["assignedAgent"].as_str().unwrap_or_default();
    let (_, page) = app.get(&format!("/api/leads?assignedAgent={}", bob_id), &ann).await;
    assert_eq!(page["total"], 2);

    let (_, page) = app.get("/api/leads", &admin).await;
    assert_eq!(page["total"], 3);

    let (status, _) = app.get(&format!("/api/leads/{}", id_of(&bobs)), &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/leads/{}", uuid::Uuid::new_v4()), &ann).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_filters_and_pagination() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;

    app.post("/api/leads", &ann, json!({ "name": "Jane", "company": "Acme Corp", "source": "Web" })).await;
    app.post("/api/leads", &ann, json!({ "name": "John", "email": "john@globex.com", "status": "In Progress" })).await;
    app.post("/api/leads", &ann, json!({ "name": "Jill" })).await;

    let (_, page) = app.get("/api/leads?q=acme", &ann).await;
    assert_eq!(page["total"], 1);
    let (_, page) = app.get("/api/leads?q=GLOBEX", &ann).await;
    assert_eq!(page["items"][0]["name"], "John");
    let (_, page) = app.get("/api/leads?status=in%20progress", &ann).await;
    assert_eq!(page["total"], 1);
    let (_, page) = app.get("/api/leads?source=Web", &ann).await;
    assert_eq!(page["total"], 1);

    let (status, body) = app.get("/api/leads?status=Lukewarm", &ann).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "status");

    let (_, page) = app.get("/api/leads?page=2&limit=2", &ann).await;
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));

    let (_, page) = app.get("/api/leads?limit=1000&page=0", &ann).await;
    assert_eq!(page["limit"], 100);
    assert_eq!(page["page"], 1);
    Ok(())
}

#[tokio::test]
async fn archive_hides_until_restored() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;
    let path = format!("/api/leads/{}", id_of(&lead));

    let (status, archived) = app.delete(&path, &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["archived"], true);

    let (_, page) = app.get("/api/leads", &ann).await;
    assert_eq!(page["total"], 0);
    let (_, page) = app.get("/api/leads?archived=true", &ann).await;
    assert_eq!(page["total"], 1);

    let (status, restored) = app.post(&format!("{}/restore", path), &ann, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["archived"], false);
    let (_, page) = app.get("/api/leads", &ann).await;
    assert_eq!(page["total"], 1);
    Ok(())
}

#[tokio::test]
async fn conversion_happens_exactly_once() -> Result<()> {
    let app = TestApp::new().await?;
    let (ann_id, ann) = app.agent("Ann").await;
    let (_, lead) = app
        .post("/api/leads", &ann, json!({ "name": "Jane", "email": "jane@acme.com", "company": "Acme" }))
        .await;
    let path = format!("/api/leads/{}/convert", id_of(&lead));

    let (status, result) = app.post(&path, &ann, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["lead"]["status"], "Closed Won");
    assert_eq!(result["lead"]["convertedCustomerId"], result["customer"]["id"]);
    assert_eq!(result["customer"]["owner"], ann_id.to_string());
    assert_eq!(result["customer"]["leadId"], lead["id"]);
    assert_eq!(result["customer"]["company"], "Acme");

    let (status, body) = app.post(&path, &ann, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, customers) = app.get("/api/customers", &ann).await;
    assert_eq!(customers["total"], 1);

    // Status is frozen after conversion
    let (status, _) = app
        .patch(&format!("/api/leads/{}", id_of(&lead)), &ann, json!({ "status": "Closed Lost" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn concurrent_conversions_make_one_customer() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;
    let path = format!("/api/leads/{}/convert", id_of(&lead));

    let (a, b) = tokio::join!(app.post(&path, &ann, json!({})), app.post(&path, &ann, json!({})));
    let mut statuses = [a.0.as_u16(), b.0.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);

    let (_, customers) = app.get("/api/customers", &ann).await;
    assert_eq!(customers["total"], 1);
    Ok(())
}

#[tokio::test]
async fn edits_racing_a_conversion_never_undo_it() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;

    for round in 0..10 {
        let (_, lead) = app.post("/api/leads", &ann, json!({ "name": format!("Lead {}", round) })).await;
        let path = format!("/api/leads/{}", id_of(&lead));
        let convert = format!("{}/convert", path);

        let (edit, conversion) = tokio::join!(
            app.patch(&path, &ann, json!({ "status": "Contacted", "company": "Acme" })),
            app.post(&convert, &ann, json!({}))
        );
        assert_eq!(conversion.0, StatusCode::CREATED);
        assert!(matches!(edit.0.as_u16(), 200 | 409), "edit answered {}", edit.0);

        let (_, stored) = app.get(&path, &ann).await;
        assert_eq!(stored["status"], "Closed Won");
        assert_eq!(stored["convertedCustomerId"], conversion.1["customer"]["id"]);

        let (again, _) = app.post(&convert, &ann, json!({})).await;
        assert_eq!(again, StatusCode::CONFLICT);
    }

    let (_, customers) = app.get("/api/customers", &ann).await;
    assert_eq!(customers["total"], 10);
    Ok(())
}

#[tokio::test]
async fn closed_won_cannot_be_set_by_hand() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;
    let path = format!("/api/leads/{}", id_of(&lead));

    let (status, body) = app.patch(&path, &ann, json!({ "status": "Closed Won" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "status");

    let (_, stored) = app.get(&path, &ann).await;
    assert_eq!(stored["status"], "New");
    assert!(stored["convertedCustomerId"].is_null());
    Ok(())
}

#[tokio::test]
async fn archived_leads_cannot_be_converted() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;
    app.delete(&format!("/api/leads/{}", id_of(&lead)), &ann).await;

    let (status, _) = app.post(&format!("/api/leads/{}/convert", id_of(&lead)), &ann, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn status_changes_are_recorded() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, ann) = app.agent("Ann").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;

    let (status, updated) = app
        .patch(&format!("/api/leads/{}", id_of(&lead)), &ann, json!({ "status": "In Progress" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "In Progress");
    let actions: Vec<&str> = updated["history"]
        .as_array()
        .map(|h| h.iter().filter_map(|e| e["action"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(actions, ["created", "status_changed"]);

    let (_, feed) = app
        .get(&format!("/api/activity?entityType=Lead&entityId={}", id_of(&lead)), &ann)
        .await;
    assert_eq!(feed[0]["type"], "lead_status_changed");
    Ok(())
}

#[tokio::test]
async fn reassignment_is_admin_only() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await;
    let (_, ann) = app.agent("Ann").await;
    let (bob_id, bob) = app.agent("Bob").await;
    let (_, lead) = app.post("/api/leads", &ann, json!({ "name": "Jane" })).await;
    let id = id_of(&lead);

    let body = json!({ "assignedAgent": bob_id });
    let (status, _) = app.post(&format!("/api/leads/{}/reassign", id), &ann, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&format!("/api/leads/{}", id), &ann, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, moved) = app.post(&format!("/api/leads/{}/reassign", id), &admin, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["assignedAgent"], bob_id.to_string());

    let (_, page) = app.get("/api/leads", &bob).await;
    assert_eq!(page["total"], 1);
    let (_, page) = app.get("/api/leads", &ann).await;
    assert_eq!(page["total"], 0);

    let (status, _) = app
        .post(&format!("/api/leads/{}/reassign", id), &admin, json!({ "assignedAgent": uuid::Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
