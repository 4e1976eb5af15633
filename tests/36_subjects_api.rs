mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{assert_denied, TestApp};
use edutrack::types::Role;

#[tokio::test]
async fn assigned_teacher_edits_but_only_creator_deletes() -> Result<()> {
    let app = TestApp::new();
    let (_, teacher_a) = app.login_as("Teacher A", Role::Teacher).await?;
    let (b, teacher_b) = app.login_as("Teacher B", Role::Teacher).await?;

    let physics = app
        .create("/api/subjects", &teacher_a, json!({ "name": "Physics", "code": "PHY" }))
        .await?;
    let uri = format!("/api/subjects/{}", physics);

    // B can see it but not touch it yet
    assert_eq!(app.get(&uri, &teacher_b).await?.status, StatusCode::OK);
    assert_denied(&app.put(&uri, &teacher_b, json!({ "description": "Mechanics" })).await?);

    let assigned = app
        .put(&format!("{}/teachers/{}", uri, b.id), &teacher_b, json!({}))
        .await?;
    assert_eq!(assigned.status, StatusCode::OK, "body: {}", assigned.body);
    assert_eq!(assigned.data()["teachers"], json!([b.id]));

    let edited = app.put(&uri, &teacher_b, json!({ "description": "Mechanics" })).await?;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.data()["description"], "Mechanics");
    assert_eq!(edited.data()["code"], "PHY");

    assert_denied(&app.delete(&uri, &teacher_b).await?);

    let deleted = app.delete(&uri, &teacher_a).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &teacher_a).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn teachers_only_assign_themselves() -> Result<()> {
    let app = TestApp::new();
    let (_, admin) = app.login_as("Admin", Role::Admin).await?;
    let (_, teacher_a) = app.login_as("Teacher A", Role::Teacher).await?;
    let (b, _) = app.login_as("Teacher B", Role::Teacher).await?;

    let subject = app
        .create("/api/subjects", &teacher_a, json!({ "name": "Chemistry", "code": "CHE" }))
        .await?;
    let uri = format!("/api/subjects/{}/teachers/{}", subject, b.id);

    let res = app.put(&uri, &teacher_a, json!({})).await?;
    assert_denied(&res);
    assert!(res.body.get("data").is_none());

    let res = app.put(&uri, &admin, json!({})).await?;
    assert_eq!(res.status, StatusCode::OK);

    // assigning twice is harmless
    let again = app.put(&uri, &admin, json!({})).await?;
    assert_eq!(again.data()["teachers"].as_array().map(Vec::len), Some(1));

    let removed = app.delete(&uri, &admin).await?;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.data()["teachers"], json!([]));

    let missing = app.delete(&uri, &admin).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn only_teacher_users_can_be_assigned() -> Result<()> {
    let app = TestApp::new();
    let (_, admin) = app.login_as("Admin", Role::Admin).await?;
    let parent = app.user("Some Parent", Role::Parent).await?;

    let subject = app
        .create("/api/subjects", &admin, json!({ "name": "Biology", "code": "BIO" }))
        .await?;
    let res = app
        .put(&format!("/api/subjects/{}/teachers/{}", subject, parent.id), &admin, json!({}))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"]["user_id"].is_string(), "body: {}", res.body);
    Ok(())
}

#[tokio::test]
async fn subject_name_and_code_are_unique() -> Result<()> {
    let app = TestApp::new();
    let (_, teacher) = app.login_as("Teacher", Role::Teacher).await?;

    app.create("/api/subjects", &teacher, json!({ "name": "History", "code": "HIS" }))
        .await?;

    let same_code = app
        .post("/api/subjects", &teacher, json!({ "name": "World History", "code": "HIS" }))
        .await?;
    assert_eq!(same_code.status, StatusCode::CONFLICT);
    assert_eq!(same_code.body["error"], "A record with this code already exists");

    let same_name = app
        .post("/api/subjects", &teacher, json!({ "name": "History", "code": "HI2" }))
        .await?;
    assert_eq!(same_name.status, StatusCode::CONFLICT);

    let missing_code = app.post("/api/subjects", &teacher, json!({ "name": "Art" })).await?;
    assert_eq!(missing_code.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn students_and_parents_cannot_see_subjects() -> Result<()> {
    let app = TestApp::new();
    let (_, student) = app.login_as("Pupil", Role::Student).await?;
    let (_, parent) = app.login_as("Parent", Role::Parent).await?;

    assert_denied(&app.get("/api/subjects", &student).await?);
    assert_denied(&app.post("/api/subjects", &parent, json!({ "name": "X", "code": "X" })).await?);
    Ok(())
}
