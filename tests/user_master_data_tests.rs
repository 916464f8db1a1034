//! User administration, profile photos and master-data uniqueness

use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

mod fixtures;
use fixtures::*;

fn new_user(email: &str, role_id: &str) -> Value {
    json!({
        "email": email,
        "full_name": "Priya Raman",
        "password": USER_PASSWORD,
        "role_id": role_id,
    })
}

fn photo(content_type: &str) -> Value {
    json!({
        "file_name": "me.png",
        "content_type": content_type,
        "content_base64": STANDARD.encode(b"\x89PNG tiny avatar"),
    })
}

#[tokio::test]
async fn emails_are_unique_regardless_of_case() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let sales = app.role_id(&admin, "sales").await;

    let first = app
        .post("/api/users", &admin, new_user("priya@quotedesk.test", &sales))
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let shouted = app
        .post("/api/users", &admin, new_user("PRIYA@Quotedesk.test", &sales))
        .await;
    assert_eq!(shouted.status, StatusCode::CONFLICT);
    assert!(shouted.body["detail"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn unknown_roles_are_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let created = app
        .post("/api/users", &admin, new_user("nobody@quotedesk.test", "no-such-role"))
        .await;
    assert_eq!(created.status, StatusCode::NOT_FOUND);

    let (user, _) = app.user_with_role(&admin, "sales").await;
    let assigned = app
        .put(
            &format!("/api/users/{user}/role"),
            &admin,
            json!({ "role_id": "no-such-role" }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_assignment_changes_what_a_user_may_do() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (user, token) = app.user_with_role(&admin, "sales").await;
    let manager = app.role_id(&admin, "manager").await;

    let by_self = app
        .put(&format!("/api/users/{user}/role"), &token, json!({ "role_id": manager }))
        .await;
    assert_eq!(by_self.status, StatusCode::FORBIDDEN);

    let assigned = app
        .put(&format!("/api/users/{user}/role"), &admin, json!({ "role_id": manager }))
        .await;
    assert_eq!(assigned.status, StatusCode::OK, "{}", assigned.body);
    assert_eq!(assigned.body["role_id"], manager.as_str());
    assert_eq!(assigned.body["role_name"], "manager");

    let me = app.get("/api/auth/me", &token).await;
    assert_eq!(me.body["role_name"], "manager");
}

#[tokio::test]
async fn deleting_a_user_signs_them_out() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (user, token) = app.user_with_role(&admin, "sales").await;
    assert_eq!(app.get("/api/auth/me", &token).await.status, StatusCode::OK);

    let deleted = app.delete(&format!("/api/users/{user}"), &admin).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let me = app.get("/api/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    let fetched = app.get(&format!("/api/users/{user}"), &admin).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);

    let own = app.get("/api/auth/me", &admin).await;
    let admin_id = id_of(&own.body);
    let self_delete = app.delete(&format!("/api/users/{admin_id}"), &admin).await;
    assert_eq!(self_delete.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_photos_must_be_images() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, token) = app.user_with_role(&admin, "sales").await;

    let pdf = app
        .put("/api/users/me/photo", &token, photo("application/pdf"))
        .await;
    assert_eq!(pdf.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&pdf), vec!["content_type"]);

    let png = app.put("/api/users/me/photo", &token, photo("image/png")).await;
    assert_eq!(png.status, StatusCode::OK, "{}", png.body);
    let attachment = png.body["photo_attachment_id"].as_str().unwrap().to_string();

    let me = app.get("/api/auth/me", &token).await;
    assert_eq!(me.body["photo_attachment_id"], attachment.as_str());
}

#[tokio::test]
async fn master_data_names_are_unique_per_category() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.master(&admin, "industry", "Retail").await;

    for name in ["Retail", "retail", "  RETAIL "] {
        let duplicate = app
            .post(
                "/api/master-data",
                &admin,
                json!({ "category": "industry", "name": name }),
            )
            .await;
        assert_eq!(duplicate.status, StatusCode::CONFLICT, "{name}: {}", duplicate.body);
    }

    // same name in another category is fine
    app.master(&admin, "lead_type", "Retail").await;

    let other = app.master(&admin, "industry", "Wholesale").await;
    let renamed = app
        .put(
            &format!("/api/master-data/{other}"),
            &admin,
            json!({ "name": "RETAIL" }),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::CONFLICT);

    let listed = app.get("/api/master-data?category=industry", &admin).await;
    let names: Vec<&str> = listed.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    assert!(names.contains(&"Retail"));
    assert!(names.contains(&"Wholesale"));
}
