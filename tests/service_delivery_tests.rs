//! Service delivery: creation from approved quotations, milestones and status flow

use axum::http::StatusCode;
use serde_json::json;

mod fixtures;
use fixtures::*;

#[tokio::test]
async fn delivery_needs_an_approved_quotation() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (draft, _) = app.quotation_with_item(&admin, &opportunity).await;

    let refused = app
        .post("/api/services", &admin, json!({ "quotation_id": draft }))
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);

    let approved = app.approved_quotation(&admin, &opportunity).await;
    let created = app
        .post("/api/services", &admin, json!({ "quotation_id": approved }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["status"], "Planned");
    assert_eq!(created.body["title"], "Phase one rollout");
    assert_eq!(created.body["company_name"], "Acme Industries");
    assert_eq!(created.body["opportunity_id"], opportunity.as_str());
    assert_eq!(created.body["progress_percent"], 0);
    assert!(created.body["quotation_number"]
        .as_str()
        .unwrap()
        .starts_with("QT-"));
}

#[tokio::test]
async fn milestones_drive_progress_and_gate_completion() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let quotation = app.approved_quotation(&admin, &opportunity).await;
    let created = app
        .post(
            "/api/services",
            &admin,
            json!({ "quotation_id": quotation, "title": "Go-live" }),
        )
        .await;
    let delivery = id_of(&created.body);

    for name in ["Kickoff", "Handover"] {
        let added = app
            .post(
                &format!("/api/services/{delivery}/milestones"),
                &admin,
                json!({ "name": name }),
            )
            .await;
        assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);
    }
    let fetched = app.get(&format!("/api/services/{delivery}"), &admin).await;
    let milestones: Vec<String> = fetched.body["milestones"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(milestones.len(), 2);

    let started = app
        .post(
            &format!("/api/services/{delivery}/status"),
            &admin,
            json!({ "status": "InProgress" }),
        )
        .await;
    assert_eq!(started.status, StatusCode::OK);
    assert!(!started.body["start_date"].is_null());

    let done = app
        .post(
            &format!("/api/services/{delivery}/milestones/{}/complete", milestones[0]),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["progress_percent"], 50);

    let twice = app
        .post(
            &format!("/api/services/{delivery}/milestones/{}/complete", milestones[0]),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    let early = app
        .post(
            &format!("/api/services/{delivery}/status"),
            &admin,
            json!({ "status": "Completed" }),
        )
        .await;
    assert_eq!(early.status, StatusCode::CONFLICT);

    app.post(
        &format!("/api/services/{delivery}/milestones/{}/complete", milestones[1]),
        &admin,
        json!({}),
    )
    .await;
    let completed = app
        .post(
            &format!("/api/services/{delivery}/status"),
            &admin,
            json!({ "status": "Completed" }),
        )
        .await;
    assert_eq!(completed.status, StatusCode::OK, "{}", completed.body);
    assert_eq!(completed.body["status"], "Completed");
    assert_eq!(completed.body["progress_percent"], 100);

    let late_milestone = app
        .post(
            &format!("/api/services/{delivery}/milestones"),
            &admin,
            json!({ "name": "Afterthought" }),
        )
        .await;
    assert_eq!(late_milestone.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_status_moves_conflict() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let quotation = app.approved_quotation(&admin, &opportunity).await;
    let created = app
        .post("/api/services", &admin, json!({ "quotation_id": quotation }))
        .await;
    let delivery = id_of(&created.body);
    let status_uri = format!("/api/services/{delivery}/status");

    let skip = app
        .post(&status_uri, &admin, json!({ "status": "Completed" }))
        .await;
    assert_eq!(skip.status, StatusCode::CONFLICT);

    let cancelled = app
        .post(&status_uri, &admin, json!({ "status": "Cancelled" }))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);

    let resumed = app
        .post(&status_uri, &admin, json!({ "status": "InProgress" }))
        .await;
    assert_eq!(resumed.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn dates_and_assignees_are_checked() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let quotation = app.approved_quotation(&admin, &opportunity).await;

    let backwards = app
        .post(
            "/api/services",
            &admin,
            json!({
                "quotation_id": quotation,
                "start_date": "2026-03-10",
                "end_date": "2026-03-01",
            }),
        )
        .await;
    assert_eq!(backwards.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&backwards), vec!["end_date"]);

    let ghost = app
        .post(
            "/api/services",
            &admin,
            json!({ "quotation_id": quotation, "assigned_to": "nobody" }),
        )
        .await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);

    let (sales_id, _) = app.user_with_role(&admin, "sales").await;
    let assigned = app
        .post(
            "/api/services",
            &admin,
            json!({ "quotation_id": quotation, "assigned_to": sales_id }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::CREATED);
    assert_eq!(assigned.body["assignee_name"], "Test sales");
}

#[tokio::test]
async fn sales_can_view_but_not_manage_deliveries() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, sales) = app.user_with_role(&admin, "sales").await;
    let opportunity = app.opportunity(&admin).await;
    let quotation = app.approved_quotation(&admin, &opportunity).await;

    let denied = app
        .post("/api/services", &sales, json!({ "quotation_id": quotation }))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let listed = app.get("/api/services", &sales).await;
    assert_eq!(listed.status, StatusCode::OK);
}
