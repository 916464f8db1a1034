//! Quotation tree, totals and the Draft → Unapproved → Approved/Rejected workflow

use axum::http::StatusCode;
use serde_json::{json, Value};

mod fixtures;
use fixtures::*;

fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}

#[tokio::test]
async fn new_quotation_is_a_numbered_draft() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;

    let created = app
        .post(
            "/api/quotations",
            &admin,
            json!({ "opportunity_id": opportunity, "title": "Pilot", "currency": "usd" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["status"], "Draft");
    assert_eq!(created.body["version"], 1);
    assert_eq!(created.body["currency"], "USD");
    assert_eq!(created.body["company_name"], "Acme Industries");
    assert_eq!(created.body["opportunity_name"], "Plant automation");

    let number = created.body["quotation_number"].as_str().unwrap();
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3, "{number}");
    assert_eq!(parts[0], "QT");
    assert_eq!(parts[1], chrono::Utc::now().format("%Y%m%d").to_string());
    assert_eq!(parts[2].len(), 6);
}

#[tokio::test]
async fn totals_roll_up_from_items() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, _) = app.quotation_with_item(&admin, &opportunity).await;

    let detail = app.get(&format!("/api/quotations/{quotation}"), &admin).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["item_count"], 1);
    let totals = &detail.body["totals"];
    assert_eq!(amount(&totals["subtotal"]), 15000.0);
    assert_eq!(amount(&totals["discount"]), 1500.0);
    assert_eq!(amount(&totals["taxable"]), 13500.0);
    assert_eq!(amount(&totals["tax"]), 2430.0);
    assert_eq!(amount(&totals["total"]), 15930.0);

    let phase = &detail.body["phases"][0];
    assert_eq!(amount(&phase["totals"]["total"]), 15930.0);
    assert_eq!(amount(&phase["groups"][0]["items"][0]["totals"]["total"]), 15930.0);

    let listed = app
        .get(&format!("/api/quotations?opportunity_id={opportunity}"), &admin)
        .await;
    assert_eq!(listed.body["total"], 1);
    assert_eq!(amount(&listed.body["items"][0]["totals"]["total"]), 15930.0);
}

#[tokio::test]
async fn items_validate_quantities_and_percentages() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, group) = app.quotation_with_item(&admin, &opportunity).await;

    let invalid = app
        .post(
            &format!("/api/quotations/{quotation}/groups/{group}/items"),
            &admin,
            json!({
                "description": "",
                "quantity": "0",
                "unit_price": "-1",
                "discount_percent": "150",
            }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = error_fields(&invalid);
    for field in ["description", "quantity", "unit_price", "discount_percent"] {
        assert!(fields.contains(&field.to_string()), "missing {field} in {fields:?}");
    }
}

#[tokio::test]
async fn empty_quotations_cannot_be_submitted() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let created = app
        .post(
            "/api/quotations",
            &admin,
            json!({ "opportunity_id": opportunity, "title": "Empty" }),
        )
        .await;
    let quotation = id_of(&created.body);

    let submitted = app
        .post(&format!("/api/quotations/{quotation}/submit"), &admin, json!({}))
        .await;
    assert_eq!(submitted.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&submitted), vec!["items"]);
}

#[tokio::test]
async fn drafts_cannot_be_approved_directly() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, _) = app.quotation_with_item(&admin, &opportunity).await;

    let approved = app
        .post(&format!("/api/quotations/{quotation}/approve"), &admin, json!({}))
        .await;
    assert_eq!(approved.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn content_is_frozen_once_submitted() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, group) = app.quotation_with_item(&admin, &opportunity).await;

    let submitted = app
        .post(&format!("/api/quotations/{quotation}/submit"), &admin, json!({}))
        .await;
    assert_eq!(submitted.status, StatusCode::OK);
    assert_eq!(submitted.body["status"], "Unapproved");
    assert!(!submitted.body["submitted_at"].is_null());

    let header = app
        .put(&format!("/api/quotations/{quotation}"), &admin, json!({ "title": "Sneaky" }))
        .await;
    assert_eq!(header.status, StatusCode::CONFLICT);

    let item = app
        .post(
            &format!("/api/quotations/{quotation}/groups/{group}/items"),
            &admin,
            json!({ "description": "Extra", "quantity": "1", "unit_price": "10" }),
        )
        .await;
    assert_eq!(item.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejection_needs_a_reason_and_revision_bumps_the_version() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, _) = app.quotation_with_item(&admin, &opportunity).await;
    app.post(&format!("/api/quotations/{quotation}/submit"), &admin, json!({}))
        .await;

    let blank = app
        .post(&format!("/api/quotations/{quotation}/reject"), &admin, json!({ "reason": "" }))
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&blank), vec!["reason"]);

    let rejected = app
        .post(
            &format!("/api/quotations/{quotation}/reject"),
            &admin,
            json!({ "reason": "discount too steep" }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["status"], "Rejected");
    assert_eq!(rejected.body["rejection_reason"], "discount too steep");

    let revised = app
        .post(&format!("/api/quotations/{quotation}/revise"), &admin, json!({}))
        .await;
    assert_eq!(revised.status, StatusCode::OK);
    assert_eq!(revised.body["status"], "Draft");
    assert_eq!(revised.body["version"], 2);
    assert!(revised.body["rejection_reason"].is_null());

    let retitled = app
        .put(&format!("/api/quotations/{quotation}"), &admin, json!({ "title": "Revised" }))
        .await;
    assert_eq!(retitled.status, StatusCode::OK);
}

#[tokio::test]
async fn approved_quotations_are_terminal() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let quotation = app.approved_quotation(&admin, &opportunity).await;

    let fetched = app.get(&format!("/api/quotations/{quotation}"), &admin).await;
    assert_eq!(fetched.body["status"], "Approved");
    assert_eq!(fetched.body["approved_by_name"], "Administrator");

    let revise = app
        .post(&format!("/api/quotations/{quotation}/revise"), &admin, json!({}))
        .await;
    assert_eq!(revise.status, StatusCode::CONFLICT);

    let deleted = app.delete(&format!("/api/quotations/{quotation}"), &admin).await;
    assert_eq!(deleted.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sales_cannot_approve_their_own_quotations() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, sales) = app.user_with_role(&admin, "sales").await;
    let (_, manager) = app.user_with_role(&admin, "manager").await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, _) = app.quotation_with_item(&admin, &opportunity).await;

    let submitted = app
        .post(&format!("/api/quotations/{quotation}/submit"), &sales, json!({}))
        .await;
    assert_eq!(submitted.status, StatusCode::OK);

    let by_sales = app
        .post(&format!("/api/quotations/{quotation}/approve"), &sales, json!({}))
        .await;
    assert_eq!(by_sales.status, StatusCode::FORBIDDEN);

    let by_manager = app
        .post(&format!("/api/quotations/{quotation}/approve"), &manager, json!({}))
        .await;
    assert_eq!(by_manager.status, StatusCode::OK);
    assert_eq!(by_manager.body["approved_by_name"], "Test manager");
}

#[tokio::test]
async fn deleting_a_draft_removes_its_tree() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, _) = app.quotation_with_item(&admin, &opportunity).await;

    let deleted = app.delete(&format!("/api/quotations/{quotation}"), &admin).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = app.get(&format!("/api/quotations/{quotation}"), &admin).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn groups_and_items_belong_to_their_quotation() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (first, group) = app.quotation_with_item(&admin, &opportunity).await;
    let (second, _) = app.quotation_with_item(&admin, &opportunity).await;
    assert_ne!(first, second);

    let foreign = app
        .post(
            &format!("/api/quotations/{second}/groups/{group}/items"),
            &admin,
            json!({ "description": "Misplaced", "quantity": "1", "unit_price": "1" }),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_phase_removes_its_groups_and_items() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let (quotation, group) = app.quotation_with_item(&admin, &opportunity).await;
    let detail = app.get(&format!("/api/quotations/{quotation}"), &admin).await;
    let phase = id_of(&detail.body["phases"][0]);

    let deleted = app
        .delete(&format!("/api/quotations/{quotation}/phases/{phase}"), &admin)
        .await;
    assert_eq!(deleted.status, StatusCode::OK, "{}", deleted.body);
    assert_eq!(deleted.body["item_count"], 0);
    assert_eq!(deleted.body["phases"].as_array().map(Vec::len), Some(0));

    let orphan = app
        .post(
            &format!("/api/quotations/{quotation}/groups/{group}/items"),
            &admin,
            json!({ "description": "Late", "quantity": "1", "unit_price": "1" }),
        )
        .await;
    assert_eq!(orphan.status, StatusCode::NOT_FOUND);

    let submitted = app
        .post(&format!("/api/quotations/{quotation}/submit"), &admin, json!({}))
        .await;
    assert_eq!(submitted.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&submitted), vec!["items"]);
}

#[tokio::test]
async fn malformed_bodies_still_get_the_error_envelope() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;

    let untitled = app
        .post("/api/quotations", &admin, json!({ "opportunity_id": opportunity }))
        .await;
    assert_eq!(untitled.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(untitled.body["detail"].is_string(), "{}", untitled.body);
    assert_eq!(error_fields(&untitled), vec!["title"]);

    let bad_decimal = app
        .post("/api/leads", &admin, json!({ "title": "Boiler retrofit", "expected_value": "abc" }))
        .await;
    assert_eq!(bad_decimal.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(bad_decimal.body["detail"].is_string(), "{}", bad_decimal.body);
    assert_eq!(error_fields(&bad_decimal).len(), 1);

    let not_json = app
        .raw(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/leads")
                .header("authorization", format!("Bearer {admin}"))
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(not_json.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].is_string());

    let bad_page = app.get("/api/leads?page=minus", &admin).await;
    assert_eq!(bad_page.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(bad_page.body["detail"].is_string(), "{}", bad_page.body);
}
