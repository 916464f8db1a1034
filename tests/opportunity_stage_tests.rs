//! Opportunity stage gating, executive overrides and the pipeline summary

use axum::http::StatusCode;
use serde_json::json;

mod fixtures;
use fixtures::*;

fn amount(value: &serde_json::Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}

#[tokio::test]
async fn converted_opportunity_starts_at_l1_with_a_checklist() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;

    let fetched = app.get(&format!("/api/opportunities/{opportunity}"), &admin).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["stage"], "L1");
    assert_eq!(fetched.body["stage_name"], "Prospecting");
    assert_eq!(fetched.body["probability"], 10);
    assert_eq!(fetched.body["company_name"], "Acme Industries");
    assert_eq!(
        fetched.body["missing_items"],
        json!(["budget_identified", "decision_maker_identified"])
    );
}

#[tokio::test]
async fn incomplete_checklist_blocks_advancing() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;

    app.put(
        &format!("/api/opportunities/{opportunity}/qualification"),
        &admin,
        json!({ "items": { "budget_identified": true } }),
    )
    .await;
    let blocked = app
        .post(&format!("/api/opportunities/{opportunity}/advance"), &admin, json!({}))
        .await;
    assert_eq!(blocked.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_fields(&blocked),
        vec!["qualification.decision_maker_identified"]
    );

    app.put(
        &format!("/api/opportunities/{opportunity}/qualification"),
        &admin,
        json!({ "items": { "decision_maker_identified": true } }),
    )
    .await;
    let advanced = app
        .post(&format!("/api/opportunities/{opportunity}/advance"), &admin, json!({}))
        .await;
    assert_eq!(advanced.status, StatusCode::OK, "{}", advanced.body);
    assert_eq!(advanced.body["stage"], "L2");
    let history = advanced.body["stage_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["from"], "L1");
    assert_eq!(history[0]["to"], "L2");
    assert!(history[0]["override_reason"].is_null());
}

#[tokio::test]
async fn stages_cannot_be_skipped_without_an_override() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let skip = app
        .post(
            &format!("/api/opportunities/{opportunity}/advance"),
            &admin,
            json!({ "target_stage": "L4" }),
        )
        .await;
    assert_eq!(skip.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn qualification_rejects_unknown_and_derived_items() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let rejected = app
        .put(
            &format!("/api/opportunities/{opportunity}/qualification"),
            &admin,
            json!({ "items": { "quotation_approved": true, "vibes_good": true } }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = error_fields(&rejected);
    assert!(fields.contains(&"items.quotation_approved".to_string()));
    assert!(fields.contains(&"items.vibes_good".to_string()));
}

#[tokio::test]
async fn proposal_stage_waits_for_an_approved_quotation() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, executive) = app.user_with_role(&admin, "executive").await;
    let opportunity = app.opportunity(&admin).await;

    let jumped = app
        .post(
            &format!("/api/opportunities/{opportunity}/advance"),
            &executive,
            json!({ "target_stage": "L5", "override_reason": "board fast-tracked the deal" }),
        )
        .await;
    assert_eq!(jumped.status, StatusCode::OK, "{}", jumped.body);
    app.put(
        &format!("/api/opportunities/{opportunity}/qualification"),
        &admin,
        json!({ "items": { "proposal_sent": true } }),
    )
    .await;

    let blocked = app
        .post(&format!("/api/opportunities/{opportunity}/advance"), &admin, json!({}))
        .await;
    assert_eq!(blocked.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&blocked), vec!["qualification.quotation_approved"]);

    app.approved_quotation(&admin, &opportunity).await;
    let fetched = app.get(&format!("/api/opportunities/{opportunity}"), &admin).await;
    let derived = fetched.body["checklist"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["item"] == "quotation_approved")
        .cloned()
        .unwrap();
    assert_eq!(derived["done"], true);
    assert_eq!(derived["derived"], true);

    let advanced = app
        .post(&format!("/api/opportunities/{opportunity}/advance"), &admin, json!({}))
        .await;
    assert_eq!(advanced.status, StatusCode::OK, "{}", advanced.body);
    assert_eq!(advanced.body["stage"], "L6");
}

#[tokio::test]
async fn overrides_need_authority_and_a_reason() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, sales) = app.user_with_role(&admin, "sales").await;
    let (_, executive) = app.user_with_role(&admin, "executive").await;
    let opportunity = app.opportunity(&admin).await;
    let uri = format!("/api/opportunities/{opportunity}/advance");

    let by_sales = app
        .post(&uri, &sales, json!({ "target_stage": "L3", "override_reason": "trust me" }))
        .await;
    assert_eq!(by_sales.status, StatusCode::FORBIDDEN);

    let blank = app
        .post(&uri, &executive, json!({ "target_stage": "L3", "override_reason": "   " }))
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&blank), vec!["reason"]);

    let overridden = app
        .post(
            &uri,
            &executive,
            json!({ "target_stage": "L3", "override_reason": "strategic account" }),
        )
        .await;
    assert_eq!(overridden.status, StatusCode::OK, "{}", overridden.body);
    assert_eq!(overridden.body["stage"], "L3");
    assert_eq!(
        overridden.body["stage_history"][0]["override_reason"],
        "strategic account"
    );

    // executives still cannot edit the record itself
    let edit = app
        .put(&format!("/api/opportunities/{opportunity}"), &executive, json!({ "name": "Renamed" }))
        .await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn override_to_l8_closes_as_won() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let won = app
        .post(
            &format!("/api/opportunities/{opportunity}/advance"),
            &admin,
            json!({ "target_stage": "L8", "override_reason": "signed at the trade fair" }),
        )
        .await;
    assert_eq!(won.status, StatusCode::OK, "{}", won.body);
    assert_eq!(won.body["status"], "Won");
    assert!(!won.body["closed_at"].is_null());

    let again = app
        .post(&format!("/api/opportunities/{opportunity}/advance"), &admin, json!({}))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn losing_requires_a_reason_and_freezes_the_opportunity() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let opportunity = app.opportunity(&admin).await;
    let uri = format!("/api/opportunities/{opportunity}/lose");

    let blank = app.post(&uri, &admin, json!({})).await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);

    let lost = app.post(&uri, &admin, json!({ "reason": "went with a competitor" })).await;
    assert_eq!(lost.status, StatusCode::OK);
    assert_eq!(lost.body["status"], "Lost");
    assert_eq!(lost.body["lost_reason"], "went with a competitor");

    let edit = app
        .put(&format!("/api/opportunities/{opportunity}"), &admin, json!({ "name": "Revived" }))
        .await;
    assert_eq!(edit.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn pipeline_sums_open_opportunities_by_stage() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let open = app.opportunity(&admin).await;
    let lost = app.opportunity(&admin).await;
    app.post(
        &format!("/api/opportunities/{lost}/lose"),
        &admin,
        json!({ "reason": "budget cut" }),
    )
    .await;

    let pipeline = app.get("/api/opportunities/pipeline", &admin).await;
    assert_eq!(pipeline.status, StatusCode::OK, "{}", pipeline.body);
    assert_eq!(pipeline.body["open_count"], 1);
    let stages = pipeline.body["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 8);
    assert_eq!(stages[0]["stage"], "L1");
    assert_eq!(stages[0]["count"], 1);
    assert_eq!(amount(&stages[0]["total_value"]), 250000.0);
    assert_eq!(amount(&stages[0]["weighted_value"]), 25000.0);
    assert_eq!(amount(&pipeline.body["weighted_value"]), 25000.0);
    assert!(!open.is_empty());
}
