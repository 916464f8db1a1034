//! Shared harness for the HTTP integration tests: an in-memory app seeded
//! with the system roles, a bootstrap admin and helpers for common setup.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use quotedesk::config::QuotedeskConfig;
use quotedesk::services::{seed, App};
use quotedesk::store::MemoryDocumentStore;
use quotedesk::build_router;

pub const ADMIN_EMAIL: &str = "admin@quotedesk.test";
pub const ADMIN_PASSWORD: &str = "Admin-pass1";
pub const USER_PASSWORD: &str = "Sales-pass1";

pub const VALID_PAN: &str = "ABCDE1234F";
pub const VALID_GST: &str = "27ABCDE1234F1Z5";

pub struct TestApp {
    pub app: App,
    router: Router,
    _uploads: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut QuotedeskConfig)) -> Self {
        let uploads = tempfile::tempdir().expect("create upload dir");
        let mut config = QuotedeskConfig::default();
        config.auth.bcrypt_cost = 4;
        config.auth.login_attempts_per_minute = 20;
        config.auth.bootstrap_admin_email = ADMIN_EMAIL.to_string();
        config.auth.bootstrap_admin_password = Some(ADMIN_PASSWORD.to_string());
        config.uploads.upload_dir = uploads.path().display().to_string();
        config.uploads.max_upload_bytes = 1024;
        adjust(&mut config);

        let app = App::new(Arc::new(MemoryDocumentStore::new()), config);
        seed::run(&app).await.expect("seed");
        let router = build_router(app.clone());
        Self {
            app,
            router,
            _uploads: uploads,
        }
    }

    pub async fn raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.raw(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Response {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        token_of(&response)
    }

    pub async fn role_id(&self, admin: &str, name: &str) -> String {
        let roles = self.get("/api/roles?page_size=100", admin).await;
        roles.body["items"]
            .as_array()
            .expect("role list")
            .iter()
            .find(|role| role["name"] == name)
            .map(|role| id_of(role))
            .unwrap_or_else(|| panic!("role {name} not seeded"))
    }

    /// Create a user holding `role` and return (user id, bearer token)
    pub async fn user_with_role(&self, admin: &str, role: &str) -> (String, String) {
        let role_id = self.role_id(admin, role).await;
        let email = format!("{role}-{}@quotedesk.test", &unique_suffix());
        let created = self
            .post(
                "/api/users",
                admin,
                json!({
                    "email": email,
                    "full_name": format!("Test {role}"),
                    "password": USER_PASSWORD,
                    "role_id": role_id,
                }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        let login = self.login(&email, USER_PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        (id_of(&created.body), token_of(&login))
    }

    pub async fn master(&self, admin: &str, category: &str, name: &str) -> String {
        let created = self
            .post(
                "/api/master-data",
                admin,
                json!({ "category": category, "name": name }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        id_of(&created.body)
    }

    pub async fn company(&self, token: &str, name: &str) -> String {
        let created = self
            .post("/api/companies", token, json!({ "name": name }))
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        id_of(&created.body)
    }

    pub async fn lead(&self, token: &str, company_id: &str, title: &str) -> String {
        let created = self
            .post(
                "/api/leads",
                token,
                json!({
                    "title": title,
                    "company_id": company_id,
                    "expected_value": "250000",
                }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        id_of(&created.body)
    }

    /// Company, lead and its approval; returns the opportunity id
    pub async fn opportunity(&self, admin: &str) -> String {
        let company = self.company(admin, "Acme Industries").await;
        let lead = self.lead(admin, &company, "Plant automation").await;
        let converted = self
            .post(&format!("/api/leads/{lead}/approve"), admin, json!({}))
            .await;
        assert_eq!(converted.status, StatusCode::CREATED, "{}", converted.body);
        id_of(&converted.body["opportunity"])
    }

    /// Draft quotation with one phase, one group and one item; returns (quotation id, group id)
    pub async fn quotation_with_item(&self, admin: &str, opportunity_id: &str) -> (String, String) {
        let quotation = self
            .post(
                "/api/quotations",
                admin,
                json!({ "opportunity_id": opportunity_id, "title": "Phase one rollout" }),
            )
            .await;
        assert_eq!(quotation.status, StatusCode::CREATED, "{}", quotation.body);
        let quotation_id = id_of(&quotation.body);

        let phase = self
            .post(
                &format!("/api/quotations/{quotation_id}/phases"),
                admin,
                json!({ "name": "Design" }),
            )
            .await;
        assert_eq!(phase.status, StatusCode::CREATED, "{}", phase.body);
        let phase_id = id_of(&phase.body["phases"][0]);

        let group = self
            .post(
                &format!("/api/quotations/{quotation_id}/phases/{phase_id}/groups"),
                admin,
                json!({ "name": "Consulting" }),
            )
            .await;
        assert_eq!(group.status, StatusCode::CREATED, "{}", group.body);
        let group_id = id_of(&group.body["phases"][0]["groups"][0]);

        let item = self
            .post(
                &format!("/api/quotations/{quotation_id}/groups/{group_id}/items"),
                admin,
                json!({
                    "description": "Solution architect",
                    "quantity": "10",
                    "unit_price": "1500.00",
                    "discount_percent": "10",
                    "tax_percent": "18",
                }),
            )
            .await;
        assert_eq!(item.status, StatusCode::CREATED, "{}", item.body);
        (quotation_id, group_id)
    }

    /// Submit and approve; returns the quotation id
    pub async fn approved_quotation(&self, admin: &str, opportunity_id: &str) -> String {
        let (quotation_id, _) = self.quotation_with_item(admin, opportunity_id).await;
        let submitted = self
            .post(&format!("/api/quotations/{quotation_id}/submit"), admin, json!({}))
            .await;
        assert_eq!(submitted.status, StatusCode::OK, "{}", submitted.body);
        let approved = self
            .post(&format!("/api/quotations/{quotation_id}/approve"), admin, json!({}))
            .await;
        assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
        quotation_id
    }
}

pub fn id_of(value: &Value) -> String {
    value["id"]
        .as_str()
        .unwrap_or_else(|| panic!("no id in {value}"))
        .to_string()
}

pub fn token_of(response: &Response) -> String {
    response.body["access_token"]
        .as_str()
        .unwrap_or_else(|| panic!("no token in {}", response.body))
        .to_string()
}

/// Field names reported in a 422 body
pub fn error_fields(response: &Response) -> Vec<String> {
    response.body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn unique_suffix() -> String {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed).to_string()
}
