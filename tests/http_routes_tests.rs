//! HTTP surface tests: a real router on a loopback port driven by reqwest
//!
//! The client keeps the session cookie by hand and never follows redirects,
//! so every hop of the check-in flow is asserted.

mod fixtures;

use checkin_desk::app::build_store;
use checkin_desk::config::CheckinConfig;
use checkin_desk::http::{build_router, AppState};
use checkin_desk::registry::{InMemoryRegistry, RegistryStore};
use checkin_desk::session::SessionCodec;
use fixtures::*;
use reqwest::header::{ACCEPT, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

const COOKIE_NAME: &str = "checkin_session";

/// Minimal browser: one cookie jar entry, no redirect following
struct Browser {
    client: reqwest::Client,
    base: String,
    cookie: Option<String>,
}

impl Browser {
    async fn launch(store: Arc<InMemoryRegistry>) -> Self {
        Self::launch_with(store).await
    }

    async fn launch_with(store: Arc<dyn RegistryStore>) -> Self {
        let sessions = SessionCodec::new(b"integration-secret", COOKIE_NAME, 3600, false);
        let state = AppState::new(workflow(store), sessions);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        Self {
            client: reqwest::Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .unwrap(),
            base: format!("http://{address}"),
            cookie: None,
        }
    }

    fn keep_cookie(&mut self, response: &Response) {
        if let Some(value) = response.headers().get(SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base, path));
        match &self.cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    async fn get(&mut self, path: &str) -> Response {
        let response = self.request(reqwest::Method::GET, path).send().await.unwrap();
        self.keep_cookie(&response);
        response
    }

    async fn post_form(&mut self, path: &str, form: &[(&str, &str)]) -> Response {
        let response = self
            .request(reqwest::Method::POST, path)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .form(form)
            .send()
            .await
            .unwrap();
        self.keep_cookie(&response);
        response
    }

    async fn post_json(&mut self, path: &str, body: Value) -> Response {
        let response = self
            .request(reqwest::Method::POST, path)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .unwrap();
        self.keep_cookie(&response);
        response
    }
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let mut browser = Browser::launch(Arc::new(InMemoryRegistry::new())).await;
    let response = browser.get("/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_server_without_credentials_reports_them_per_request() {
    let store = build_store(&CheckinConfig::default(), false).unwrap();
    let mut browser = Browser::launch_with(store).await;

    // Unreadable registry reads as empty, so the visitor is asked to register
    let response = browser.post_form("/", &[("documento", "123")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/nuevo-registro");

    let page = browser.get("/nuevo-registro").await.text().await.unwrap();
    assert!(page.contains(r#"class="alert alert-danger""#));
    assert!(page.contains("GOOGLE_CREDENTIALS_JSON is not set"));

    // Still serving
    let response = browser.get("/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_every_response_carries_session_cookie() {
    let mut browser = Browser::launch(Arc::new(InMemoryRegistry::new())).await;
    let response = browser.get("/").await;

    let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("checkin_session=v1."));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_full_checkin_of_new_registrant() {
    let store = Arc::new(InMemoryRegistry::new());
    let mut browser = Browser::launch(store.clone()).await;

    let response = browser.post_form("/", &[("documento", "123")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/nuevo-registro");

    let page = browser.get("/nuevo-registro").await.text().await.unwrap();
    assert!(page.contains("<strong>123</strong>"));

    let response = browser
        .post_form("/nuevo-registro", &[("nombre", "Ana"), ("celular", "555")])
        .await;
    assert_eq!(location(&response), "/scan");

    let page = browser.get("/scan").await.text().await.unwrap();
    assert!(page.contains("<strong>Ana</strong>"));

    let response = browser.post_json("/set-codigo", json!({ "codigo": "QR1" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "ok": true }));

    let page = browser.get("/confirmar").await.text().await.unwrap();
    assert!(page.contains(r#"<span id="codigo">QR1</span>"#));

    let response = browser.post_form("/confirmar", &[]).await;
    assert_eq!(location(&response), "/");

    let page = browser.get("/").await.text().await.unwrap();
    assert!(page.contains(r#"class="alert alert-success""#));

    let rows = store.load_registrations().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].scanned_code, "QR1");
    assert_eq!(rows[0].timestamp, FIXED_TIMESTAMP);
    assert_eq!(store.people_count().await, 1);
}

#[tokio::test]
async fn test_duplicate_lookup_shows_existing_registration() {
    let store = Arc::new(InMemoryRegistry::seeded(
        vec![ana()],
        vec![registration(&ana(), "ABC")],
    ));
    let mut browser = Browser::launch(store).await;

    let response = browser.post_form("/", &[("documento", "123")]).await;
    assert_eq!(location(&response), "/");

    let page = browser.get("/").await.text().await.unwrap();
    assert!(page.contains(r#"class="alert alert-danger""#));
    assert!(page.contains("<strong>Code:</strong> ABC"));

    // The notice is shown once
    let page = browser.get("/").await.text().await.unwrap();
    assert!(!page.contains("last-registration"));
}

#[tokio::test]
async fn test_scan_without_lookup_redirects_home() {
    let mut browser = Browser::launch(Arc::new(InMemoryRegistry::new())).await;

    let response = browser.get("/scan").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let page = browser.get("/").await.text().await.unwrap();
    assert!(page.contains(r#"class="alert alert-warning""#));
}

#[tokio::test]
async fn test_set_code_without_code_is_rejected() {
    let mut browser = Browser::launch(store_with_people(vec![ana()])).await;
    browser.post_form("/", &[("documento", "123")]).await;

    let response = browser.post_json("/set-codigo", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_code_form_redirects_to_confirmation() {
    let mut browser = Browser::launch(store_with_people(vec![ana()])).await;
    browser.post_form("/", &[("documento", "123")]).await;

    let response = browser
        .post_form("/set-codigo", &[("manual_codigo", "TYPED-1")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/confirmar");

    let page = browser.get("/confirmar").await.text().await.unwrap();
    assert!(page.contains(r#"<span id="codigo">TYPED-1</span>"#));
}

#[tokio::test]
async fn test_code_conflict_returns_home_without_writing() {
    let store = Arc::new(InMemoryRegistry::seeded(
        vec![ana(), luis()],
        vec![registration(&luis(), "XYZ")],
    ));
    let mut browser = Browser::launch(store.clone()).await;

    browser.post_form("/", &[("documento", "123")]).await;
    browser.post_json("/set-codigo", json!({ "codigo": "XYZ" })).await;
    let response = browser.post_form("/confirmar", &[]).await;
    assert_eq!(location(&response), "/");

    let page = browser.get("/").await.text().await.unwrap();
    assert!(page.contains("This code was already used by Luis (456)"));
    assert_eq!(store.registration_count().await, 1);

    // Identity was discarded with the conflict
    let response = browser.get("/scan").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_tampered_cookie_starts_over() {
    let mut browser = Browser::launch(store_with_people(vec![ana()])).await;
    browser.post_form("/", &[("documento", "123")]).await;

    browser.cookie = browser
        .cookie
        .as_ref()
        .map(|cookie| format!("{cookie}tampered"));

    let response = browser.get("/scan").await;
    assert_eq!(location(&response), "/");
}
