mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{acme, analyzer, dispatcher, ScriptedProvider, StaticFetcher};
use component_forge::scrape::FetchError;
use component_forge::server::{router, AppState};
use component_forge::{Analyzer, Config, ProviderName};
use serde_json::{json, Value};
use tower::ServiceExt;

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_analyze_without_providers_succeeds_with_fallback() {
    let app = router(AppState::new(analyzer(acme(), vec![]), 60), &Config::default());

    let resp = app.oneshot(post("/api/analyze", json!({"url": "acme.test"}))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["aiProvider"], "fallback");
    assert_eq!(body["analysis"]["title"], "Acme Inc");
}

#[tokio::test]
async fn test_analyze_requires_url() {
    let app = router(AppState::new(analyzer(acme(), vec![]), 60), &Config::default());

    let resp = app.oneshot(post("/api/analyze", json!({"url": "  "}))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["success"], false);
}

#[tokio::test]
async fn test_fetch_failure_maps_to_bad_gateway() {
    let analyzer = Analyzer::new(
        Arc::new(StaticFetcher(Err(FetchError::Network("connection refused".into())))),
        dispatcher(vec![]),
    );
    let app = router(AppState::new(analyzer, 60), &Config::default());

    let resp = app.oneshot(post("/api/analyze", json!({"url": "acme.test"}))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_providers_lists_priority_order() {
    let groq = ScriptedProvider::always(ProviderName::Groq, 1, Ok("{}".into()));
    let google = ScriptedProvider::always(ProviderName::Google, 4, Ok("{}".into()));
    let app = router(AppState::new(analyzer(acme(), vec![google, groq]), 60), &Config::default());

    let resp = app
        .oneshot(Request::get("/api/providers").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = json_body(resp).await;
    assert_eq!(body["activeProvider"], "groq");
    assert_eq!(body["providers"][1]["name"], "google");
    assert_eq!(body["providers"][1]["priority"], 4);
}

#[tokio::test]
async fn test_generate_components_endpoint() {
    let app = router(AppState::new(analyzer(acme(), vec![]), 60), &Config::default());
    let analysis = component_forge::fallback::fallback_analysis(&acme(), 0);

    let resp = app
        .oneshot(post("/api/generate-components", json!({ "analysis": analysis })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["aiProvider"], "fallback");
    assert_eq!(body["components"][0]["name"], "Header");
}

#[tokio::test]
async fn test_rate_limit() {
    let app = router(AppState::new(analyzer(acme(), vec![]), 1), &Config::default());

    let first = app
        .clone()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let second = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
