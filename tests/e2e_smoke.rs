// tests/e2e_smoke.rs
//
// End-to-end flows through the real Router: HTTP request -> gateway (wiremock
// stand-in) -> SQLite store, then a second request verifying persistence.

use axum::{
    body::{to_bytes, Body},
    Router,
};
use chrono::{TimeZone, Utc};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt; // for `oneshot` (tower 0.5 with features=["util"])
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsdesk::api::{create_router, AppState};
use newsdesk::config::AppConfig;
use newsdesk::model::RecordDraft;
use newsdesk::store::ContentStore;

async fn mock_backed_app(server: &MockServer) -> (Router, AppState) {
    let mut config = AppConfig::default();
    config.ai.api_key = "test-key".to_string();
    config.ai.chat_url = format!("{}/chat", server.uri());
    config.ai.image_url = format!("{}/images", server.uri());
    config.ai.translate_url = format!("{}/translate", server.uri());

    let store = ContentStore::connect("sqlite::memory:").await.unwrap();
    store.init_schema().await.unwrap();
    let state = AppState::new(config, store);
    (create_router(state.clone()), state)
}

async fn seed_record(state: &AppState) -> i64 {
    let draft = RecordDraft {
        title: "Gold climbs".to_string(),
        title_localized: None,
        date: Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap(),
        content: "<p>Gold climbed on weaker dollar.</p>".to_string(),
        content_localized: None,
        url: "https://news.example.com/gold".to_string(),
        author: "desk".to_string(),
        views: 0,
        source: "reuters".to_string(),
        summary: Some("Gold up, dollar down.".to_string()),
        summary_localized: None,
        score: 0.7,
        kind: "news".to_string(),
        tags: Vec::new(),
    };
    state.store.insert_record(&draft).await.unwrap()
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn smoke_translate_then_reload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [["<p>Tala bala raft.</p>", "<p>Gold climbed on weaker dollar.</p>", null]],
            null,
            "en"
        ])))
        .mount(&server)
        .await;

    let (app, state) = mock_backed_app(&server).await;
    let id = seed_record(&state).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/news/{id}/translate"))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"provider":"machine"}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["translation"], "<p>Tala bala raft.</p>");

    // The translation must survive a reload through the detail endpoint.
    let req = Request::builder()
        .method("GET")
        .uri(format!("/news/{id}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["record"]["content_localized"], "<p>Tala bala raft.</p>");
}

#[tokio::test]
async fn smoke_tag_and_illustrate_then_reload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "gold, markets" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": "https://img.example/gold.png" }]
        })))
        .mount(&server)
        .await;

    let (app, state) = mock_backed_app(&server).await;
    let id = seed_record(&state).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/news/{id}/tags"))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["tags"], json!(["gold", "markets"]));

    let req = Request::builder()
        .method("POST")
        .uri(format!("/news/{id}/images"))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"count":1}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["images"], json!(["https://img.example/gold.png"]));

    // Both enrichments must be visible on the detail view.
    let req = Request::builder()
        .method("GET")
        .uri(format!("/news/{id}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let v = json_body(resp).await;

    let tag_texts: Vec<&str> = v["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["text"].as_str().unwrap())
        .collect();
    assert_eq!(tag_texts, vec!["gold", "markets"]);

    let image_urls: Vec<&str> = v["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["image_url"].as_str().unwrap())
        .collect();
    assert_eq!(image_urls, vec!["https://img.example/gold.png"]);
}
