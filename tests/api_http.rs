// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST/GET /alarms, DELETE /alarms/{id}
// - GET/DELETE /notifications

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use daily_brief::sources::fixture::{FixedNews, FixedStats, FixedWeather};
use daily_brief::sources::{Headline, Location, Sources, WeatherReport};
use daily_brief::speech::RecordingSpeech;
use daily_brief::{create_router, AppState, Assistant};

const BODY_LIMIT: usize = 1024 * 1024;

/// Router over offline fixture sources.
fn test_router() -> Router {
    let sources = Sources::new(
        Arc::new(FixedWeather::from_fixture(Some(WeatherReport {
            description: "clear sky".into(),
            temperature: 18.0,
            feels_like: 17.5,
            humidity: 60.0,
        }))),
        Arc::new(FixedNews::from_fixture(vec![
            Headline::new("Rail strike called off", "Unions agree deal"),
            Headline::new("Rail strike called off", "Unions agree deal"),
            Headline::new("Floods in Somerset", "Roads closed"),
        ])),
        Arc::new(FixedStats::unavailable()),
        Location::default(),
    );
    let assistant = Assistant::new(sources, Arc::new(RecordingSpeech::new()));
    create_router(AppState::new(Arc::new(assistant)))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let (status, bytes) = send(app, req).await;
    let v: Json = serde_json::from_slice(&bytes).expect("parse json");
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("build DELETE")
}

fn post_alarm(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/alarms")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /alarms")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let (status, bytes) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).expect("utf8"), "ok");
}

#[tokio::test]
async fn alarm_lifecycle_over_http() {
    let app = test_router();
    let when = (Utc::now() + Duration::hours(12)).timestamp();

    let (status, v) = send_json(
        &app,
        post_alarm(json!({
            "time": when,
            "title": "Morning brief",
            "include_news": true,
            "include_weather": false
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");
    let id = v["data"]["alarm_id"].as_str().expect("alarm_id").to_string();
    assert!(!id.is_empty());

    let (status, v) = send_json(&app, get("/alarms")).await;
    assert_eq!(status, StatusCode::OK);
    let alarms = v["data"].as_array().expect("array");
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0]["id"], id.as_str());
    assert_eq!(alarms[0]["meta"]["title"], "Morning brief");
    assert_eq!(alarms[0]["meta"]["include_news"], true);
    assert_eq!(alarms[0]["meta"]["include_weather"], false);

    let (status, v) = send_json(&app, delete(&format!("/alarms/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");

    // Second cancel of the same id is rejected.
    let (status, v) = send_json(&app, delete(&format!("/alarms/{id}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["status"], "error");
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");
    assert_eq!(v["data"]["details"], "The alarm does not exist.");

    let (_, v) = send_json(&app, get("/alarms")).await;
    assert!(v["data"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn cancel_unknown_alarm_is_bad_request() {
    let app = test_router();
    let (status, v) = send_json(&app, delete("/alarms/not-a-real-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn invalid_alarm_requests_are_rejected() {
    let app = test_router();

    let (status, v) = send_json(&app, post_alarm(json!({ "time": i64::MAX, "title": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");

    let (status, v) = send_json(&app, post_alarm(json!({ "time": 0, "title": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");

    let (_, v) = send_json(&app, get("/alarms")).await;
    assert!(v["data"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn notifications_refresh_dedup_and_dismiss() {
    let app = test_router();

    let (status, v) = send_json(&app, get("/notifications")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["data"].as_array().expect("array").is_empty());

    // Stats are down: weather plus two distinct headlines.
    let (_, v) = send_json(&app, get("/notifications?refresh=true")).await;
    let titles: Vec<_> = v["data"]
        .as_array()
        .expect("array")
        .iter()
        .map(|n| n["title"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(titles.len(), 3, "got {titles:?}");
    assert!(titles.iter().any(|t| t == "Current weather"));
    assert_eq!(titles.iter().filter(|t| *t == "Rail strike called off").count(), 1);

    let (status, v) = send_json(
        &app,
        delete("/notifications?title=Rail%20strike%20called%20off"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "success");

    let (_, v) = send_json(&app, get("/notifications?refresh=true")).await;
    let items = v["data"].as_array().expect("array");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|n| n["title"] != "Rail strike called off"));

    // Unknown titles are accepted and change nothing.
    let (status, _) = send_json(&app, delete("/notifications?title=nothing")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, v) = send_json(&app, get("/notifications")).await;
    assert_eq!(v["data"].as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = test_router();

    // Missing title.
    let (status, v) = send_json(&app, post_alarm(json!({ "time": 100 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["status"], "error");
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");
    assert!(v["data"]["details"].as_str().unwrap_or_default().contains("title"));

    // Not JSON at all.
    let req = Request::builder()
        .method("POST")
        .uri("/alarms")
        .header("content-type", "application/json")
        .body(Body::from("{ nope"))
        .expect("build POST /alarms");
    let (status, v) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");

    let (status, v) = send_json(&app, delete("/notifications")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");

    let (status, v) = send_json(&app, get("/notifications?refresh=maybe")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["data"]["error"], "INVALID_PARAMETERS");
}
