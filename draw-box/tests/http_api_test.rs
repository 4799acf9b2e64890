//! HTTP API integration tests.
//!
//! Drives the full router (correlation-id layer, extractors, error mapping)
//! over an in-memory store with `axum-test`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use draw_box::api::admin::ResetBoxResponse;
use draw_box::api::draws::DrawTicketsResponse;
use draw_box::retry::RetryPolicy;
use draw_box::server::{AppState, build_router};
use draw_box::{DrawBoxService, DrawConfig};
use draw_box_core::BoxView;
use draw_box_testing::{InMemoryBoxStore, RecordingLedger, fixtures, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;

fn claimant_header() -> HeaderName {
    HeaderName::from_static("x-claimant-id")
}

fn roles_header() -> HeaderName {
    HeaderName::from_static("x-claimant-roles")
}

fn server(store: &InMemoryBoxStore) -> TestServer {
    let service = DrawBoxService::new(
        Arc::new(store.clone()),
        Arc::new(RecordingLedger::new()),
        Arc::new(test_clock()),
        &DrawConfig::with_distribution(fixtures::scenario_a_distribution()),
    )
    .with_read_retry(RetryPolicy::none());
    TestServer::new(build_router(AppState::new(service))).expect("test server")
}

async fn current_box(server: &TestServer) -> BoxView {
    server.get("/api/box").await.json::<BoxView>()
}

#[tokio::test]
async fn health_reports_version() {
    let store = InMemoryBoxStore::new();
    let response = server(&store).get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ready_follows_store_availability() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    server.get("/ready").await.assert_status_ok();

    store.set_unavailable(true);
    let response = server.get("/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["ready"], false);
}

#[tokio::test]
async fn box_state_is_never_cached_and_hides_ranks() {
    let store = InMemoryBoxStore::new();
    let response = server(&store).get("/api/box").await;

    response.assert_status_ok();
    assert_eq!(response.header("cache-control"), "no-store");
    let body: Value = response.json();
    let tickets = body["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 5);
    assert!(tickets.iter().all(|t| t["rank"].is_null() && t["taken"] == false));
    assert_eq!(
        body["prize_info"],
        json!([
            {"rank": "A", "remaining": 2, "total_quantity": 2},
            {"rank": "B", "remaining": 3, "total_quantity": 3}
        ])
    );
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let store = InMemoryBoxStore::new();
    let id = "7d444840-9dc0-11d1-b245-5ffdce74fad2";
    let response = server(&store)
        .get("/api/box")
        .add_header(HeaderName::from_static("x-correlation-id"), HeaderValue::from_static(id))
        .await;
    assert_eq!(response.header("x-correlation-id"), id);
}

#[tokio::test]
async fn draw_requires_caller_identity() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let view = current_box(&server).await;

    let response = server
        .post(&format!("/api/box/{}/draws", view.box_id))
        .json(&json!({"positions": [0]}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn draw_then_conflict() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let view = current_box(&server).await;
    let path = format!("/api/box/{}/draws", view.box_id);

    let response = server
        .post(&path)
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [3, 1]}))
        .await;
    response.assert_status_ok();
    let drawn: DrawTicketsResponse = response.json();
    assert_eq!(drawn.box_id, view.box_id);
    let positions: Vec<u32> = drawn.tickets.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![1, 3]);
    assert!(drawn.tickets.iter().all(|t| t.taken));

    let conflict = server
        .post(&path)
        .add_header(claimant_header(), HeaderValue::from_static("bob"))
        .json(&json!({"positions": [0, 1]}))
        .await;
    conflict.assert_status(StatusCode::CONFLICT);
    let body: Value = conflict.json();
    assert_eq!(body["code"], "ALREADY_TAKEN");
    assert_eq!(body["positions"], json!([1]));

    let after = current_box(&server).await;
    assert!(!after.tickets[0].taken);
    assert_eq!(after.tickets[1].rank, Some(drawn.tickets[0].rank.clone()));
}

#[tokio::test]
async fn draw_errors_map_to_statuses() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let view = current_box(&server).await;

    let out_of_range = server
        .post(&format!("/api/box/{}/draws", view.box_id))
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [99]}))
        .await;
    out_of_range.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(out_of_range.json::<Value>()["code"], "INVALID_REQUEST");

    let missing = server
        .post(&format!("/api/box/{}/draws", uuid::Uuid::new_v4()))
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [0]}))
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["code"], "BOX_NOT_FOUND");

    store.set_unavailable(true);
    let unavailable = server
        .post(&format!("/api/box/{}/draws", view.box_id))
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [0]}))
        .await;
    unavailable.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(unavailable.json::<Value>()["code"], "STORAGE_UNAVAILABLE");
}

#[tokio::test]
async fn malformed_draw_requests_use_error_body() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let view = current_box(&server).await;

    let bad_id = server
        .post("/api/box/not-a-box/draws")
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [0]}))
        .await;
    bad_id.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.json::<Value>()["code"], "INVALID_REQUEST");

    let bad_body = server
        .post(&format!("/api/box/{}/draws", view.box_id))
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": "zero"}))
        .await;
    bad_body.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = bad_body.json::<Value>();
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["message"].is_string());

    assert_eq!(current_box(&server).await.remaining(), 5);
}

#[tokio::test]
async fn reset_requires_admin_role() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let body = json!({"prize_distribution": [{"rank": "A", "total_quantity": 1}]});

    server
        .post("/api/admin/box/reset")
        .add_header(claimant_header(), HeaderValue::from_static("mallory"))
        .json(&body)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post("/api/admin/box/reset")
        .json(&body)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(store.box_count(), 0);
}

#[tokio::test]
async fn reset_creates_new_box_and_retires_old() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let old = current_box(&server).await;

    let response = server
        .post("/api/admin/box/reset")
        .add_header(claimant_header(), HeaderValue::from_static("ops"))
        .add_header(roles_header(), HeaderValue::from_static("player, admin"))
        .json(&json!({"prize_distribution": [{"rank": "A", "total_quantity": 1}]}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: ResetBoxResponse = response.json();
    assert_ne!(created.box_id, old.box_id);

    let view = current_box(&server).await;
    assert_eq!(view.box_id, created.box_id);
    assert_eq!(view.tickets.len(), 1);

    let stale = server
        .post(&format!("/api/box/{}/draws", old.box_id))
        .add_header(claimant_header(), HeaderValue::from_static("alice"))
        .json(&json!({"positions": [0]}))
        .await;
    stale.assert_status(StatusCode::CONFLICT);
    assert_eq!(stale.json::<Value>()["code"], "BOX_INACTIVE");
}

#[tokio::test]
async fn invalid_distribution_is_rejected_without_changes() {
    let store = InMemoryBoxStore::new();
    let server = server(&store);
    let old = current_box(&server).await;

    let response = server
        .post("/api/admin/box/reset")
        .add_header(claimant_header(), HeaderValue::from_static("ops"))
        .add_header(roles_header(), HeaderValue::from_static("admin"))
        .json(&json!({"prize_distribution": [{"rank": "A", "total_quantity": -1}]}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "INVALID_DISTRIBUTION");

    assert_eq!(current_box(&server).await.box_id, old.box_id);
    assert_eq!(store.box_count(), 1);
}
