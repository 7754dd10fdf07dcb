//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use leibniz_core::clock::Clock;
use leibniz_core::storage::Storage;
use leibniz_store::MemStorage;
use leibniz_story::application::command_handlers;
use leibniz_story::content;
use leibniz_story::domain::graph::{DanglingPolicy, StoryGraph};
use leibniz_test_support::{FailingStorage, FixedClock, fixed_now};
use tower::ServiceExt;

use leibniz_api::build_router;
use leibniz_api::state::AppState;

fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(fixed_now()))
}

fn genesis_graph() -> Arc<StoryGraph> {
    let nodes = content::genesis_nodes().unwrap();
    Arc::new(StoryGraph::build(nodes, DanglingPolicy::Warn).unwrap())
}

/// Build the full app router over the shipped story, in-memory storage, and a
/// fixed clock. Clones of the returned router share state.
pub async fn build_test_app() -> Router {
    let clock = fixed_clock();
    let graph = genesis_graph();
    let storage: Arc<dyn Storage> = Arc::new(MemStorage::new(Arc::clone(&clock)));
    command_handlers::publish_story(&graph, storage.as_ref())
        .await
        .unwrap();

    build_router(AppState::new(graph, storage, clock))
}

/// Build the full app router over storage that refuses every call.
pub fn build_failing_app() -> Router {
    build_router(AppState::new(
        genesis_graph(),
        Arc::new(FailingStorage),
        fixed_clock(),
    ))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Extractor rejections answer with plain text.
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, json_request("POST", uri, body)).await
}

/// Send a PATCH request with a JSON body and return the response.
pub async fn patch_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, json_request("PATCH", uri, body)).await
}

/// Make a choice for `user_id` and return the response.
pub async fn choose(
    app: &Router,
    user_id: &str,
    node_id: &str,
    choice_id: &str,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app.clone(),
        "/api/story/choice",
        &serde_json::json!({ "userId": user_id, "nodeId": node_id, "choiceId": choice_id }),
    )
    .await
}
