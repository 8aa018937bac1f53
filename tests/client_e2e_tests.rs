//! End-to-end tests simulating a list screen using the typed clients
//!
//! A small axum app stands in for the REST backend so the reqwest transport
//! is exercised over real HTTP; the offline scenarios run against the
//! in-memory fallback.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use crudkit::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

// =============================================================================
// Mock Backend
// =============================================================================

#[derive(Clone)]
struct Backend {
    posts: Arc<RwLock<Vec<Value>>>,
    list_hits: Arc<AtomicUsize>,
}

impl Backend {
    fn seeded() -> Self {
        let posts = (1..=4u64)
            .map(|id| {
                json!({
                    "id": id,
                    "userId": if id <= 2 { 1 } else { 2 },
                    "title": format!("post {}", id),
                    "body": "lorem ipsum"
                })
            })
            .collect();
        Self {
            posts: Arc::new(RwLock::new(posts)),
            list_hits: Arc::new(AtomicUsize::new(0)),
        }
    }
}

async fn list_posts(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    backend.list_hits.fetch_add(1, Ordering::SeqCst);
    // Give concurrent callers a window to overlap
    tokio::time::sleep(Duration::from_millis(30)).await;

    let posts = backend.posts.read().unwrap().clone();
    let filtered: Vec<Value> = posts
        .into_iter()
        .filter(|p| match params.get("userId") {
            Some(user_id) => p["userId"].to_string() == *user_id,
            None => true,
        })
        .collect();
    Json(Value::Array(filtered))
}

async fn create_post(
    State(backend): State<Backend>,
    Json(mut draft): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut posts = backend.posts.write().unwrap();
    draft["id"] = json!(posts.len() as u64 + 101);
    posts.push(draft.clone());
    (StatusCode::CREATED, Json(draft))
}

async fn get_post(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    backend
        .posts
        .read()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_post(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut posts = backend.posts.write().unwrap();
    let post = posts
        .iter_mut()
        .find(|p| p["id"] == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    *post = body;
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let mut posts = backend.posts.write().unwrap();
    let index = posts
        .iter()
        .position(|p| p["id"] == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    posts.remove(index);
    Ok(Json(json!({})))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/slow", get(slow))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn no_retries() -> RetryConfig {
    RetryConfig {
        reads: RetryPolicy::none(),
        mutations: RetryPolicy::none(),
    }
}

async fn http_client() -> (Backend, RequestGateway, ResourceClient<Post>) {
    let backend = Backend::seeded();
    let base_url = spawn_backend(backend.clone()).await;
    let gateway = RequestGateway::new(Arc::new(ReqwestTransport::new(base_url)));
    let client = ResourceClient::<Post>::with_retry(gateway.clone(), no_retries());
    (backend, gateway, client)
}

// =============================================================================
// HTTP Tests
// =============================================================================

#[tokio::test]
async fn test_list_and_filter_over_http() {
    let (_backend, gateway, posts) = http_client().await;

    let all = posts.list(&ListQuery::new()).await.unwrap();
    assert_eq!(all.len(), 4);

    let by_user = posts
        .list(&ListQuery::new().filter("userId", "2"))
        .await
        .unwrap();
    assert_eq!(by_user.len(), 2);
    assert!(by_user.iter().all(|p| p.user_id == 2));
    assert_eq!(gateway.in_flight_count(), 0);
}

#[tokio::test]
async fn test_concurrent_list_calls_hit_backend_once() {
    let (backend, _gateway, posts) = http_client().await;

    let query_a = ListQuery::new();
    let query_b = ListQuery::new();
    let (a, b) = tokio::join!(posts.list(&query_a), posts.list(&query_b));

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.list_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_missing_post_is_404() {
    let (_backend, _gateway, posts) = http_client().await;

    let found = posts.get(&EntityId::Number(3)).await.unwrap();
    assert_eq!(found.title, "post 3");

    let err = posts.get(&EntityId::Number(42)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_create_and_update_round_trip() {
    let (backend, _gateway, posts) = http_client().await;

    let created = posts
        .create(json!({"userId": 1, "title": "foo", "body": "bar"}))
        .await
        .unwrap();
    assert_eq!(created.id(), EntityId::Number(105));

    let mut edited = created.clone();
    edited.title = "foo (edited)".to_string();
    let updated = posts.update(&created.id(), &edited).await.unwrap();
    assert_eq!(updated.title, "foo (edited)");
    assert_eq!(backend.posts.read().unwrap().len(), 5);
}

#[tokio::test]
async fn test_bulk_delete_tracks_each_id() {
    let (backend, _gateway, posts) = http_client().await;

    let mut selection = SelectionStore::new();
    selection.set_all([EntityId::Number(1), EntityId::Number(2), EntityId::Number(99)]);

    let report = posts.delete_many(selection.selected_ids()).await;

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(deleted, vec![EntityId::Number(1), EntityId::Number(2)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, EntityId::Number(99));
    assert_eq!(report.failed[0].1.status(), Some(404));
    assert_eq!(backend.posts.read().unwrap().len(), 2);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (_backend, gateway, _posts) = http_client().await;

    let err = gateway
        .request(
            HttpMethod::Get,
            "/slow",
            RequestOptions::new().timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(gateway.in_flight_count(), 0);
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop a listener so the port is known to be closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = RequestGateway::new(Arc::new(ReqwestTransport::new(format!("http://{}", addr))));
    let err = gateway
        .request(HttpMethod::Get, "/posts", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
}

// =============================================================================
// Offline Tests
// =============================================================================

const FALLBACK: &str = r#"{
    "todos": [
        {"id": 1, "userId": 1, "title": "delectus aut autem", "completed": false},
        {"id": 2, "userId": 1, "title": "quis ut nam facilis", "completed": false},
        {"id": 3, "userId": 1, "title": "fugiat veniam minus", "completed": false},
        {"id": 4, "userId": 2, "title": "et porro tempora", "completed": true}
    ],
    "calendar": [
        {"id": "evt-1", "title": "Standup", "start": "2024-05-01T09:00:00Z", "end": "2024-05-01T09:15:00Z"}
    ]
}"#;

#[tokio::test]
async fn test_offline_select_all_page_then_delete() {
    let transport = InMemoryTransport::from_json_str(FALLBACK).unwrap();
    let gateway = RequestGateway::new(Arc::new(transport.clone()));
    let todos = ResourceClient::<Todo>::with_retry(gateway, no_retries());

    let page = todos
        .list(&ListQuery::new().page(1).limit(2))
        .await
        .unwrap();
    let visible: Vec<EntityId> = page.iter().map(|t| t.id()).collect();
    assert_eq!(visible.len(), 2);

    let mut selection = SelectionStore::new();
    selection.toggle(EntityId::Number(4)); // selected on another page
    selection.toggle_all(&visible);
    assert!(selection.is_all_selected(&visible));
    assert_eq!(selection.count(), 3);

    let report = todos.delete_many(selection.selected_ids()).await;
    assert!(report.is_complete());
    selection.clear();

    let remaining = transport.records("todos").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], 3);
}

#[tokio::test]
async fn test_offline_calendar_string_ids() {
    let transport = InMemoryTransport::from_json_str(FALLBACK).unwrap();
    let gateway = RequestGateway::new(Arc::new(transport));
    let calendar = ResourceClient::<CalendarEvent>::new(gateway);

    let event = calendar.get(&EntityId::from("evt-1")).await.unwrap();
    assert_eq!(event.title, "Standup");
    assert!(!event.all_day);
}

#[tokio::test]
async fn test_cancel_pending_on_navigation() {
    let transport = InMemoryTransport::from_json_str(FALLBACK)
        .unwrap()
        .with_latency(Duration::from_secs(5));
    let gateway = RequestGateway::new(Arc::new(transport));
    let todos = ResourceClient::<Todo>::with_retry(gateway.clone(), no_retries());
    let calendar = ResourceClient::<CalendarEvent>::with_retry(gateway.clone(), no_retries());

    let todos_task = tokio::spawn({
        let todos = todos.clone();
        async move { todos.list(&ListQuery::new()).await }
    });
    let calendar_task = tokio::spawn({
        let calendar = calendar.clone();
        async move { calendar.list(&ListQuery::new()).await }
    });

    for _ in 0..200 {
        if gateway.in_flight_count() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(gateway.in_flight_count(), 2);

    assert_eq!(todos.cancel_pending(), 1);
    let err = todos_task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(gateway.in_flight_count(), 1);

    assert_eq!(gateway.cancel_all(), 1);
    assert!(calendar_task.await.unwrap().is_err());
}
