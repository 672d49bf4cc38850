//! HTTP surface tests over in-process wiring, no external store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use fabrica_cache::{FixedCapabilityProbe, MemoryCacheStore};
use fabrica_jobs::{
    InMemoryQueueStorage, JobBroker, JobPriority, JobStatusTracker, QueueName, QueuePolicy,
};
use fabrica_server::{AppState, HealthAggregator, routes};
use serde_json::Value;
use tower::ServiceExt;

fn app_with_memory_backend() -> (Router, Arc<JobBroker>) {
    let storage = Arc::new(InMemoryQueueStorage::new());
    let broker = Arc::new(JobBroker::with_storage(storage, QueuePolicy::default()));
    let tracker = Arc::new(JobStatusTracker::new(Arc::clone(&broker)));
    let health = HealthAggregator::new(
        Arc::new(FixedCapabilityProbe::available()),
        Arc::new(MemoryCacheStore::new()),
        Arc::clone(&tracker),
        None,
    );
    let state = Arc::new(AppState { tracker, health });
    (routes::router(state), broker)
}

fn app_degraded() -> Router {
    let broker = Arc::new(JobBroker::disconnected(QueuePolicy::default()));
    let tracker = Arc::new(JobStatusTracker::new(broker));
    let health = HealthAggregator::new(
        Arc::new(FixedCapabilityProbe::unavailable()),
        Arc::new(MemoryCacheStore::new()),
        Arc::clone(&tracker),
        None,
    );
    let state = Arc::new(AppState { tracker, health });
    routes::router(state)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_reports_ok_with_live_backend() {
    let (app, _broker) = app_with_memory_backend();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queues"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_health_stays_200_when_degraded() {
    let app = app_degraded();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["capability"]["available"], false);
}

#[tokio::test]
async fn test_queue_stats_and_listing() {
    let (app, broker) = app_with_memory_backend();
    broker
        .queue(QueueName::Email)
        .unwrap()
        .enqueue(
            "eco-created",
            serde_json::json!({"ecoId": "eco-7"}),
            JobPriority::Normal,
        )
        .await
        .unwrap();

    let (status, body) = get_json(&app, "/queues/email").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["waiting"], 1);
    assert_eq!(body["backendAvailable"], true);

    let (status, body) = get_json(&app, "/queues/email/jobs?state=waiting").await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["kind"], "eco-created");
}

#[tokio::test]
async fn test_unknown_queue_is_404() {
    let (app, _broker) = app_with_memory_backend();
    let (status, body) = get_json(&app, "/queues/bogus").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("bogus"));
}

#[tokio::test]
async fn test_job_status_round_trip_and_missing_job() {
    let (app, broker) = app_with_memory_backend();
    let job = broker
        .queue(QueueName::Analysis)
        .unwrap()
        .enqueue("risk-score", serde_json::json!({}), JobPriority::High)
        .await
        .unwrap();

    let (status, body) = get_json(&app, &format!("/queues/analysis/jobs/{}", job.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], job.id.as_str());
    assert_eq!(body["state"], "waiting");

    let (status, _) = get_json(&app, "/queues/analysis/jobs/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retry_rejects_waiting_job_with_409() {
    let (app, broker) = app_with_memory_backend();
    let job = broker
        .queue(QueueName::Reports)
        .unwrap()
        .enqueue("eco-summary", serde_json::json!({}), JobPriority::Normal)
        .await
        .unwrap();

    let (status, body) = post_json(
        &app,
        &format!("/queues/reports/jobs/{}/retry", job.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("waiting"));
}

#[tokio::test]
async fn test_clean_rejects_non_terminal_state() {
    let (app, _broker) = app_with_memory_backend();
    let (status, _) = post_json(
        &app,
        "/queues/email/clean",
        Some(serde_json::json!({"state": "active", "graceSeconds": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clean_removes_nothing_on_fresh_queue() {
    let (app, _broker) = app_with_memory_backend();
    let (status, body) = post_json(
        &app,
        "/queues/email/clean",
        Some(serde_json::json!({"state": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn test_degraded_listing_is_empty_not_error() {
    let app = app_degraded();
    let (status, body) = get_json(&app, "/queues/email/jobs?state=waiting").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["jobs"].as_array().unwrap().is_empty());

    let (status, body) = get_json(&app, "/queues").await;
    assert_eq!(status, StatusCode::OK);
    for stats in body["queues"].as_array().unwrap() {
        assert_eq!(stats["backendAvailable"], false);
        assert_eq!(stats["total"], 0);
    }
}
