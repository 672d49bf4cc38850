//! Queue inspection and maintenance endpoints.
//!
//! Read endpoints degrade with the backend: zeroed stats and empty listings
//! when the store is down. Mutations surface real errors mapped to HTTP
//! status codes.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fabrica_jobs::{DEFAULT_LIST_LIMIT, JobError, JobState, QueueName};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_queue(name: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Unknown queue: {name}"))
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let status = match &err {
            JobError::NotFound { .. } => StatusCode::NOT_FOUND,
            JobError::InvalidState { .. } => StatusCode::CONFLICT,
            JobError::NotTerminal(_) => StatusCode::BAD_REQUEST,
            JobError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            JobError::Storage(_) | JobError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

fn parse_queue(name: &str) -> Result<QueueName, ApiError> {
    QueueName::parse(name).ok_or_else(|| ApiError::unknown_queue(name))
}

fn parse_state(name: &str) -> Result<JobState, ApiError> {
    JobState::parse(name)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, format!("Unknown job state: {name}")))
}

pub async fn all_queues_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.tracker.get_all_queues_stats().await;
    (StatusCode::OK, Json(json!({ "queues": stats })))
}

pub async fn queue_stats(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = parse_queue(&queue)?;
    let stats = state.tracker.get_queue_stats(queue).await;
    Ok((StatusCode::OK, Json(stats)))
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_list_state")]
    state: String,
    limit: Option<usize>,
}

fn default_list_state() -> String {
    "waiting".to_string()
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = parse_queue(&queue)?;
    let job_state = parse_state(&query.state)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let jobs = state.tracker.list_jobs(queue, job_state, limit).await;
    Ok((StatusCode::OK, Json(json!({ "jobs": jobs }))))
}

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = parse_queue(&queue)?;
    let job = state.tracker.get_job_status(queue, &id).await?;
    Ok((StatusCode::OK, Json(job)))
}

pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = parse_queue(&queue)?;
    let job = state.tracker.retry_job(queue, &id).await?;
    Ok((StatusCode::OK, Json(job)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanQueueRequest {
    /// Only jobs that finished at least this many seconds ago are removed.
    #[serde(default)]
    grace_seconds: u64,
    state: String,
}

pub async fn clean_queue(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
    Json(request): Json<CleanQueueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = parse_queue(&queue)?;
    let job_state = parse_state(&request.state)?;
    let grace = Duration::from_secs(request.grace_seconds);

    let removed = state.tracker.clean_queue(queue, grace, job_state).await?;
    Ok((StatusCode::OK, Json(json!({ "removed": removed }))))
}
