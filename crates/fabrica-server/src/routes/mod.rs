//! API routes modules.
//!
//! Organized by functionality:
//! - `jobs` - Queue inspection and maintenance
//! - `system` - Health and service identity

pub mod jobs;
pub mod system;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/queues", get(jobs::all_queues_stats))
        .route("/queues/{queue}", get(jobs::queue_stats))
        .route("/queues/{queue}/jobs", get(jobs::list_jobs))
        .route("/queues/{queue}/jobs/{id}", get(jobs::job_status))
        .route("/queues/{queue}/jobs/{id}/retry", post(jobs::retry_job))
        .route("/queues/{queue}/clean", post(jobs::clean_queue))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
