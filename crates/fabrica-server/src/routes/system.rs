use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Fabrica Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

/// Aggregated health document. Always `200`; a degraded instance reports
/// `"status": "degraded"` in the body rather than an error status, so load
/// balancers keep routing to it.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let doc = state.health.collect().await;
    (StatusCode::OK, Json(doc))
}
