use std::sync::Arc;

use fabrica_jobs::JobStatusTracker;

use crate::health::HealthAggregator;

/// Shared state handed to every request handler.
pub struct AppState {
    pub tracker: Arc<JobStatusTracker>,
    pub health: HealthAggregator,
}
