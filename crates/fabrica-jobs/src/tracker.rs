//! Queue and job inspection.
//!
//! Read paths degrade to zeroed/empty values when the backend is unavailable
//! so the operational surface never fails just because Redis is down. The
//! mutating operations (`retry_job`, `clean_queue`) report real errors, with
//! `JobError::NotFound` as the one condition callers are expected to handle.

use std::sync::Arc;
use std::time::Duration;

use fabrica_core::now_utc;

use crate::broker::JobBroker;
use crate::error::{JobError, Result};
use crate::storage::QueueStorage;
use crate::types::{Job, JobState, QueueName, QueueStats};

/// Upper bound on jobs removed per clean call.
const CLEAN_BATCH_SIZE: usize = 1000;

/// Default limit for job listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

pub struct JobStatusTracker {
    broker: Arc<JobBroker>,
}

impl JobStatusTracker {
    pub fn new(broker: Arc<JobBroker>) -> Self {
        Self { broker }
    }

    fn storage(&self) -> Option<Arc<dyn QueueStorage>> {
        self.broker.storage()
    }

    /// Full job snapshot, or `NotFound`.
    pub async fn get_job_status(&self, queue: QueueName, id: &str) -> Result<Job> {
        let Some(storage) = self.storage() else {
            return Err(JobError::not_found(queue, id));
        };
        storage
            .fetch_job(queue, id)
            .await?
            .ok_or_else(|| JobError::not_found(queue, id))
    }

    /// Aggregate counts for one queue. Never fails: backend problems come
    /// back as a zeroed record with `backend_available = false`.
    pub async fn get_queue_stats(&self, queue: QueueName) -> QueueStats {
        let Some(storage) = self.storage() else {
            return QueueStats::unavailable(queue);
        };

        let mut counts = [0u64; 5];
        for (slot, state) in counts.iter_mut().zip(JobState::ALL) {
            match storage.count_in_state(queue, state).await {
                Ok(count) => *slot = count,
                Err(e) => {
                    tracing::warn!(queue = %queue, state = %state, error = %e, "queue stats degraded");
                    return QueueStats::unavailable(queue);
                }
            }
        }

        let [waiting, active, completed, failed, delayed] = counts;
        QueueStats {
            name: queue,
            waiting,
            active,
            completed,
            failed,
            delayed,
            total: waiting + active + completed + failed + delayed,
            backend_available: true,
        }
    }

    /// Stats for every known queue name, same degrade-to-zero behavior.
    pub async fn get_all_queues_stats(&self) -> Vec<QueueStats> {
        let mut all = Vec::with_capacity(QueueName::ALL.len());
        for queue in QueueName::ALL {
            all.push(self.get_queue_stats(queue).await);
        }
        all
    }

    /// Jobs in a state, up to `limit`. Empty when the backend is down.
    pub async fn list_jobs(&self, queue: QueueName, state: JobState, limit: usize) -> Vec<Job> {
        let Some(storage) = self.storage() else {
            return Vec::new();
        };
        match storage.jobs_in_state(queue, state, limit).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(queue = %queue, state = %state, error = %e, "job listing degraded");
                Vec::new()
            }
        }
    }

    /// Re-enqueue a failed job, preserving id and payload.
    pub async fn retry_job(&self, queue: QueueName, id: &str) -> Result<Job> {
        let Some(storage) = self.storage() else {
            return Err(JobError::not_found(queue, id));
        };
        let mut job = storage
            .fetch_job(queue, id)
            .await?
            .ok_or_else(|| JobError::not_found(queue, id))?;

        if job.state != JobState::Failed {
            return Err(JobError::InvalidState {
                queue,
                id: id.to_string(),
                state: job.state,
                expected: JobState::Failed,
            });
        }

        job.state = JobState::Waiting;
        job.attempts_made += 1;
        job.progress = 0;
        job.processed_at = None;
        job.finished_at = None;
        job.failure_reason = None;

        storage.update_job(&job).await?;
        tracing::info!(queue = %queue, job_id = %id, attempts = job.attempts_made, "job re-enqueued");
        Ok(job)
    }

    /// Remove jobs in a terminal state older than `grace`, bounded per call.
    /// Returns the count removed.
    pub async fn clean_queue(
        &self,
        queue: QueueName,
        grace: Duration,
        state: JobState,
    ) -> Result<u64> {
        if !state.is_terminal() {
            return Err(JobError::NotTerminal(state));
        }
        let Some(storage) = self.storage() else {
            return Ok(0);
        };

        let cutoff = now_utc() - grace;
        let removed = storage
            .remove_older_than(queue, state, cutoff, CLEAN_BATCH_SIZE)
            .await?;
        if removed > 0 {
            tracing::info!(queue = %queue, state = %state, removed, "queue cleaned");
        }
        Ok(removed)
    }
}
