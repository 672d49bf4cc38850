//! Storage contract for queued jobs.
//!
//! The broker and tracker talk to storage through this trait. Production
//! uses [`crate::redis_storage::RedisQueueStorage`]; `InMemoryQueueStorage`
//! is a test double implementing the same contract so broker and tracker
//! logic can be exercised without a live store. It is not a runtime fallback:
//! when the external store is unavailable the broker hands out no queues at
//! all.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::error::Result;
use crate::types::{Job, JobState, QueueName};

#[async_trait]
pub trait QueueStorage: Send + Sync {
    /// Persist a newly enqueued job.
    async fn insert_job(&self, job: &Job) -> Result<()>;

    /// Load one job, or `None` if it does not exist.
    async fn fetch_job(&self, queue: QueueName, id: &str) -> Result<Option<Job>>;

    /// Rewrite a job record and its state index.
    async fn update_job(&self, job: &Job) -> Result<()>;

    /// Jobs in a state, in delivery order for `waiting` (priority, then
    /// enqueue order) and oldest-first for terminal states.
    async fn jobs_in_state(
        &self,
        queue: QueueName,
        state: JobState,
        limit: usize,
    ) -> Result<Vec<Job>>;

    /// Number of jobs in a state.
    async fn count_in_state(&self, queue: QueueName, state: JobState) -> Result<u64>;

    /// Remove jobs in `state` finished before `older_than`, oldest first, up
    /// to `batch`. Returns the count removed.
    async fn remove_older_than(
        &self,
        queue: QueueName,
        state: JobState,
        older_than: OffsetDateTime,
        batch: usize,
    ) -> Result<u64>;

    /// Purge the oldest jobs in `state` beyond `keep`. Returns the count
    /// removed.
    async fn trim_state(&self, queue: QueueName, state: JobState, keep: usize) -> Result<u64>;

    /// Release storage resources.
    async fn close(&self);
}

/// Job plus its enqueue sequence number, used to break priority ties.
#[derive(Debug, Clone)]
struct StoredJob {
    job: Job,
    seq: u64,
}

/// In-memory `QueueStorage` test double.
pub struct InMemoryQueueStorage {
    jobs: DashMap<String, StoredJob>,
    seq: AtomicU64,
}

impl InMemoryQueueStorage {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    fn record_key(queue: QueueName, id: &str) -> String {
        format!("{queue}/{id}")
    }

    fn in_state(&self, queue: QueueName, state: JobState) -> Vec<StoredJob> {
        let mut jobs: Vec<StoredJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().job.queue == queue && entry.value().job.state == state)
            .map(|entry| entry.value().clone())
            .collect();

        match state {
            JobState::Waiting => {
                jobs.sort_by_key(|stored| (stored.job.priority.ordinal(), stored.seq));
            }
            JobState::Completed | JobState::Failed => {
                jobs.sort_by_key(|stored| (stored.job.finished_at, stored.seq));
            }
            _ => jobs.sort_by_key(|stored| stored.seq),
        }
        jobs
    }
}

impl Default for InMemoryQueueStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStorage for InMemoryQueueStorage {
    async fn insert_job(&self, job: &Job) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(
            Self::record_key(job.queue, &job.id),
            StoredJob {
                job: job.clone(),
                seq,
            },
        );
        Ok(())
    }

    async fn fetch_job(&self, queue: QueueName, id: &str) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .get(&Self::record_key(queue, id))
            .map(|stored| stored.job.clone()))
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        // Re-enqueued jobs take a fresh sequence number, so they line up
        // behind jobs of the same priority already waiting.
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(
            Self::record_key(job.queue, &job.id),
            StoredJob {
                job: job.clone(),
                seq,
            },
        );
        Ok(())
    }

    async fn jobs_in_state(
        &self,
        queue: QueueName,
        state: JobState,
        limit: usize,
    ) -> Result<Vec<Job>> {
        Ok(self
            .in_state(queue, state)
            .into_iter()
            .take(limit)
            .map(|stored| stored.job)
            .collect())
    }

    async fn count_in_state(&self, queue: QueueName, state: JobState) -> Result<u64> {
        Ok(self.in_state(queue, state).len() as u64)
    }

    async fn remove_older_than(
        &self,
        queue: QueueName,
        state: JobState,
        older_than: OffsetDateTime,
        batch: usize,
    ) -> Result<u64> {
        let victims: Vec<String> = self
            .in_state(queue, state)
            .into_iter()
            .filter(|stored| {
                stored
                    .job
                    .finished_at
                    .is_some_and(|finished| finished <= older_than)
            })
            .take(batch)
            .map(|stored| stored.job.id)
            .collect();

        let mut removed = 0;
        for id in victims {
            if self.jobs.remove(&Self::record_key(queue, &id)).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn trim_state(&self, queue: QueueName, state: JobState, keep: usize) -> Result<u64> {
        let jobs = self.in_state(queue, state);
        if jobs.len() <= keep {
            return Ok(0);
        }

        let excess = jobs.len() - keep;
        let mut removed = 0;
        for stored in jobs.into_iter().take(excess) {
            if self
                .jobs
                .remove(&Self::record_key(queue, &stored.job.id))
                .is_some()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn close(&self) {
        self.jobs.clear();
    }
}
