//! Job broker: named queues of background work.
//!
//! The broker owns the queue registry and its lifetime ends with an explicit
//! [`JobBroker::shutdown`]. Queues are created lazily, at most once per name,
//! and only when the external store was reachable at startup. When it was
//! not, [`JobBroker::queue`] returns `None` and every producer skips its job
//! and proceeds — the degrade-not-fail contract of the whole subsystem.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use fabrica_cache::CapabilityProbe;
use fabrica_core::{generate_id, now_utc};

use crate::error::{JobError, Result};
use crate::payload::JobPayload;
use crate::redis_storage::RedisQueueStorage;
use crate::storage::QueueStorage;
use crate::types::{Job, JobPriority, JobState, QueueName, QueuePolicy};

/// Shared between the broker and its queue handles so shutdown can stop new
/// enqueues and wait for in-flight store operations.
struct BrokerShared {
    accepting: AtomicBool,
    in_flight: AtomicUsize,
}

struct InFlightGuard<'a> {
    shared: &'a BrokerShared,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(shared: &'a BrokerShared) -> Result<Self> {
        if !shared.accepting.load(Ordering::Acquire) {
            return Err(JobError::ShuttingDown);
        }
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(Self { shared })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Producer-side handle to one named queue.
pub struct Queue {
    name: QueueName,
    storage: Arc<dyn QueueStorage>,
    policy: QueuePolicy,
    shared: Arc<BrokerShared>,
}

impl Queue {
    pub fn name(&self) -> QueueName {
        self.name
    }

    /// Enqueue a job. Returns the created job snapshot in `waiting` state.
    pub async fn enqueue(
        &self,
        kind: &str,
        payload: serde_json::Value,
        priority: JobPriority,
    ) -> Result<Job> {
        let _guard = InFlightGuard::acquire(&self.shared)?;

        let job = Job {
            id: generate_id(),
            queue: self.name,
            kind: kind.to_string(),
            payload,
            priority,
            attempts_made: 0,
            max_attempts: self.policy.max_attempts,
            state: JobState::Waiting,
            progress: 0,
            created_at: now_utc(),
            processed_at: None,
            finished_at: None,
            failure_reason: None,
        };

        self.storage.insert_job(&job).await?;
        tracing::debug!(queue = %self.name, job_id = %job.id, kind = %kind, "job enqueued");

        // Housekeeping: bound terminal-state retention. Failures here must
        // not fail the enqueue that triggered them.
        for (state, keep) in [
            (JobState::Completed, self.policy.keep_completed),
            (JobState::Failed, self.policy.keep_failed),
        ] {
            if let Err(e) = self.storage.trim_state(self.name, state, keep).await {
                tracing::warn!(queue = %self.name, state = %state, error = %e, "retention trim failed");
            }
        }

        Ok(job)
    }
}

/// Broker over all named queues.
pub struct JobBroker {
    storage: Option<Arc<dyn QueueStorage>>,
    policy: QueuePolicy,
    queues: DashMap<QueueName, Arc<Queue>>,
    shared: Arc<BrokerShared>,
}

impl JobBroker {
    /// Construct the broker from the capability probe's verdict. With the
    /// store unreachable the broker still exists, but hands out no queues.
    pub async fn connect(probe: &dyn CapabilityProbe, policy: QueuePolicy) -> Self {
        let state = probe.check().await;
        let storage: Option<Arc<dyn QueueStorage>> = if state.available {
            match probe.pool().await {
                Some(pool) => Some(Arc::new(RedisQueueStorage::new(pool))),
                None => None,
            }
        } else {
            None
        };

        if storage.is_none() {
            tracing::warn!("job broker degraded: background jobs will be skipped");
        }
        Self::build(storage, policy)
    }

    /// Broker with no backend: every `queue()` call returns `None`.
    pub fn disconnected(policy: QueuePolicy) -> Self {
        Self::build(None, policy)
    }

    /// Broker over an explicit storage backend.
    pub fn with_storage(storage: Arc<dyn QueueStorage>, policy: QueuePolicy) -> Self {
        Self::build(Some(storage), policy)
    }

    fn build(storage: Option<Arc<dyn QueueStorage>>, policy: QueuePolicy) -> Self {
        Self {
            storage,
            policy,
            queues: DashMap::new(),
            shared: Arc::new(BrokerShared {
                accepting: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Whether the backend is available for enqueuing.
    pub fn is_available(&self) -> bool {
        self.storage.is_some() && self.shared.accepting.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    pub(crate) fn storage(&self) -> Option<Arc<dyn QueueStorage>> {
        self.storage.clone()
    }

    /// Get the handle for a named queue, creating it on first use.
    ///
    /// Returns `None` when the backend is unavailable or the broker is
    /// shutting down; callers skip the job and proceed without it.
    pub fn queue(&self, name: QueueName) -> Option<Arc<Queue>> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return None;
        }
        let storage = self.storage.clone()?;

        let queue = self
            .queues
            .entry(name)
            .or_insert_with(|| {
                tracing::debug!(queue = %name, "queue created");
                Arc::new(Queue {
                    name,
                    storage,
                    policy: self.policy.clone(),
                    shared: Arc::clone(&self.shared),
                })
            })
            .clone();
        Some(queue)
    }

    /// Enqueue a typed payload on its home queue.
    ///
    /// Returns `Ok(None)` when the backend is unavailable — the caller
    /// proceeds without the job.
    pub async fn enqueue<P: JobPayload>(
        &self,
        payload: &P,
        priority: JobPriority,
    ) -> Result<Option<Job>> {
        let Some(queue) = self.queue(P::QUEUE) else {
            tracing::debug!(queue = %P::QUEUE, "backend unavailable, skipping job");
            return Ok(None);
        };
        let kind = payload.kind();
        let value = serde_json::to_value(payload)?;
        queue.enqueue(kind, value, priority).await.map(Some)
    }

    /// Stop accepting enqueues, wait for in-flight store operations up to
    /// `timeout`, then release every per-queue resource. Remaining work is
    /// abandoned once the timeout elapses rather than blocking exit.
    pub async fn shutdown(&self, timeout: Duration) {
        self.shared.accepting.store(false, Ordering::Release);

        let deadline = tokio::time::Instant::now() + timeout;
        while self.shared.in_flight.load(Ordering::Acquire) > 0 {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    in_flight = self.shared.in_flight.load(Ordering::Acquire),
                    "shutdown timeout elapsed, abandoning in-flight operations"
                );
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        self.queues.clear();
        if let Some(storage) = &self.storage {
            storage.close().await;
        }
        tracing::info!("job broker shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{NotificationJob, NotificationJobKind};
    use crate::storage::InMemoryQueueStorage;

    fn notification() -> NotificationJob {
        NotificationJob {
            kind: NotificationJobKind::InApp,
            user_id: "u-1".to_string(),
            title: "ECO approved".to_string(),
            message: "ECO-104 was approved".to_string(),
            link: None,
        }
    }

    #[tokio::test]
    async fn test_disconnected_broker_hands_out_no_queues() {
        let broker = JobBroker::disconnected(QueuePolicy::default());
        assert!(!broker.is_available());
        for name in QueueName::ALL {
            assert!(broker.queue(name).is_none());
        }

        // Typed enqueue degrades to None, not an error
        let result = broker
            .enqueue(&notification(), JobPriority::Normal)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_queue_handles_are_memoized() {
        let storage = Arc::new(InMemoryQueueStorage::new());
        let broker = JobBroker::with_storage(storage, QueuePolicy::default());

        let first = broker.queue(QueueName::Email).unwrap();
        let second = broker.queue(QueueName::Email).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_enqueue_returns_waiting_job_with_unique_id() {
        let storage = Arc::new(InMemoryQueueStorage::new());
        let broker = JobBroker::with_storage(storage, QueuePolicy::default());

        let first = broker
            .enqueue(&notification(), JobPriority::High)
            .await
            .unwrap()
            .unwrap();
        let second = broker
            .enqueue(&notification(), JobPriority::High)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.state, JobState::Waiting);
        assert_eq!(first.queue, QueueName::Notifications);
        assert_eq!(first.kind, "in-app");
        assert_eq!(first.attempts_made, 0);
        assert_eq!(first.max_attempts, 3);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_shutdown_stops_new_enqueues() {
        let storage = Arc::new(InMemoryQueueStorage::new());
        let broker = JobBroker::with_storage(storage, QueuePolicy::default());
        let queue = broker.queue(QueueName::Email).unwrap();

        broker.shutdown(Duration::from_millis(100)).await;

        assert!(broker.queue(QueueName::Email).is_none());
        let result = queue
            .enqueue("eco-created", serde_json::json!({}), JobPriority::Normal)
            .await;
        assert!(matches!(result, Err(JobError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_enqueue_trims_terminal_retention() {
        let storage = Arc::new(InMemoryQueueStorage::new());
        let policy = QueuePolicy {
            keep_completed: 2,
            ..QueuePolicy::default()
        };
        let broker = JobBroker::with_storage(storage.clone(), policy);

        // Seed completed jobs beyond the retention bound
        for i in 0..4i64 {
            let mut job = broker
                .queue(QueueName::Reports)
                .unwrap()
                .enqueue("eco-summary", serde_json::json!({}), JobPriority::Normal)
                .await
                .unwrap();
            job.state = JobState::Completed;
            job.finished_at = Some(now_utc() - time::Duration::seconds(10 - i));
            storage.update_job(&job).await.unwrap();
        }

        // The next enqueue trims completed down to the retention bound
        broker
            .queue(QueueName::Reports)
            .unwrap()
            .enqueue("eco-summary", serde_json::json!({}), JobPriority::Normal)
            .await
            .unwrap();

        let completed = storage
            .count_in_state(QueueName::Reports, JobState::Completed)
            .await
            .unwrap();
        assert_eq!(completed, 2);
    }
}
