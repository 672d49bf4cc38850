//! Redis-backed queue storage.
//!
//! Layout per queue:
//! - `fabrica:jobs:{queue}:job:{id}` — job record as JSON
//! - `fabrica:jobs:{queue}:state:{state}` — sorted set of job ids
//! - `fabrica:jobs:{queue}:seq` — enqueue sequence counter
//!
//! Waiting jobs are scored by priority ordinal then enqueue sequence, so
//! workers popping the lowest score get priority order with ties broken by
//! enqueue order. Terminal states are scored by finish time, which makes
//! grace-based cleaning and oldest-first trimming range queries.

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use time::OffsetDateTime;

use crate::error::{JobError, Result};
use crate::storage::QueueStorage;
use crate::types::{Job, JobState, QueueName};

// Priority occupies the high digits, sequence the low ones.
const PRIORITY_STRIDE: f64 = 1e12;

pub struct RedisQueueStorage {
    pool: Pool,
}

impl RedisQueueStorage {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| JobError::storage(e.to_string()))
    }

    fn record_key(queue: QueueName, id: &str) -> String {
        format!("fabrica:jobs:{queue}:job:{id}")
    }

    fn state_key(queue: QueueName, state: JobState) -> String {
        format!("fabrica:jobs:{queue}:state:{state}")
    }

    fn seq_key(queue: QueueName) -> String {
        format!("fabrica:jobs:{queue}:seq")
    }

    /// Score for a job's state index entry.
    async fn score_for(&self, conn: &mut Connection, job: &Job) -> Result<f64> {
        match job.state {
            JobState::Waiting => {
                let seq: u64 = conn.incr(Self::seq_key(job.queue), 1).await?;
                Ok(f64::from(job.priority.ordinal()) * PRIORITY_STRIDE + seq as f64)
            }
            JobState::Completed | JobState::Failed => {
                let finished = job.finished_at.unwrap_or_else(OffsetDateTime::now_utc);
                Ok(finished.unix_timestamp() as f64)
            }
            JobState::Active | JobState::Delayed => {
                Ok(OffsetDateTime::now_utc().unix_timestamp() as f64)
            }
        }
    }

    async fn write_job(&self, job: &Job) -> Result<()> {
        let mut conn = self.connection().await?;
        let record = serde_json::to_string(job)?;
        let score = self.score_for(&mut conn, job).await?;

        let mut pipe = redis::pipe();
        pipe.set(Self::record_key(job.queue, &job.id), record);
        for state in JobState::ALL {
            if state != job.state {
                pipe.zrem(Self::state_key(job.queue, state), &job.id);
            }
        }
        pipe.zadd(Self::state_key(job.queue, job.state), &job.id, score);
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn remove_ids(
        &self,
        conn: &mut Connection,
        queue: QueueName,
        state: JobState,
        ids: &[String],
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut pipe = redis::pipe();
        pipe.zrem(Self::state_key(queue, state), ids);
        for id in ids {
            pipe.del(Self::record_key(queue, id));
        }
        pipe.query_async::<()>(conn).await?;
        Ok(ids.len() as u64)
    }

    async fn load_records(
        &self,
        conn: &mut Connection,
        queue: QueueName,
        ids: &[String],
    ) -> Result<Vec<Job>> {
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let record: Option<String> = conn.get(Self::record_key(queue, id)).await?;
            match record.as_deref().map(serde_json::from_str::<Job>) {
                Some(Ok(job)) => jobs.push(job),
                Some(Err(e)) => {
                    tracing::warn!(queue = %queue, id = %id, error = %e, "skipping malformed job record");
                }
                None => {
                    tracing::debug!(queue = %queue, id = %id, "job record missing for indexed id");
                }
            }
        }
        Ok(jobs)
    }
}

#[async_trait]
impl QueueStorage for RedisQueueStorage {
    async fn insert_job(&self, job: &Job) -> Result<()> {
        self.write_job(job).await
    }

    async fn fetch_job(&self, queue: QueueName, id: &str) -> Result<Option<Job>> {
        let mut conn = self.connection().await?;
        let record: Option<String> = conn.get(Self::record_key(queue, id)).await?;
        match record.as_deref().map(serde_json::from_str::<Job>) {
            Some(Ok(job)) => Ok(Some(job)),
            Some(Err(e)) => {
                tracing::warn!(queue = %queue, id = %id, error = %e, "malformed job record");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        self.write_job(job).await
    }

    async fn jobs_in_state(
        &self,
        queue: QueueName,
        state: JobState,
        limit: usize,
    ) -> Result<Vec<Job>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrange(Self::state_key(queue, state), 0, limit as isize - 1)
            .await?;
        self.load_records(&mut conn, queue, &ids).await
    }

    async fn count_in_state(&self, queue: QueueName, state: JobState) -> Result<u64> {
        let mut conn = self.connection().await?;
        Ok(conn.zcard(Self::state_key(queue, state)).await?)
    }

    async fn remove_older_than(
        &self,
        queue: QueueName,
        state: JobState,
        older_than: OffsetDateTime,
        batch: usize,
    ) -> Result<u64> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrangebyscore_limit(
                Self::state_key(queue, state),
                f64::NEG_INFINITY,
                older_than.unix_timestamp() as f64,
                0,
                batch as isize,
            )
            .await?;
        self.remove_ids(&mut conn, queue, state, &ids).await
    }

    async fn trim_state(&self, queue: QueueName, state: JobState, keep: usize) -> Result<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.zcard(Self::state_key(queue, state)).await?;
        if count as usize <= keep {
            return Ok(0);
        }
        let excess = count as usize - keep;
        let ids: Vec<String> = conn
            .zrange(Self::state_key(queue, state), 0, excess as isize - 1)
            .await?;
        self.remove_ids(&mut conn, queue, state, &ids).await
    }

    async fn close(&self) {
        self.pool.close();
        tracing::debug!("queue storage pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobPriority;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            RedisQueueStorage::record_key(QueueName::Email, "j1"),
            "fabrica:jobs:email:job:j1"
        );
        assert_eq!(
            RedisQueueStorage::state_key(QueueName::Reports, JobState::Failed),
            "fabrica:jobs:reports:state:failed"
        );
        assert_eq!(
            RedisQueueStorage::seq_key(QueueName::Analysis),
            "fabrica:jobs:analysis:seq"
        );
    }

    #[test]
    fn test_priority_stride_orders_before_sequence() {
        // Any high-priority score sorts before any normal-priority score as
        // long as sequences stay under the stride.
        let high = f64::from(JobPriority::High.ordinal()) * PRIORITY_STRIDE + 999_999.0;
        let normal = f64::from(JobPriority::Normal.ordinal()) * PRIORITY_STRIDE + 1.0;
        assert!(high < normal);
    }
}
