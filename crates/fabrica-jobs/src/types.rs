use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Closed enumeration of queue names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    Email,
    Analysis,
    Reports,
    Notifications,
}

impl QueueName {
    /// Every known queue, in a stable order.
    pub const ALL: [QueueName; 4] = [
        QueueName::Email,
        QueueName::Analysis,
        QueueName::Reports,
        QueueName::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Email => "email",
            QueueName::Analysis => "analysis",
            QueueName::Reports => "reports",
            QueueName::Notifications => "notifications",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(QueueName::Email),
            "analysis" => Some(QueueName::Analysis),
            "reports" => Some(QueueName::Reports),
            "notifications" => Some(QueueName::Notifications),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Waiting,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
        JobState::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "delayed" => Some(JobState::Delayed),
            _ => None,
        }
    }

    /// Terminal states retain a bounded number of jobs and are the only ones
    /// eligible for cleaning.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery priority. Lower ordinal is delivered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    High,
    Normal,
    Low,
}

impl JobPriority {
    /// Ordinal used for delivery ordering.
    pub fn ordinal(&self) -> u8 {
        match self {
            JobPriority::High => 1,
            JobPriority::Normal => 5,
            JobPriority::Low => 10,
        }
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

/// A unit of asynchronous work submitted to a named queue.
///
/// Mutated by the worker process that consumes it; the broker only creates
/// jobs and the tracker inspects or re-enqueues them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub queue: QueueName,
    pub kind: String,
    pub payload: serde_json::Value,
    pub priority: JobPriority,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub state: JobState,
    /// Completion percentage, 0-100.
    pub progress: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub processed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub finished_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}

/// Read-only per-queue aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub name: QueueName,
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub total: u64,
    pub backend_available: bool,
}

impl QueueStats {
    /// Zeroed record reported when the backend is unavailable.
    pub fn unavailable(name: QueueName) -> Self {
        Self {
            name,
            waiting: 0,
            active: 0,
            completed: 0,
            failed: 0,
            delayed: 0,
            total: 0,
            backend_available: false,
        }
    }
}

/// Per-queue policy: retention, retry and backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePolicy {
    /// Completed jobs retained before the oldest are purged.
    #[serde(default = "default_keep_completed")]
    pub keep_completed: usize,

    /// Failed jobs retained before the oldest are purged.
    #[serde(default = "default_keep_failed")]
    pub keep_failed: usize,

    /// Delivery attempts before a job stays failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_keep_completed() -> usize {
    100
}

fn default_keep_failed() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            keep_completed: default_keep_completed(),
            keep_failed: default_keep_failed(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl QueuePolicy {
    /// Delay before the given retry, doubling from the base.
    /// `attempts_made` is the number of attempts already delivered.
    pub fn backoff_delay(&self, attempts_made: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempts_made.saturating_sub(1));
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}
