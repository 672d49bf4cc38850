//! Background job broker for the Fabrica server.
//!
//! Producer-side enqueue over named queues plus an inspection surface for
//! operations. Workers consuming the queues are external collaborators.
//!
//! ## Graceful Degradation
//!
//! The broker only hands out queue handles when the external store was
//! reachable at startup. When it was not, `queue()` returns `None` and
//! producers skip the job and proceed; inspection degrades to zeroed stats.
//! End users lose queued side effects (emails, analyses) but every
//! synchronous path keeps working.

pub mod broker;
pub mod error;
pub mod payload;
pub mod redis_storage;
pub mod storage;
pub mod tracker;
pub mod types;

pub use broker::{JobBroker, Queue};
pub use error::JobError;
pub use payload::{
    AnalysisJob, AnalysisJobKind, DateRange, EmailJob, EmailJobKind, JobPayload, NotificationJob,
    NotificationJobKind, Recipient, ReportJob, ReportJobKind,
};
pub use redis_storage::RedisQueueStorage;
pub use storage::{InMemoryQueueStorage, QueueStorage};
pub use tracker::{DEFAULT_LIST_LIMIT, JobStatusTracker};
pub use types::{Job, JobPriority, JobState, QueueName, QueuePolicy, QueueStats};
