//! Fabrica server: operational HTTP surface over the cache/queue core.
//!
//! Wires the capability probe, dual-mode cache, job broker and permission
//! cache together and exposes queue inspection plus an aggregated health
//! document. Every component follows the same rule: when the external store
//! is unreachable the server degrades and keeps serving, it never refuses to
//! start.

pub mod bootstrap;
pub mod config;
pub mod health;
pub mod observability;
pub mod routes;
pub mod state;

pub use bootstrap::{Runtime, build, build_with_probe};
pub use config::AppConfig;
pub use health::{HealthAggregator, HealthDocument, HealthStatus};
pub use state::AppState;
