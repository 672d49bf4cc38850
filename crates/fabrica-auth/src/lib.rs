//! Authorization permission caching for the Fabrica server.
//!
//! Resolving a user's effective permissions walks roles in the relational
//! store; this crate caches the resolved grant set for a short TTL so the
//! check on every request stays cheap. Resolution failures fail closed
//! (deny by default) and never raise.

pub mod cache;
pub mod error;
pub mod permission;

pub use cache::{
    DEFAULT_PERMISSION_TTL, PermissionCache, PermissionCacheStats, PermissionSource,
};
pub use error::{AuthError, AuthResult};
pub use permission::{InvalidPermissionPattern, PermissionPattern, PermissionSet};
