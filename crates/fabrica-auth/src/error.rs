use thiserror::Error;

/// Errors surfaced by the authorization source of truth.
///
/// Consumers of the permission cache never see these: resolution failures
/// fail closed into an empty permission set.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Role resolution failed: {0}")]
    RoleResolution(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Convenience result type for auth operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;
