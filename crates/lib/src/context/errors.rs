//! Session-context error types.

use thiserror::Error;

/// Errors raised by the session state machine itself.
///
/// Failures coming from the database surface as
/// [`crate::gateway::GatewayError`] instead; the variants here are raised
/// synchronously, before any statement is issued, and never mutate session
/// state.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContextError {
    /// `set_tenant` was called without a tenant.
    #[error("Cannot switch tenant: no tenant given")]
    MissingTenant,

    /// `set_user` was called without a user.
    #[error("Cannot switch user: no user given")]
    MissingUser,

    /// A per-tenant run was requested but no tenant directory is configured.
    #[error("Per-tenant run requires a tenant directory in the configuration")]
    NoTenantDirectory,
}

impl ContextError {
    /// Check if this error is an invalid-argument error: the caller passed
    /// a missing identifier and must supply a valid one. Never retried.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ContextError::MissingTenant | ContextError::MissingUser)
    }

    /// Check if this error reports missing configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ContextError::NoTenantDirectory)
    }
}

// Conversion from ContextError to the main Error type
impl From<ContextError> for crate::Error {
    fn from(err: ContextError) -> Self {
        crate::Error::Context(err)
    }
}
