//! Tenant and user directories.
//!
//! The session state machine deals in identifiers; resolving an identifier
//! to a domain record (and enumerating all tenants for per-tenant runs) is
//! the host application's business. It supplies implementations of
//! [`TenantDirectory`] and [`UserDirectory`] through [`crate::RlsConfig`].
//! When no directory is configured, lookups simply resolve to `None`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Result;

/// A tenant as resolved by the host application's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Data-scoping identifier placed in `rls.tenant_id`, carried as text.
    pub id: String,
    /// Human-readable name, when the directory has one.
    pub name: Option<String>,
}

impl Tenant {
    /// Create a tenant record from an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Create a tenant record with a display name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// A user as resolved by the host application's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier placed in `rls.user_id`, carried as text.
    pub id: String,
    /// Human-readable name, when the directory has one.
    pub name: Option<String>,
}

impl User {
    /// Create a user record from an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Resolves tenant identifiers and enumerates tenants.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find one tenant by its identifier; `None` when unknown.
    async fn find(&self, id: &str) -> Result<Option<Tenant>>;

    /// All tenants, in the order per-tenant runs should visit them.
    async fn all(&self) -> Result<Vec<Tenant>>;
}

/// Resolves user identifiers.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find one user by its identifier; `None` when unknown.
    async fn find(&self, id: &str) -> Result<Option<User>>;
}

/// Errors that can occur while resolving tenants or users.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory backend failed to answer a lookup.
    #[error("Directory lookup failed: {reason}")]
    LookupFailed {
        /// Description of the lookup failure
        reason: String,
    },
}

// Conversion from DirectoryError to the main Error type
impl From<DirectoryError> for crate::Error {
    fn from(err: DirectoryError) -> Self {
        crate::Error::Directory(err)
    }
}
