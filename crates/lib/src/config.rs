//! Configuration for the session state machine.

use std::fmt;
use std::sync::Arc;

use crate::directory::{TenantDirectory, UserDirectory};

/// Settings consumed by [`crate::SessionContext`].
///
/// All fields are optional in spirit: with a default config the state
/// machine still manages the three session values, but role switching
/// no-ops (no unprivileged role configured) and tenant/user lookups resolve
/// to `None` (no directories configured).
#[derive(Clone, Default)]
pub struct RlsConfig {
    /// Name of the normal, policy-enforced database role. When set, every
    /// mutating operation switches between this role and `SET ROLE NONE` to
    /// track the disable flag. When absent, role switching is a no-op.
    pub unprivileged_role: Option<String>,
    /// Emit security-relevant transitions at `info` level instead of `debug`.
    pub verbose: bool,
    /// Resolves tenant ids to domain records and lists tenants for
    /// per-tenant runs.
    pub tenants: Option<Arc<dyn TenantDirectory>>,
    /// Resolves user ids to domain records.
    pub users: Option<Arc<dyn UserDirectory>>,
}

impl RlsConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unprivileged database role name.
    pub fn with_unprivileged_role(mut self, role: impl Into<String>) -> Self {
        self.unprivileged_role = Some(role.into());
        self
    }

    /// Enable verbose transition logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the tenant directory.
    pub fn with_tenants(mut self, tenants: Arc<dyn TenantDirectory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// Set the user directory.
    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }
}

impl fmt::Debug for RlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RlsConfig")
            .field("unprivileged_role", &self.unprivileged_role)
            .field("verbose", &self.verbose)
            .field("tenants", &self.tenants.as_ref().map(|_| "..."))
            .field("users", &self.users.as_ref().map(|_| "..."))
            .finish()
    }
}
