//! Database role switching.
//!
//! Disabling RLS through the `rls.disable` session flag alone is not enough
//! when row security policies are defined relative to role membership. The
//! role switch is the second, independent enforcement lever: the active role
//! must track the disable flag at the moment of every mutating operation.
//!
//! Privileged means the connection's own (owner/superuser) role, restored
//! with `SET ROLE NONE`, which bypasses row filtering at the grant level.
//! Unprivileged means the configured policy-enforced role.

use crate::Result;
use crate::gateway::{Gateway, quote_ident};

/// Issues the privileged/unprivileged role change that gates direct table
/// access around RLS.
#[derive(Debug, Clone, Default)]
pub struct RoleSwitcher {
    unprivileged_role: Option<String>,
}

impl RoleSwitcher {
    /// Create a switcher for the configured unprivileged role name.
    ///
    /// With `None`, every [`set_role`](Self::set_role) call is a no-op;
    /// deployments without a dedicated application role rely on the session
    /// flag alone.
    pub fn new(unprivileged_role: Option<String>) -> Self {
        Self { unprivileged_role }
    }

    /// Name of the configured unprivileged role, if any.
    pub fn unprivileged_role(&self) -> Option<&str> {
        self.unprivileged_role.as_deref()
    }

    /// Switch the connection to the privileged or unprivileged role.
    pub async fn set_role<G: Gateway>(&self, gateway: &mut G, privileged: bool) -> Result<()> {
        let Some(role) = self.unprivileged_role.as_deref() else {
            return Ok(());
        };
        if privileged {
            gateway.execute("SET ROLE NONE").await
        } else {
            gateway
                .execute(&format!("SET ROLE {}", quote_ident(role)))
                .await
        }
    }

    /// Re-issue the unprivileged `SET ROLE`, regardless of any earlier switch.
    ///
    /// Tenant and user switches call this after the regular role switch so
    /// that a `SET ROLE NONE` left behind by a prior disable is always
    /// overridden.
    pub async fn reassert_unprivileged<G: Gateway>(&self, gateway: &mut G) -> Result<()> {
        let Some(role) = self.unprivileged_role.as_deref() else {
            return Ok(());
        };
        gateway
            .execute(&format!("SET ROLE {}", quote_ident(role)))
            .await
    }
}
