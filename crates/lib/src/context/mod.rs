//! The session-context state machine.
//!
//! [`SessionContext`] owns one gateway (one connection checkout) and keeps
//! the three RLS session values — `rls.tenant_id`, `rls.user_id`,
//! `rls.disable` — consistent between the database and a local mirror.
//!
//! ## Mirror discipline
//!
//! The mirror exists only to skip redundant statements. It is keyed by the
//! gateway's [`ConnectionId`]: whenever the id changes (a new checkout), the
//! cached status no longer describes the connection in hand and is
//! force-resynced from an authoritative read before any no-op decision.
//! Keying by thread would be wrong — a pool can hand the same thread
//! different connections over time, and recycle a connection to another
//! thread without resetting its session state.
//!
//! ## Equality discipline
//!
//! All comparisons between requested and cached values are string equality
//! on the `current_setting()` text representation, including the disable
//! flag. Parsing into richer types would change which transitions count as
//! no-ops and therefore how many statements get issued.
//!
//! ## Failure discipline
//!
//! Mutating operations issue multiple statements. A gateway failure partway
//! through leaves the mirror and the authoritative state in an indeterminate
//! relationship; no automatic recovery is attempted. Callers must
//! [`reset`](SessionContext::reset) or [`resync`](SessionContext::resync)
//! before trusting the RLS context again.

mod errors;

pub use errors::ContextError;

use crate::Result;
use crate::config::RlsConfig;
use crate::directory::{Tenant, User};
use crate::gateway::{ConnectionId, Gateway, quote_literal};
use crate::role::RoleSwitcher;
use crate::status::SessionStatus;

/// Session configuration key holding the active tenant id.
pub const TENANT_KEY: &str = "rls.tenant_id";
/// Session configuration key holding the active user id.
pub const USER_KEY: &str = "rls.user_id";
/// Session configuration key holding the disable flag as text.
pub const DISABLE_KEY: &str = "rls.disable";

/// One round trip reading all three session values, columns by position.
const STATUS_QUERY: &str = "SELECT current_setting('rls.tenant_id', TRUE), \
     current_setting('rls.user_id', TRUE), \
     current_setting('rls.disable', TRUE)";

/// Controller for the RLS session context of one connection checkout.
///
/// All operations are driven by the caller and run on the connection bound
/// to this context. The controller assumes it is the single logical owner of
/// that connection; concurrent callers sharing one connection without
/// external mutual exclusion produce undefined interleavings.
pub struct SessionContext<G> {
    gateway: G,
    config: RlsConfig,
    roles: RoleSwitcher,
    mirror: Option<(ConnectionId, SessionStatus)>,
}

impl<G: Gateway> SessionContext<G> {
    /// Create a controller over a gateway with the given configuration.
    pub fn new(gateway: G, config: RlsConfig) -> Self {
        let roles = RoleSwitcher::new(config.unprivileged_role.clone());
        Self {
            gateway,
            config,
            roles,
            mirror: None,
        }
    }

    /// The configuration this controller runs with.
    pub fn config(&self) -> &RlsConfig {
        &self.config
    }

    /// Mutable access to the underlying gateway, for running application
    /// queries on the same connection the context governs.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Consume the controller and hand the gateway back.
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Last-known status for the current connection checkout.
    ///
    /// Resyncs from an authoritative read when there is no mirror yet or the
    /// gateway's connection identity has changed since it was cached.
    async fn mirror(&mut self) -> Result<SessionStatus> {
        let id = self.gateway.connection_id();
        if let Some((cached_id, status)) = &self.mirror
            && *cached_id == id
        {
            return Ok(status.clone());
        }
        let status = self.read_status().await?;
        self.mirror = Some((id, status.clone()));
        Ok(status)
    }

    /// Overwrite the mirror for the current connection checkout.
    fn remember(&mut self, status: SessionStatus) {
        self.mirror = Some((self.gateway.connection_id(), status));
    }

    async fn read_status(&mut self) -> Result<SessionStatus> {
        let row = self.gateway.query_row(STATUS_QUERY).await?;
        let col = |i: usize| -> String {
            row.get(i)
                .cloned()
                .flatten()
                .unwrap_or_default()
        };
        Ok(SessionStatus::new(col(0), col(1), col(2)))
    }

    fn log_transition(&self, message: &str, detail: &str) {
        if self.config.verbose {
            tracing::info!(detail, "{}", message);
        } else {
            tracing::debug!(detail, "{}", message);
        }
    }

    /// Authoritative status of the connection: all three session values in
    /// one round trip.
    pub async fn status(&mut self) -> Result<SessionStatus> {
        self.read_status().await
    }

    /// Drop the mirror and re-read the authoritative status.
    ///
    /// Pool-integration layers call this (or [`reset`](Self::reset)) on
    /// every checkout before first use.
    pub async fn resync(&mut self) -> Result<SessionStatus> {
        self.mirror = None;
        self.mirror().await
    }

    /// Whether RLS is currently bypassed, per an authoritative re-read.
    ///
    /// Only a flag strictly equal to `true` counts as disabled; an unset
    /// (NULL) flag reads as not disabled. The mirror is not trusted here
    /// because it can be stale or wrong for a reused connection.
    pub async fn disabled(&mut self) -> Result<bool> {
        let flag = self.gateway.read_session_config(DISABLE_KEY).await?;
        Ok(flag.as_deref() == Some("true"))
    }

    /// Whether RLS is currently enforced, per an authoritative re-read.
    pub async fn enabled(&mut self) -> Result<bool> {
        Ok(!self.disabled().await?)
    }

    /// Bypass RLS for this connection until re-enabled.
    ///
    /// No-op when the mirror already reports disabled. Otherwise turns the
    /// result cache off (a disabled-RLS session must not serve results
    /// computed under another security context), sets the session flag,
    /// switches to the privileged role, and updates the mirror.
    pub async fn disable(&mut self) -> Result<()> {
        let mirror = self.mirror().await?;
        if mirror.is_disabled() {
            return Ok(());
        }
        self.gateway.disable_result_cache();
        self.gateway
            .execute("SET SESSION rls.disable = TRUE")
            .await?;
        self.roles.set_role(&mut self.gateway, true).await?;
        self.remember(SessionStatus::new(mirror.tenant_id, mirror.user_id, "true"));
        tracing::warn!(
            "Row-level security DISABLED for this connection; reads are unfiltered"
        );
        Ok(())
    }

    /// Re-enforce RLS for this connection.
    ///
    /// No-op when the mirror already reports enabled. The result cache is
    /// deliberately *not* re-enabled here; caching stays off until a
    /// concrete tenant or user context is in place.
    pub async fn enable(&mut self) -> Result<()> {
        let mirror = self.mirror().await?;
        if !mirror.is_disabled() {
            return Ok(());
        }
        self.gateway
            .execute("SET SESSION rls.disable = FALSE")
            .await?;
        self.roles.set_role(&mut self.gateway, false).await?;
        self.remember(SessionStatus::new(
            mirror.tenant_id,
            mirror.user_id,
            "false",
        ));
        self.log_transition("Row-level security re-enabled", "");
        Ok(())
    }

    /// Make `tenant` the active tenant, enforcing RLS.
    ///
    /// Fails with an invalid-argument error when no tenant is given. No-op
    /// when the mirror already shows this tenant with RLS enabled.
    pub async fn set_tenant(&mut self, tenant: Option<&Tenant>) -> Result<()> {
        let tenant = tenant.ok_or(ContextError::MissingTenant)?;
        let mirror = self.mirror().await?;
        if mirror.tenant_id == tenant.id && !mirror.is_disabled() {
            return Ok(());
        }
        self.gateway.disable_result_cache();
        self.gateway
            .execute(&format!(
                "SET SESSION rls.disable = FALSE; SET SESSION rls.tenant_id = {}",
                quote_literal(&tenant.id)
            ))
            .await?;
        self.roles.set_role(&mut self.gateway, false).await?;
        // A prior disable leaves SET ROLE NONE behind; assert the
        // unprivileged role once more so it always wins.
        self.roles.reassert_unprivileged(&mut self.gateway).await?;
        self.remember(SessionStatus::new(
            tenant.id.clone(),
            mirror.user_id,
            "false",
        ));
        self.log_transition("Switched RLS tenant", &tenant.id);
        Ok(())
    }

    /// Make `user` the active user, enforcing RLS.
    ///
    /// Symmetric to [`set_tenant`](Self::set_tenant) on the user axis.
    pub async fn set_user(&mut self, user: Option<&User>) -> Result<()> {
        let user = user.ok_or(ContextError::MissingUser)?;
        let mirror = self.mirror().await?;
        if mirror.user_id == user.id && !mirror.is_disabled() {
            return Ok(());
        }
        self.gateway.disable_result_cache();
        self.gateway
            .execute(&format!(
                "SET SESSION rls.disable = FALSE; SET SESSION rls.user_id = {}",
                quote_literal(&user.id)
            ))
            .await?;
        self.roles.set_role(&mut self.gateway, false).await?;
        self.roles.reassert_unprivileged(&mut self.gateway).await?;
        self.remember(SessionStatus::new(
            mirror.tenant_id,
            user.id.clone(),
            "false",
        ));
        self.log_transition("Switched RLS user", &user.id);
        Ok(())
    }

    /// Active tenant id per an authoritative read; `None` when unset.
    pub async fn current_tenant_id(&mut self) -> Result<Option<String>> {
        let id = self.gateway.read_session_config(TENANT_KEY).await?;
        Ok(id.filter(|v| !v.is_empty()))
    }

    /// Active tenant resolved through the tenant directory.
    ///
    /// `None` when no tenant is set, the directory does not know the id, or
    /// no directory is configured.
    pub async fn current_tenant(&mut self) -> Result<Option<Tenant>> {
        let Some(id) = self.current_tenant_id().await? else {
            return Ok(None);
        };
        match &self.config.tenants {
            Some(directory) => directory.find(&id).await,
            None => Ok(None),
        }
    }

    /// Active user id per an authoritative read; `None` when unset.
    pub async fn current_user_id(&mut self) -> Result<Option<String>> {
        let id = self.gateway.read_session_config(USER_KEY).await?;
        Ok(id.filter(|v| !v.is_empty()))
    }

    /// Active user resolved through the user directory.
    pub async fn current_user(&mut self) -> Result<Option<User>> {
        let Some(id) = self.current_user_id().await? else {
            return Ok(None);
        };
        match &self.config.users {
            Some(directory) => directory.find(&id).await,
            None => Ok(None),
        }
    }

    /// Clear all three session values, restore the unprivileged role and
    /// re-enable the result cache.
    ///
    /// No-op when the mirror already shows the empty status. Afterwards the
    /// authoritative status reads `{tenant_id: "", user_id: "",
    /// disable: "false"}` — no override, RLS policy default applies.
    pub async fn reset(&mut self) -> Result<()> {
        let mirror = self.mirror().await?;
        if mirror.is_empty() {
            return Ok(());
        }
        self.gateway
            .execute(
                "SET SESSION rls.tenant_id = ''; \
                 SET SESSION rls.user_id = ''; \
                 SET SESSION rls.disable = FALSE",
            )
            .await?;
        self.roles.set_role(&mut self.gateway, false).await?;
        self.gateway.enable_result_cache();
        self.gateway.clear_result_cache();
        self.remember(SessionStatus::empty());
        self.log_transition("RLS session context reset", "");
        Ok(())
    }

    /// Bulk-assign all three session values at once.
    ///
    /// No-op when `status` is string-equal to the authoritative status,
    /// which is re-read for the comparison rather than trusted from the
    /// mirror. Otherwise toggles the result cache according to the resulting
    /// disable flag, issues one combined statement writing all three values
    /// verbatim, switches the role to match the flag, and updates the
    /// mirror. This is the restoration primitive the scoped operations use.
    pub async fn assign_status(&mut self, status: &SessionStatus) -> Result<()> {
        let current = self.status().await?;
        if current == *status {
            return Ok(());
        }
        if status.is_disabled() {
            self.gateway.disable_result_cache();
        } else {
            self.gateway.enable_result_cache();
            self.gateway.clear_result_cache();
        }
        self.gateway
            .execute(&format!(
                "SET SESSION rls.tenant_id = {}; SET SESSION rls.user_id = {}; \
                 SET SESSION rls.disable = {}",
                quote_literal(&status.tenant_id),
                quote_literal(&status.user_id),
                quote_literal(&status.disable)
            ))
            .await?;
        self.roles
            .set_role(&mut self.gateway, status.is_disabled())
            .await?;
        self.remember(status.clone());
        self.log_transition("RLS session status assigned", &status.to_string());
        Ok(())
    }
}
