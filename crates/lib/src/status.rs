//! Session status snapshots.
//!
//! A [`SessionStatus`] is the three-field view of a connection's RLS session
//! configuration: `rls.tenant_id`, `rls.user_id` and `rls.disable`. The
//! database is the sole source of truth for the authoritative value; the
//! same struct also serves as the local mirror cached next to a connection.
//!
//! All three fields are carried as strings, matching what
//! `current_setting()` returns, with booleans as the literal text
//! `"true"`/`"false"`. Equality between statuses is plain string equality.
//! No-op detection in the session state machine depends on that exact
//! comparison, so the fields are deliberately not parsed into richer types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of the RLS session configuration of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Value of `rls.tenant_id`; empty when unset.
    pub tenant_id: String,
    /// Value of `rls.user_id`; empty when unset.
    pub user_id: String,
    /// Value of `rls.disable` as text; RLS is bypassed only when this is
    /// exactly `"true"`.
    pub disable: String,
}

impl SessionStatus {
    /// Create a status from the three session values.
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        disable: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            disable: disable.into(),
        }
    }

    /// The no-override status: no tenant, no user, RLS enforced.
    ///
    /// This is what a freshly reset connection reports and what the local
    /// mirror starts as.
    pub fn empty() -> Self {
        Self::new("", "", "false")
    }

    /// Whether this status bypasses RLS.
    ///
    /// Only the exact text `"true"` counts. An unset or blank flag reads as
    /// *not disabled*; that polarity matches `current_setting()` returning
    /// NULL on a fresh connection and must not be inverted.
    pub fn is_disabled(&self) -> bool {
        self.disable == "true"
    }

    /// Whether all three fields are blank.
    ///
    /// `"false"` counts as the blank value of the disable flag, so both a
    /// never-touched connection (flag unset) and a reset one (flag
    /// explicitly `"false"`) report empty.
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_empty()
            && self.user_id.is_empty()
            && (self.disable.is_empty() || self.disable == "false")
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tenant_id={:?} user_id={:?} disable={:?}",
            self.tenant_id, self.user_id, self.disable
        )
    }
}
