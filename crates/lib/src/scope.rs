//! Scoped RLS operations with guaranteed restoration.
//!
//! Each operation here captures the authoritative session status on entry,
//! establishes a new context, runs the supplied closure, and restores the
//! captured status on every exit path. A failing closure aborts the work but
//! never skips restoration, and restoration never suppresses the closure's
//! failure.
//!
//! The closures receive the [`SessionContext`] back so they can run their
//! queries on the very connection whose context was just switched. They
//! return boxed futures ([`ScopeFuture`]), which keeps the borrow of the
//! context tied to each invocation.
//!
//! Restoration runs on the `Ok` and `Err` paths alike. It cannot run if the
//! task is cancelled mid-operation or the closure panics; in that case the
//! checkout must not be returned to the pool without a
//! [`reset`](SessionContext::reset).

use std::future::Future;
use std::pin::Pin;

use crate::Result;
use crate::context::{ContextError, SessionContext};
use crate::directory::Tenant;
use crate::gateway::Gateway;
use crate::status::SessionStatus;

/// Future returned by a scoped closure, borrowing the context for `'a`.
pub type ScopeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

impl<G: Gateway> SessionContext<G> {
    /// Run `op` with RLS disabled, restoring the prior status afterwards.
    ///
    /// Captures the authoritative status, calls
    /// [`disable`](SessionContext::disable), runs `op`, then assigns the
    /// captured status back whether `op` succeeded or failed.
    pub async fn disabled_scope<T, F>(&mut self, op: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut SessionContext<G>) -> ScopeFuture<'a, T>,
    {
        let captured = self.status().await?;
        let outcome = match self.disable().await {
            Ok(()) => op(self).await,
            Err(err) => Err(err),
        };
        self.restore(&captured, outcome).await
    }

    /// Run `op` with `tenant` active, restoring the prior status afterwards.
    ///
    /// Captures the authoritative status, calls
    /// [`enable`](SessionContext::enable) then
    /// [`set_tenant`](SessionContext::set_tenant), runs `op` with the
    /// tenant, then assigns the captured status back under the same
    /// guarantee as [`disabled_scope`](SessionContext::disabled_scope).
    pub async fn tenant_scope<T, F>(&mut self, tenant: &Tenant, op: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut SessionContext<G>, &'a Tenant) -> ScopeFuture<'a, T>,
    {
        let captured = self.status().await?;
        let setup = match self.enable().await {
            Ok(()) => self.set_tenant(Some(tenant)).await,
            Err(err) => Err(err),
        };
        let outcome = match setup {
            Ok(()) => op(self, tenant).await,
            Err(err) => Err(err),
        };
        self.restore(&captured, outcome).await
    }

    /// Run `op` once per tenant from the tenant directory, in directory
    /// order, restoring the prior status once at the end.
    ///
    /// Results are collected in iteration order. A failure partway through
    /// aborts the remaining tenants but still restores the captured status
    /// exactly once before propagating.
    pub async fn for_each_tenant<T, F>(&mut self, mut op: F) -> Result<Vec<T>>
    where
        F: for<'a> FnMut(&'a mut SessionContext<G>, &'a Tenant) -> ScopeFuture<'a, T>,
    {
        let directory = self
            .config()
            .tenants
            .clone()
            .ok_or(ContextError::NoTenantDirectory)?;
        let captured = self.status().await?;
        let tenants = match directory.all().await {
            Ok(tenants) => tenants,
            Err(err) => return self.restore(&captured, Err::<Vec<T>, _>(err)).await,
        };

        let mut results = Vec::with_capacity(tenants.len());
        let mut failure = None;
        for tenant in &tenants {
            if let Err(err) = self.set_tenant(Some(tenant)).await {
                failure = Some(err);
                break;
            }
            match op(self, tenant).await {
                Ok(value) => results.push(value),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        let outcome = match failure {
            Some(err) => Err(err),
            None => Ok(results),
        };
        self.restore(&captured, outcome).await
    }

    /// Assign `captured` back and merge the restoration result with the
    /// operation's outcome. The operation's failure always wins; a
    /// restoration failure after a successful operation propagates, since
    /// the session is then in an unknown state.
    async fn restore<T>(&mut self, captured: &SessionStatus, outcome: Result<T>) -> Result<T> {
        let restored = self.assign_status(captured).await;
        match outcome {
            Err(err) => {
                if let Err(restore_err) = restored {
                    tracing::warn!(
                        error = %restore_err,
                        "Failed to restore RLS session status after a failed scope"
                    );
                }
                Err(err)
            }
            Ok(value) => {
                restored?;
                Ok(value)
            }
        }
    }
}
