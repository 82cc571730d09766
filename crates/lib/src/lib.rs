//!
//! Rowfence: per-connection row-level security (RLS) session context for PostgreSQL.
//!
//! Multi-tenant applications that rely on PostgreSQL row-level security carry
//! three pieces of state on every database connection: the active tenant id,
//! the active user id, and whether RLS enforcement is currently disabled.
//! This crate keeps that session state correct under pooled connections,
//! where an application-side cache can silently diverge from the true
//! per-connection state.
//!
//! ## Core Concepts
//!
//! * **SessionStatus (`status::SessionStatus`)**: a snapshot of the three
//!   session values as the database reports them. Values are carried as
//!   strings end to end, matching their `current_setting()` representation.
//! * **Gateway (`gateway::Gateway`)**: the only component that talks to the
//!   database. Executes statements, reads session configuration, and toggles
//!   the per-connection result cache. [`gateway::PgGateway`] implements it
//!   over a sqlx PostgreSQL connection.
//! * **SessionContext (`context::SessionContext`)**: the state machine. It
//!   decides when a requested context switch is a no-op, issues the session
//!   `SET` statements and role switches when it is not, and maintains a local
//!   mirror keyed by connection identity.
//! * **Scoped operations (`scope`)**: run a closure with RLS disabled or with
//!   a specific tenant active, then restore the previously captured status on
//!   every exit path, including failure.
//! * **Directories (`directory`)**: how tenant and user identifiers resolve
//!   to domain records; supplied by the host application.
//!
//! RLS policies themselves live in the database schema and are out of scope,
//! as are pool sizing and authentication.

pub mod config;
pub mod context;
pub mod directory;
pub mod gateway;
pub mod role;
pub mod scope;
pub mod status;

pub use config::RlsConfig;
pub use context::SessionContext;
pub use directory::{Tenant, TenantDirectory, User, UserDirectory};
pub use gateway::{ConnectionId, Gateway};
pub use scope::ScopeFuture;
pub use status::SessionStatus;

#[cfg(feature = "postgres")]
pub use gateway::PgGateway;

/// Result type used throughout the Rowfence library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Rowfence library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured session-context errors from the context module
    #[error(transparent)]
    Context(context::ContextError),

    /// Structured database-gateway errors from the gateway module
    #[error(transparent)]
    Gateway(gateway::GatewayError),

    /// Structured directory errors from the directory module
    #[error(transparent)]
    Directory(directory::DirectoryError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Context(_) => "context",
            Error::Gateway(_) => "gateway",
            Error::Directory(_) => "directory",
        }
    }

    /// Check if this error is an invalid-argument error (e.g. a missing
    /// tenant or user passed to a context switch).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::Context(err) if err.is_invalid_argument())
    }

    /// Check if this error was surfaced by the database gateway.
    ///
    /// A gateway failure partway through a mutating sequence can leave the
    /// local mirror and the authoritative session state diverged; callers
    /// must re-synchronize (e.g. via [`SessionContext::reset`]) before
    /// trusting the RLS context again.
    pub fn is_gateway_failure(&self) -> bool {
        matches!(self, Error::Gateway(_))
    }
}
