//! Database gateway boundary.
//!
//! The [`Gateway`] trait is the only surface through which the session state
//! machine touches the database: executing statements on the connection
//! bound to the caller, reading session configuration values back, and
//! toggling the per-connection result cache. Everything above this trait is
//! pure bookkeeping.
//!
//! The production implementation is [`PgGateway`] (feature `postgres`),
//! which wraps a sqlx PostgreSQL pool connection. Tests substitute their own
//! implementation that records issued statements.

mod errors;

#[cfg(feature = "postgres")]
mod postgres;

pub use errors::GatewayError;

#[cfg(feature = "postgres")]
pub use postgres::PgGateway;

use async_trait::async_trait;

use crate::Result;

/// Opaque identity of one connection checkout.
///
/// The local mirror of session state is only valid for as long as the
/// controller keeps talking to the same physical connection. A pool can hand
/// the same logical handle a different connection between operations, so the
/// mirror is keyed by this id and invalidated whenever it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// A single row of query results, columns by position.
///
/// Session configuration values come back as text or NULL, so an optional
/// string per column is all the state machine ever needs.
pub type Row = Vec<Option<String>>;

/// Gateway to the database connection bound to the calling unit of execution.
///
/// All methods operate on that one connection. Implementations are not
/// expected to be shared between concurrent callers; the session state
/// machine assumes it is the single logical owner of the connection while it
/// holds the gateway.
#[async_trait]
pub trait Gateway: Send {
    /// Identity of the current connection checkout.
    fn connection_id(&self) -> ConnectionId;

    /// Execute one or more semicolon-separated statements, discarding any
    /// result rows.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute a query expected to return exactly one row and return its
    /// columns by position.
    async fn query_row(&mut self, sql: &str) -> Result<Row>;

    /// Read a session configuration value, i.e. `current_setting(key, true)`.
    ///
    /// Returns `None` when the key is unset for this session.
    async fn read_session_config(&mut self, key: &str) -> Result<Option<String>>;

    /// Allow repeated identical queries on this connection to be served from
    /// the result cache again.
    fn enable_result_cache(&mut self);

    /// Stop serving queries from the result cache and drop cached results.
    ///
    /// Must be called before the effective security context changes, so that
    /// no result computed under a stale tenant/user/disabled state survives.
    fn disable_result_cache(&mut self);

    /// Drop cached results without changing whether the cache is active.
    fn clear_result_cache(&mut self);
}

/// Quote a value as a SQL string literal, doubling embedded single quotes.
///
/// Session values are interpolated into `SET` statements as text; this keeps
/// a tenant or user id from breaking out of the literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a name as a SQL identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
