//! Gateway error types.
//!
//! This module defines structured error types for database gateway
//! operations. Gateway failures are never retried by this crate and are
//! never swallowed; they propagate to the caller, who must treat the RLS
//! session context as indeterminate until re-synchronized.

use thiserror::Error;

/// Errors that can occur while talking to the database.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A statement or query failed on the underlying connection.
    ///
    /// The reason carries both the operation that failed and the driver's
    /// own message.
    #[error("SQL execution failed: {reason}")]
    Sql {
        /// Context message describing which operation failed
        reason: String,
    },

    /// A query expected to return one row returned none.
    #[error("Query returned no rows: {query}")]
    EmptyResult {
        /// The query that produced no rows
        query: String,
    },
}

impl GatewayError {
    /// Check if this error comes from a failed statement or query.
    pub fn is_sql_error(&self) -> bool {
        matches!(self, GatewayError::Sql { .. })
    }

    /// Check if this error indicates a missing result row.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, GatewayError::EmptyResult { .. })
    }
}

// Conversion from GatewayError to the main Error type
impl From<GatewayError> for crate::Error {
    fn from(err: GatewayError) -> Self {
        crate::Error::Gateway(err)
    }
}
