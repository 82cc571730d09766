//! sqlx-backed PostgreSQL gateway.
//!
//! [`PgGateway`] owns one pool checkout for its whole lifetime, which is what
//! makes the connection-identity scheme work: the checkout id assigned here
//! never changes while the same physical connection is in hand, and a fresh
//! checkout always gets a fresh id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row as _};

use super::errors::GatewayError;
use super::{ConnectionId, Gateway, Row};
use crate::Result;

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Similar to `anyhow::Context`, this trait adds a method to convert
/// sqlx errors to `GatewayError::Sql` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to GatewayError with context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            GatewayError::Sql {
                reason: format!("{context}: {e}"),
            }
            .into()
        })
    }
}

/// Per-connection result cache.
///
/// Serves repeated identical single-row reads while enabled. Disabling
/// drops all entries; results computed under one security context must never
/// survive into the next.
#[derive(Debug, Default)]
struct QueryCache {
    enabled: bool,
    entries: HashMap<String, Row>,
}

impl QueryCache {
    fn get(&self, sql: &str) -> Option<Row> {
        if self.enabled {
            self.entries.get(sql).cloned()
        } else {
            None
        }
    }

    fn put(&mut self, sql: &str, row: &Row) {
        if self.enabled {
            self.entries.insert(sql.to_string(), row.clone());
        }
    }
}

/// Monotonic id source for connection checkouts.
static NEXT_CHECKOUT_ID: AtomicU64 = AtomicU64::new(1);

/// [`Gateway`] implementation over one sqlx PostgreSQL pool connection.
///
/// The gateway owns the checkout; returning the connection to the pool means
/// dropping the gateway, and any new gateway carries a new [`ConnectionId`].
/// That is how the session state machine detects that its local mirror no
/// longer describes the connection in hand.
pub struct PgGateway {
    conn: PoolConnection<Postgres>,
    id: ConnectionId,
    cache: QueryCache,
}

impl PgGateway {
    /// Wrap an already checked-out pool connection.
    pub fn new(conn: PoolConnection<Postgres>) -> Self {
        Self {
            conn,
            id: ConnectionId(NEXT_CHECKOUT_ID.fetch_add(1, Ordering::Relaxed)),
            cache: QueryCache {
                enabled: true,
                entries: HashMap::new(),
            },
        }
    }

    /// Check a connection out of the pool and wrap it.
    pub async fn checkout(pool: &PgPool) -> Result<Self> {
        let conn = pool
            .acquire()
            .await
            .sql_context("acquire connection from pool")?;
        Ok(Self::new(conn))
    }

    /// Return the underlying checkout, ending this gateway's ownership.
    pub fn into_inner(self) -> PoolConnection<Postgres> {
        self.conn
    }
}

#[async_trait]
impl Gateway for PgGateway {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // raw_sql uses the simple protocol, which is what allows the
        // semicolon-separated multi-statement commands the state machine
        // issues for combined context switches.
        let conn: &mut sqlx::PgConnection = &mut self.conn;
        sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .sql_context("execute statement")?;
        Ok(())
    }

    async fn query_row(&mut self, sql: &str) -> Result<Row> {
        if let Some(row) = self.cache.get(sql) {
            return Ok(row);
        }
        let pg_row = sqlx::query(sql)
            .fetch_optional(&mut *self.conn)
            .await
            .sql_context("fetch query row")?
            .ok_or_else(|| GatewayError::EmptyResult {
                query: sql.to_string(),
            })?;
        let mut row = Row::with_capacity(pg_row.len());
        for i in 0..pg_row.len() {
            let value: Option<String> = pg_row.try_get(i).sql_context("decode column")?;
            row.push(value);
        }
        self.cache.put(sql, &row);
        Ok(row)
    }

    async fn read_session_config(&mut self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT current_setting($1, TRUE)")
            .bind(key)
            .fetch_one(&mut *self.conn)
            .await
            .sql_context("read session configuration")?;
        Ok(value)
    }

    fn enable_result_cache(&mut self) {
        self.cache.enabled = true;
    }

    fn disable_result_cache(&mut self) {
        self.cache.enabled = false;
        self.cache.entries.clear();
    }

    fn clear_result_cache(&mut self) {
        self.cache.entries.clear();
    }
}
