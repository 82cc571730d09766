use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rowfence::gateway::{ConnectionId, Gateway, GatewayError, Row};
use rowfence::{Result, RlsConfig, SessionContext, Tenant, TenantDirectory, User, UserDirectory};

// ==========================
// CORE TEST FACTORIES
// ==========================

/// Creates a session context over a fresh mock gateway.
pub fn mock_context(config: RlsConfig) -> SessionContext<MockGateway> {
    SessionContext::new(MockGateway::new(1), config)
}

/// A config with the usual unprivileged role configured.
pub fn role_config() -> RlsConfig {
    RlsConfig::new().with_unprivileged_role("app_user")
}

/// A directory holding the given tenant ids, in order.
pub fn tenant_directory(ids: &[&str]) -> Arc<StaticTenants> {
    Arc::new(StaticTenants {
        tenants: ids.iter().map(|id| Tenant::new(*id)).collect(),
    })
}

// ==========================
// MOCK GATEWAY
// ==========================

/// In-memory stand-in for a PostgreSQL connection.
///
/// Applies the `SET` statements the state machine issues to an internal
/// session map, so authoritative reads observe exactly what was written.
/// Every executed statement is recorded for issuance-count assertions.
pub struct MockGateway {
    id: ConnectionId,
    /// Session configuration, key to text value. Absent key reads as NULL.
    pub session: HashMap<String, String>,
    /// Currently active role; `None` means the connection's own role
    /// (i.e. after `SET ROLE NONE` or before any switch).
    pub role: Option<String>,
    /// Every statement passed to `execute`, in order.
    pub statements: Vec<String>,
    pub cache_enabled: bool,
    pub cache_clears: usize,
    /// When set, the next `execute` fails without applying anything.
    pub fail_next_execute: bool,
}

impl MockGateway {
    pub fn new(id: u64) -> Self {
        Self {
            id: ConnectionId(id),
            session: HashMap::new(),
            role: None,
            statements: Vec::new(),
            cache_enabled: true,
            cache_clears: 0,
            fail_next_execute: false,
        }
    }

    /// Simulate the pool handing this holder a different physical
    /// connection: new identity, new session state, same gateway value.
    pub fn swap_connection(&mut self, id: u64, session: HashMap<String, String>) {
        self.id = ConnectionId(id);
        self.session = session;
        self.role = None;
    }

    /// Count of recorded statements containing `needle`.
    pub fn statements_containing(&self, needle: &str) -> usize {
        self.statements.iter().filter(|s| s.contains(needle)).count()
    }

    fn apply(&mut self, statement: &str) {
        let statement = statement.trim();
        if statement.is_empty() {
            return;
        }
        if let Some(role) = statement.strip_prefix("SET ROLE ") {
            if role == "NONE" {
                self.role = None;
            } else {
                self.role = Some(unquote_ident(role));
            }
            return;
        }
        let rest = statement
            .strip_prefix("SET SESSION ")
            .or_else(|| statement.strip_prefix("SET "))
            .unwrap_or(statement);
        if let Some((key, value)) = rest.split_once('=') {
            self.session
                .insert(key.trim().to_string(), parse_value(value.trim()));
        }
    }
}

fn parse_value(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        inner.replace("''", "'")
    } else if raw.eq_ignore_ascii_case("TRUE") {
        "true".to_string()
    } else if raw.eq_ignore_ascii_case("FALSE") {
        "false".to_string()
    } else {
        raw.to_string()
    }
}

fn unquote_ident(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        inner.replace("\"\"", "\"")
    } else {
        raw.to_string()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        if self.fail_next_execute {
            self.fail_next_execute = false;
            return Err(GatewayError::Sql {
                reason: "injected failure".to_string(),
            }
            .into());
        }
        self.statements.push(sql.to_string());
        for statement in sql.split(';') {
            self.apply(statement);
        }
        Ok(())
    }

    async fn query_row(&mut self, sql: &str) -> Result<Row> {
        // The only query the state machine issues reads session settings by
        // position: SELECT current_setting('<key>', TRUE), ...
        let mut row = Row::new();
        for part in sql.split("current_setting('").skip(1) {
            let key = part.split('\'').next().unwrap_or_default();
            row.push(self.session.get(key).cloned());
        }
        if row.is_empty() {
            return Err(GatewayError::EmptyResult {
                query: sql.to_string(),
            }
            .into());
        }
        Ok(row)
    }

    async fn read_session_config(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.session.get(key).cloned())
    }

    fn enable_result_cache(&mut self) {
        self.cache_enabled = true;
    }

    fn disable_result_cache(&mut self) {
        self.cache_enabled = false;
        self.cache_clears += 1;
    }

    fn clear_result_cache(&mut self) {
        self.cache_clears += 1;
    }
}

// ==========================
// STATIC DIRECTORIES
// ==========================

pub struct StaticTenants {
    pub tenants: Vec<Tenant>,
}

#[async_trait]
impl TenantDirectory for StaticTenants {
    async fn find(&self, id: &str) -> Result<Option<Tenant>> {
        Ok(self.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn all(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.clone())
    }
}

pub struct StaticUsers {
    pub users: Vec<User>,
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn find(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}
