//! Tabular execution session for generated queries.
//!
//! The session wraps a SQLite pool whose tables were bound before the
//! pipeline ran, plus a [`TableRegistry`] built by introspection up front.
//! `execute` is the executor boundary: validate references, run the single
//! SELECT under a hard timeout, and hand back the rows as the fixed-name
//! result binding.

use crate::application::use_cases::reference_validator::ReferenceValidator;
use crate::domain::error::{AppError, Result};
use crate::domain::table_registry::TableRegistry;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Name the pipeline's one output artifact is bound under.
pub const RESULT_NAME: &str = "result";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hard upper bound on a single query execution, in seconds.
    pub query_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 30,
        }
    }
}

/// Output of executing an extracted query: one table-like result, consumed
/// once for display.
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub row_count: usize,
}

pub struct TableSession {
    pool: SqlitePool,
    registry: TableRegistry,
    config: SessionConfig,
}

impl TableSession {
    /// Wrap an existing pool of pre-loaded tables, enumerating them into the
    /// registry.
    pub async fn from_pool(pool: SqlitePool, config: SessionConfig) -> Result<Self> {
        let registry = introspect(&pool).await?;
        debug!(tables = ?registry.table_names(), "Table session registry built");
        Ok(Self {
            pool,
            registry,
            config,
        })
    }

    /// Open a SQLite database file whose tables were loaded ahead of time.
    pub async fn open(path: &str, config: SessionConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite:{}", path))
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open '{}': {}", path, e)))?;
        Self::from_pool(pool, config).await
    }

    /// In-memory session seeded from a SQL script; used by the CLI demo and
    /// tests.
    pub async fn in_memory(seed_sql: &str, config: SessionConfig) -> Result<Self> {
        // A single pinned connection: the in-memory database lives and dies
        // with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory db: {}", e)))?;

        for statement in seed_sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Seed statement failed: {}", e)))?;
        }

        Self::from_pool(pool, config).await
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Execute one extracted query against the pre-bound tables.
    pub async fn execute(&self, sql: &str) -> Result<ResultTable> {
        ReferenceValidator::validate(sql, &self.registry).into_result()?;

        debug!(sql = %sql, "Executing generated query");

        let rows = tokio::time::timeout(
            Duration::from_secs(self.config.query_timeout_secs),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            AppError::DatabaseError(format!(
                "Query timed out after {} seconds",
                self.config.query_timeout_secs
            ))
        })?
        .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let decoded: Vec<HashMap<String, serde_json::Value>> = rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| (column.name().to_string(), decode_column(row, idx)))
                    .collect()
            })
            .collect();

        let row_count = decoded.len();
        info!(rows = row_count, "Generated query executed");

        Ok(ResultTable {
            name: RESULT_NAME.to_string(),
            columns,
            rows: decoded,
            row_count,
        })
    }
}

async fn introspect(pool: &SqlitePool) -> Result<TableRegistry> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to enumerate tables: {}", e)))?;

    let mut registry = TableRegistry::new();
    for table in tables {
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(&table)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to enumerate columns of '{}': {}", table, e))
            })?;
        registry.register(&table, columns);
    }

    Ok(registry)
}

/// Decode one column position to JSON, trying the SQLite storage classes in
/// order.
fn decode_column(row: &SqliteRow, idx: usize) -> serde_json::Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
        return value.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
        return value.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(idx) {
        return value.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
        return value.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    serde_json::Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "\
        CREATE TABLE orders (order_id TEXT, customer_id TEXT, order_status TEXT);\
        CREATE TABLE payments (order_id TEXT, payment_value REAL);\
        INSERT INTO orders VALUES ('ORD1', 'C1', 'delivered');\
        INSERT INTO orders VALUES ('ORD2', 'C2', 'canceled');\
        INSERT INTO payments VALUES ('ORD1', 120.5);";

    #[tokio::test]
    async fn test_registry_enumerates_seeded_tables() {
        let session = TableSession::in_memory(SEED, SessionConfig::default())
            .await
            .unwrap();
        let registry = session.registry();

        assert!(registry.contains_table("orders"));
        assert!(registry.contains_column("payments", "payment_value"));
        assert!(!registry.contains_table("sellers"));
    }

    #[tokio::test]
    async fn test_execute_returns_result_binding() {
        let session = TableSession::in_memory(SEED, SessionConfig::default())
            .await
            .unwrap();

        let result = session
            .execute(
                "SELECT o.order_id, p.payment_value \
                 FROM orders AS o JOIN payments AS p ON p.order_id = o.order_id",
            )
            .await
            .unwrap();

        assert_eq!(result.name, RESULT_NAME);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["order_id"], serde_json::json!("ORD1"));
        assert_eq!(result.rows[0]["payment_value"], serde_json::json!(120.5));
    }

    #[tokio::test]
    async fn test_execute_rejects_unbound_table() {
        let session = TableSession::in_memory(SEED, SessionConfig::default())
            .await
            .unwrap();

        let err = session
            .execute("SELECT v.id FROM vouchers AS v")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vouchers"));
    }

    #[tokio::test]
    async fn test_execute_surfaces_unknown_column_from_session() {
        let session = TableSession::in_memory(SEED, SessionConfig::default())
            .await
            .unwrap();

        // Unqualified column references pass the static check and fail in
        // the session itself.
        let err = session
            .execute("SELECT grand_total FROM orders")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert!(err.to_string().contains("grand_total"));
    }
}
