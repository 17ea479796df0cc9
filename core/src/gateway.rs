//! SQL surface of one benchmark table.

use keybench_keys::Key;
use std::{fmt::Write, sync::Arc};
use tracing::{debug, info};

use crate::{
    backend::Backend,
    error::{BackendError, SetupError},
};

/// One row of an insert batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    /// Position in the insertion sequence of the owning factory.
    pub index: i64,
    pub key: Key,
    /// Random filler matched by the sample query predicate.
    pub name: i32,
}

/// Issues the statements of the benchmark against one table.
#[derive(Clone)]
pub struct TableGateway {
    schema: String,
    table: String,
    backend: Arc<dyn Backend>,
}

impl TableGateway {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, backend: Arc<dyn Backend>) -> Result<Self, SetupError> {
        let schema = schema.into();
        let table = table.into();
        for name in [&schema, &table] {
            if !sane_name(name) {
                return Err(SetupError::InvalidName(name.clone()));
            }
        }
        Ok(Self { schema, table, backend })
    }

    pub fn qualified_name(&self) -> String { format!("{}.{}", self.schema, self.table) }

    /// Creates the schema, the table and its sequence index unless they already exist.
    pub async fn ensure_schema_present(&self) -> Result<(), SetupError> {
        for statement in self.schema_statements() {
            self.setup_statement(&statement).await?;
        }
        info!("TableGateway({}).ensure_schema_present: ready", self.qualified_name());
        Ok(())
    }

    /// Drops the whole benchmark schema, tables included.
    pub async fn drop_schema(&self) -> Result<(), SetupError> {
        self.setup_statement(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema)).await?;
        info!("TableGateway({}).drop_schema: dropped {}", self.qualified_name(), self.schema);
        Ok(())
    }

    pub async fn insert_batch(&self, rows: &[Row]) -> Result<u64, BackendError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.backend.execute_statement(&self.insert_statement(rows)).await
    }

    /// Counts the first `limit` rows by sequence whose filler contains a `1`.
    pub async fn run_sample_query(&self, limit: u64) -> Result<u64, BackendError> {
        self.backend.execute_statement(&self.sample_statement(limit)).await
    }

    pub(crate) fn schema_statements(&self) -> [String; 3] {
        [
            format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema),
            format!(
                "CREATE TABLE IF NOT EXISTS {}(id bytea NOT NULL PRIMARY KEY, inc bigint NOT NULL, name varchar(50) NOT NULL)",
                self.qualified_name()
            ),
            format!("CREATE INDEX IF NOT EXISTS {}_idx_inc ON {} (inc)", self.table, self.qualified_name()),
        ]
    }

    pub(crate) fn insert_statement(&self, rows: &[Row]) -> String {
        // each tuple is ~70 characters
        let mut sql = String::with_capacity(64 + rows.len() * 72);
        let _ = write!(sql, "INSERT INTO {} (id, inc, name) VALUES ", self.qualified_name());
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "(decode('{}', 'hex'), {}, '{}')", row.key.to_hex(), row.index, row.name);
        }
        sql.push(';');
        sql
    }

    pub(crate) fn sample_statement(&self, limit: u64) -> String {
        format!(
            "SELECT count(*) FROM (SELECT * FROM {} WHERE name LIKE '%1%' ORDER BY inc LIMIT {}) AS a;",
            self.qualified_name(),
            limit
        )
    }

    async fn setup_statement(&self, statement: &str) -> Result<u64, SetupError> {
        debug!("{statement}");
        self.backend
            .execute_statement(statement)
            .await
            .map_err(|source| SetupError::Backend { table: self.table.clone(), source })
    }
}

impl std::fmt::Debug for TableGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "TableGateway({})", self.qualified_name()) }
}

/// Identifiers are interpolated into SQL text, so only `[A-Za-z0-9_]` is accepted.
pub fn sane_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(|c: char| c.is_ascii_digit()) && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
