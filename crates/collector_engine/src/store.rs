use std::path::Path;

use collector_core::HarvestedRecord;
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

use collector_logging::collect_info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid identifier {0:?}: only ascii alphanumerics and underscores are allowed")]
    InvalidIdentifier(String),
}

/// Persistent table-per-sink store. Each row is one opaque JSON payload in
/// a single `data` column; the checkpoint is derived from the payload at
/// query time, never stored separately.
pub struct IncrementalStore {
    conn: Connection,
}

impl IncrementalStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// The value from which the next run can resume: the maximum of
    /// `date_field` across the table's current contents. `None` when the
    /// table does not exist yet or holds no rows.
    pub fn resume_checkpoint(
        &self,
        table: &str,
        date_field: &str,
    ) -> Result<Option<String>, StoreError> {
        validate_identifier(table)?;
        validate_identifier(date_field)?;

        if !self.table_exists(table)? {
            return Ok(None);
        }
        let statement = format!("SELECT max(json_extract(data, '$.{date_field}')) FROM {table}");
        let checkpoint: Option<String> = self
            .conn
            .query_row(&statement, [], |row| row.get(0))?;
        Ok(checkpoint)
    }

    /// Sole write path: atomically replaces the table's contents with the
    /// run's full record set and (re)builds the secondary index when asked.
    /// Runs in one transaction so readers never observe a half-populated
    /// table. Returns the number of rows written.
    pub fn replace(
        &mut self,
        table: &str,
        records: &[HarvestedRecord],
        index_field: Option<&str>,
    ) -> Result<usize, StoreError> {
        validate_identifier(table)?;
        if let Some(field) = index_field {
            validate_identifier(field)?;
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} (data TEXT NOT NULL)"
        ))?;
        {
            let mut insert = tx.prepare(&format!("INSERT INTO {table} (data) VALUES (?1)"))?;
            for record in records {
                insert.execute([serde_json::to_string(record.fields())?])?;
            }
        }
        if let Some(field) = index_field {
            tx.execute(
                &format!(
                    "CREATE INDEX idx_{table} ON {table}(json_extract(data, '$.{field}'))"
                ),
                [],
            )?;
        }
        tx.commit()?;

        collect_info!("replaced table {} with {} rows", table, records.len());
        Ok(records.len())
    }

    /// Number of rows currently in `table`.
    pub fn count(&self, table: &str) -> Result<u64, StoreError> {
        validate_identifier(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: u64 = self
            .conn
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// All stored payloads of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<String>, StoreError> {
        validate_identifier(table)?;
        let mut statement = self
            .conn
            .prepare(&format!("SELECT data FROM {table} ORDER BY rowid"))?;
        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Whether the secondary index for `table` exists.
    pub fn has_index(&self, table: &str) -> Result<bool, StoreError> {
        validate_identifier(table)?;
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?1",
                [format!("idx_{table}")],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Table and field names are interpolated into statements, so they are
/// restricted to a shape that cannot carry SQL.
fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
