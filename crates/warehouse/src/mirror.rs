use std::path::{Path, PathBuf};

use async_trait::async_trait;
use attribution_core::{CostRow, UsageRow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params_from_iter};
use tracing::debug;

use crate::UsageSource;
use crate::error::{Result, WarehouseError};
use crate::queries::{MAX_IDS_PER_STATEMENT, cost_attribution_sql, usage_history_sql};

const MIGRATION_0001: &str = include_str!("../migrations/0001_account_usage.sql");

const MIGRATIONS: &[(&str, &str)] = &[("0001_account_usage", MIGRATION_0001)];

/// Local SQLite copy of the two account usage views.
pub struct UsageMirror {
    conn: Connection,
}

impl UsageMirror {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(Self { conn })
    }

    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            debug!(migration = *name, "applying mirror migration");
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn cost_rows(&self, query_ids: &[String]) -> Result<Vec<CostRow>> {
        let mut rows = Vec::new();
        for chunk in query_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut stmt = self.conn.prepare(&cost_attribution_sql("", chunk.len()))?;
            let mut result = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = result.next()? {
                rows.push(row_to_cost_row(row)?);
            }
        }
        Ok(rows)
    }

    pub fn usage_rows(&self, query_ids: &[String]) -> Result<Vec<UsageRow>> {
        let mut rows = Vec::new();
        for chunk in query_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut stmt = self.conn.prepare(&usage_history_sql("", chunk.len()))?;
            let mut result = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = result.next()? {
                rows.push(row_to_usage_row(row)?);
            }
        }
        Ok(rows)
    }
}

fn parse_end_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn count(row: &Row<'_>, index: usize) -> Result<Option<u64>> {
    match row.get::<_, Option<i64>>(index)? {
        None => Ok(None),
        Some(value) => u64::try_from(value).map(Some).map_err(|_| {
            WarehouseError::Decode(format!("negative count {value} in column {index}"))
        }),
    }
}

fn row_to_cost_row(row: &Row<'_>) -> Result<CostRow> {
    let end_time: String = row.get(1)?;
    Ok(CostRow {
        query_id: row.get(0)?,
        end_time: parse_end_time(&end_time)?,
        credits_attributed: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
    })
}

fn row_to_usage_row(row: &Row<'_>) -> Result<UsageRow> {
    let end_time: String = row.get(8)?;
    Ok(UsageRow {
        query_id: row.get(0)?,
        rows_produced: count(row, 1)?,
        rows_inserted: count(row, 2)?,
        rows_updated: count(row, 3)?,
        rows_deleted: count(row, 4)?,
        rows_unloaded: count(row, 5)?,
        total_elapsed_time: count(row, 6)?,
        bytes_scanned: count(row, 7)?,
        end_time: parse_end_time(&end_time)?,
    })
}

/// [`UsageSource`] over a mirror file; each lookup opens its own connection
/// on the blocking pool so both lookups can run at once.
#[derive(Debug, Clone)]
pub struct SqliteUsageSource {
    path: PathBuf,
}

impl SqliteUsageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UsageSource for SqliteUsageSource {
    async fn cost_rows(&self, query_ids: &[String]) -> Result<Vec<CostRow>> {
        if query_ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = self.path.clone();
        let ids = query_ids.to_vec();
        tokio::task::spawn_blocking(move || UsageMirror::open(&path)?.cost_rows(&ids)).await?
    }

    async fn usage_rows(&self, query_ids: &[String]) -> Result<Vec<UsageRow>> {
        if query_ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = self.path.clone();
        let ids = query_ids.to_vec();
        tokio::task::spawn_blocking(move || UsageMirror::open(&path)?.usage_rows(&ids)).await?
    }
}
