//! CSV loading
//!
//! Fills the marketplace tables from `<dir>/<table>.csv` files

use crate::common::constants::LOAD_PROGRESS_INTERVAL;
use crate::common::error::{MarketDbError, MarketDbResult};
use crate::database::Database;
use crate::dataset::schema::{TableDef, TABLES};
use crate::schema_err;
use crate::types::Value;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows loaded into one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLoad {
    pub table: String,
    pub rows: usize,
}

/// Summary of a full dataset load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

/// Loads marketplace CSV exports from a directory
#[derive(Debug, Clone)]
pub struct CsvLoader {
    dir: PathBuf,
}

impl CsvLoader {
    /// Create a loader reading from `dir`
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the CSV file that feeds a table
    pub fn csv_path(&self, table: &TableDef) -> PathBuf {
        self.dir.join(format!("{}.csv", table.name))
    }

    /// Load every table in dependency order
    pub fn load_all(&self, db: &mut Database) -> MarketDbResult<LoadReport> {
        let mut report = LoadReport::default();
        for table in TABLES {
            let rows = self.load_table(db, table)?;
            report.tables.push(TableLoad {
                table: table.name.to_string(),
                rows,
            });
        }
        info!(rows = report.total_rows(), dir = %self.dir.display(), "dataset loaded");
        Ok(report)
    }

    /// Load a single table from its CSV file
    pub fn load_table(&self, db: &mut Database, table: &TableDef) -> MarketDbResult<usize> {
        let path = self.csv_path(table);
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                MarketDbError::NotFound(format!(
                    "CSV file for '{}' at {}",
                    table.name,
                    path.display()
                ))
            }
            _ => MarketDbError::Io(e),
        })?;
        let rows = load_from_reader(db, table, file)?;
        info!(table = table.name, rows, "loaded table");
        Ok(rows)
    }
}

/// Insert CSV records into `table` in a single transaction.
///
/// The header must name every table column; extra CSV columns are ignored.
/// Empty fields are stored as NULL.
pub fn load_from_reader<R: Read>(
    db: &mut Database,
    table: &TableDef,
    reader: R,
) -> MarketDbResult<usize> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut indices = Vec::with_capacity(table.columns.len());
    for column in table.column_names() {
        let idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| schema_err!("CSV for '{}' has no '{}' column", table.name, column))?;
        indices.push(idx);
    }
    debug!(table = table.name, ?indices, "mapped CSV columns");

    let insert_sql = table.insert_sql();
    db.with_transaction(|tx| {
        let mut stmt = tx.prepare(&insert_sql)?;
        let mut count = 0;
        for result in csv_reader.records() {
            let record = result?;
            let values: Vec<Value> = indices
                .iter()
                .map(|&idx| Value::from(record.get(idx).filter(|field| !field.is_empty())))
                .collect();
            stmt.execute(rusqlite::params_from_iter(values.iter()))?;
            count += 1;
            if count % LOAD_PROGRESS_INTERVAL == 0 {
                debug!(table = table.name, rows = count, "loading");
            }
        }
        Ok(count)
    })
}
