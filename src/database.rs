//! Database implementation
//!
//! This module provides the `Database` handle: a thin layer over an embedded
//! SQLite connection that stages database files between phases and returns
//! query results as column-name keyed rows.

use crate::common::constants::{
    DATABASE_FILE_EXTENSION, DATA_DIR_ENV, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATA_DIR,
};
use crate::common::error::{MarketDbError, MarketDbResult};
use crate::invalid_arg_err;
use crate::types::{Row, Value};
use rusqlite::{Connection, OpenFlags, Params, Transaction};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main database instance
pub struct Database {
    /// Underlying SQLite connection
    conn: Connection,
    /// Database file path (None for in-memory databases)
    path: Option<PathBuf>,
}

impl Database {
    /// Create a new in-memory database
    pub fn new_in_memory() -> MarketDbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn, &DatabaseConfig::default())?;
        Ok(Database { conn, path: None })
    }

    /// Open a database file, creating it if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> MarketDbResult<Self> {
        Self::open_with_config(path, &DatabaseConfig::default())
    }

    /// Open a database file with explicit connection settings
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: &DatabaseConfig,
    ) -> MarketDbResult<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "opening database");
        let conn = Connection::open(&path)?;
        Self::configure(&conn, config)?;
        Ok(Database {
            conn,
            path: Some(path),
        })
    }

    /// Open the staged database `<data_dir>/<id>.db`, creating it if needed
    pub fn open_stage(config: &DatabaseConfig, id: &str) -> MarketDbResult<Self> {
        let path = config.database_path(id)?;
        std::fs::create_dir_all(&config.data_dir)?;
        Self::open_with_config(path, config)
    }

    /// Start a fresh staged database, discarding any previous file with the same id
    pub fn create_new(config: &DatabaseConfig, id: &str) -> MarketDbResult<Self> {
        let path = config.database_path(id)?;
        std::fs::create_dir_all(&config.data_dir)?;
        remove_database_files(&path)?;
        info!(id, path = %path.display(), "created new database");
        Self::open_with_config(path, config)
    }

    /// Stage the database produced by an earlier phase under a new id and open the copy.
    ///
    /// The copy is taken through SQLite, so changes still held in the source's
    /// WAL are included. The source is never modified and the copy replaces any
    /// existing target.
    pub fn from_existing(
        config: &DatabaseConfig,
        source_id: &str,
        target_id: &str,
    ) -> MarketDbResult<Self> {
        if source_id == target_id {
            return Err(invalid_arg_err!(
                "source and target database ids must differ (got '{}')",
                source_id
            ));
        }

        let source = config.database_path(source_id)?;
        let target = config.database_path(target_id)?;

        if !source.is_file() {
            return Err(MarketDbError::NotFound(format!(
                "database '{}' does not exist at {}",
                source_id,
                source.display()
            )));
        }

        std::fs::create_dir_all(&config.data_dir)?;
        remove_database_files(&target)?;

        let target_str = target
            .to_str()
            .ok_or_else(|| invalid_arg_err!("target path {} is not UTF-8", target.display()))?;
        {
            // Read-write without CREATE: a hot journal must be recoverable
            let source_conn = Connection::open_with_flags(
                &source,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            source_conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            source_conn.execute("VACUUM INTO ?1", [target_str])?;
        }

        let bytes = std::fs::metadata(&target)?.len();
        info!(source_id, target_id, bytes, "staged database from existing");

        Self::open_with_config(target, config)
    }

    fn configure(conn: &Connection, config: &DatabaseConfig) -> MarketDbResult<()> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        Ok(())
    }

    /// Check if this is a file-based database
    pub fn is_file_based(&self) -> bool {
        self.path.is_some()
    }

    /// Get the database file path (if file-based)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Borrow the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute one or more statements that return no rows
    pub fn execute(&self, sql: &str) -> MarketDbResult<()> {
        debug!(sql, "execute");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Execute a single parameterized statement and return the last inserted rowid
    pub fn insert<P: Params>(&self, sql: &str, params: P) -> MarketDbResult<i64> {
        debug!(sql, "insert");
        self.conn.execute(sql, params)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn with_transaction<T, F>(&mut self, f: F) -> MarketDbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> MarketDbResult<T>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Return the first row of a query, or `None` when it yields no rows
    pub fn select_single_row(&self, sql: &str) -> MarketDbResult<Option<Row>> {
        self.select_single_row_with(sql, [])
    }

    /// Parameterized form of [`Database::select_single_row`]
    pub fn select_single_row_with<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> MarketDbResult<Option<Row>> {
        debug!(sql, "select single row");
        let mut stmt = self.conn.prepare(sql)?;
        let names = column_names(&stmt);
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(Row::from_sqlite(row, &names)?)),
            None => Ok(None),
        }
    }

    /// Return every row of a query, in result order
    pub fn select_multiple_rows(&self, sql: &str) -> MarketDbResult<Vec<Row>> {
        self.select_multiple_rows_with(sql, [])
    }

    /// Parameterized form of [`Database::select_multiple_rows`]
    pub fn select_multiple_rows_with<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> MarketDbResult<Vec<Row>> {
        debug!(sql, "select multiple rows");
        let mut stmt = self.conn.prepare(sql)?;
        let names = column_names(&stmt);
        let rows = stmt
            .query_map(params, |row| Row::from_sqlite(row, &names))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    /// Select the first row and deserialize it into `T`
    pub fn select_single_row_as<T: DeserializeOwned, P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> MarketDbResult<Option<T>> {
        self.select_single_row_with(sql, params)?
            .map(|row| row.deserialize())
            .transpose()
    }

    /// Select all rows and deserialize each into `T`
    pub fn select_multiple_rows_as<T: DeserializeOwned, P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> MarketDbResult<Vec<T>> {
        self.select_multiple_rows_with(sql, params)?
            .iter()
            .map(Row::deserialize)
            .collect()
    }

    /// Run a query and keep its column names alongside the rows
    pub fn query(&self, sql: &str) -> MarketDbResult<QueryResult> {
        debug!(sql, "query");
        let mut stmt = self.conn.prepare(sql)?;
        let columns = column_names(&stmt);
        let rows = stmt
            .query_map([], |row| Row::from_sqlite(row, &columns))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult { columns, rows })
    }

    /// Names of all user tables, sorted
    pub fn table_names(&self) -> MarketDbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// The CREATE statement SQLite recorded for a table
    pub fn table_sql(&self, table_name: &str) -> MarketDbResult<Option<String>> {
        let row = self.select_single_row_with(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table_name],
        )?;
        Ok(row.and_then(|row| row.get("sql").and_then(Value::as_str).map(str::to_string)))
    }
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// SQLite keeps rollback journals and WAL state next to the database file
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Remove a database file and any sidecar files left by an earlier connection
fn remove_database_files(path: &Path) -> MarketDbResult<()> {
    remove_if_exists(path)?;
    for suffix in SIDECAR_SUFFIXES {
        let mut sidecar = path.as_os_str().to_os_string();
        sidecar.push(suffix);
        remove_if_exists(Path::new(&sidecar))?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> MarketDbResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Query result: column names plus the rows that were returned
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Create an empty query result
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Get the number of rows in the result
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns in the result
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the result is empty (no rows)
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.get_index(0))
    }

    /// Rows as a JSON array of objects
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(Row::to_json).collect())
    }

    /// Convert result to a formatted table string
    pub fn to_table_string(&self) -> String {
        let column_count = self.columns.len();
        if column_count == 0 {
            return String::new();
        }

        // Storage class of the first non-null value in each column
        let column_types: Vec<&str> = (0..column_count)
            .map(|idx| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get_index(idx))
                    .find(|value| !value.is_null())
                    .map(Value::type_name)
                    .unwrap_or("null")
            })
            .collect();

        let mut column_widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&column_types)
            .map(|(name, type_name)| name.chars().count().max(type_name.len()))
            .collect();

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.values().map(|value| value.to_string()).collect())
            .collect();

        for row in &cells {
            for (idx, cell) in row.iter().enumerate().take(column_count) {
                column_widths[idx] = column_widths[idx].max(cell.chars().count());
            }
        }

        let mut output = String::new();
        push_border(&mut output, &column_widths, '┌', '┬', '┐');
        push_line(&mut output, &column_widths, self.columns.iter().map(String::as_str));
        push_line(&mut output, &column_widths, column_types.iter().copied());
        push_border(&mut output, &column_widths, '├', '┼', '┤');
        for row in &cells {
            push_line(&mut output, &column_widths, row.iter().map(String::as_str));
        }
        push_border(&mut output, &column_widths, '└', '┴', '┘');

        output
    }
}

fn push_border(output: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    output.push(left);
    for (i, width) in widths.iter().enumerate() {
        output.push_str(&"─".repeat(width + 2));
        if i < widths.len() - 1 {
            output.push(mid);
        }
    }
    output.push(right);
    output.push('\n');
}

fn push_line<'a>(output: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    output.push('│');
    for (i, (cell, width)) in cells.zip(widths).enumerate() {
        let pad = width.saturating_sub(cell.chars().count());
        output.push(' ');
        output.push_str(cell);
        output.push_str(&" ".repeat(pad + 1));
        if i < widths.len() - 1 {
            output.push('│');
        }
    }
    output.push_str("│\n");
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding staged database files
    pub data_dir: PathBuf,
    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
}

impl DatabaseConfig {
    /// Configuration rooted at a specific data directory
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Default configuration, with the data directory taken from `MARKETDB_DATA_DIR` when set
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(DATA_DIR_ENV).ok())
    }

    /// Apply a `MARKETDB_DATA_DIR` value. Unset or blank keeps the default directory.
    fn from_env_value(value: Option<String>) -> Self {
        match value {
            Some(dir) if !dir.trim().is_empty() => Self::with_data_dir(dir),
            _ => Self::default(),
        }
    }

    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MarketDbResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            MarketDbError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Path of the staged database with the given id
    pub fn database_path(&self, id: &str) -> MarketDbResult<PathBuf> {
        validate_database_id(id)?;
        Ok(self
            .data_dir
            .join(format!("{}.{}", id, DATABASE_FILE_EXTENSION)))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: false,
        }
    }
}

/// Ids become file names, so they are restricted to `[A-Za-z0-9_-]`
fn validate_database_id(id: &str) -> MarketDbResult<()> {
    if id.is_empty() {
        return Err(invalid_arg_err!("database id must not be empty"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid_arg_err!("invalid database id '{}'", id));
    }
    Ok(())
}
