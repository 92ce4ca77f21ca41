//! Constants used throughout MarketDB

/// Environment variable that overrides the staged database directory
pub const DATA_DIR_ENV: &str = "MARKETDB_DATA_DIR";

/// Default directory for staged database files
pub const DEFAULT_DATA_DIR: &str = "db";

/// File extension of staged database files
pub const DATABASE_FILE_EXTENSION: &str = "db";

/// Default SQLite busy timeout in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Rows inserted between loader progress messages
pub const LOAD_PROGRESS_INTERVAL: usize = 10_000;
