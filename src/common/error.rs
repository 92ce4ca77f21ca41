//! Error handling for MarketDB

use thiserror::Error;

/// Main error type for MarketDB operations
#[derive(Error, Debug)]
pub enum MarketDbError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for MarketDB operations
pub type MarketDbResult<T> = std::result::Result<T, MarketDbError>;

/// Macro for creating invalid argument errors
#[macro_export]
macro_rules! invalid_arg_err {
    ($msg:expr) => {
        $crate::common::error::MarketDbError::InvalidArgument($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::MarketDbError::InvalidArgument(format!($fmt, $($arg)*))
    };
}

/// Macro for creating schema errors
#[macro_export]
macro_rules! schema_err {
    ($msg:expr) => {
        $crate::common::error::MarketDbError::Schema($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::MarketDbError::Schema(format!($fmt, $($arg)*))
    };
}
