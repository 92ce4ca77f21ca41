//! MarketDB - Marketplace Dataset on Embedded SQLite
//!
//! MarketDB stages a SQLite database of software marketplace listings (apps,
//! categories, pricing plans) between phases, loads it from CSV exports, and
//! runs cross-table aggregation reports over it.
//!
pub mod common;
pub mod database;
pub mod dataset;
pub mod reports;
pub mod types;

// Re-export common types for convenience
pub use common::{MarketDbError, MarketDbResult};

// Re-export value types for convenience
pub use types::{Row, Value};

// Re-export database for convenience
pub use crate::database::{Database, DatabaseConfig, QueryResult};

// Re-export dataset and reports for convenience
pub use dataset::{create_tables, drop_tables, CsvLoader, LoadReport};
pub use reports::{CategoryCount, FreePlanCount, MarketReport, PriceCount};
