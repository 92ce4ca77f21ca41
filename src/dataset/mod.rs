//! Marketplace dataset: table definitions and CSV loading

pub mod csv_loader;
pub mod schema;

pub use csv_loader::{load_from_reader, CsvLoader, LoadReport, TableLoad};
pub use schema::{create_tables, drop_tables, ColumnDef, TableDef, TABLES};
