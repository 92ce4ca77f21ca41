//! Value and row types returned by queries
//!
//! - Value: one SQLite value tagged with its storage class
//! - Row: an ordered column-name to value record

pub mod row;
pub mod value;

pub use row::Row;
pub use value::Value;
