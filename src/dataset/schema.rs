//! Marketplace schema
//!
//! Apps are linked to categories and pricing plans through two junction
//! tables. Ids are stored as TEXT so both numeric and UUID-style ids load.

use crate::common::error::MarketDbResult;
use crate::database::Database;
use tracing::info;

/// A column in a table definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Column constraints appended after the type, e.g. `PRIMARY KEY`
    pub constraints: &'static str,
}

/// A table definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Table constraints, e.g. composite primary keys
    pub constraints: &'static [&'static str],
}

const fn col(name: &'static str, sql_type: &'static str, constraints: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        constraints,
    }
}

pub const APPS: TableDef = TableDef {
    name: "apps",
    columns: &[
        col("id", "TEXT", "PRIMARY KEY"),
        col("url", "TEXT", ""),
        col("title", "TEXT", "NOT NULL"),
        col("developer", "TEXT", ""),
        col("developer_link", "TEXT", ""),
        col("icon", "TEXT", ""),
        col("rating", "REAL", ""),
        col("reviews_count", "INTEGER", ""),
        col("description", "TEXT", ""),
        col("tagline", "TEXT", ""),
        col("pricing_hint", "TEXT", ""),
    ],
    constraints: &[],
};

pub const CATEGORIES: TableDef = TableDef {
    name: "categories",
    columns: &[
        col("id", "TEXT", "PRIMARY KEY"),
        col("title", "TEXT", "NOT NULL"),
    ],
    constraints: &[],
};

pub const PRICING_PLANS: TableDef = TableDef {
    name: "pricing_plans",
    columns: &[
        col("id", "TEXT", "PRIMARY KEY"),
        col("app_id", "TEXT", "REFERENCES apps(id)"),
        col("title", "TEXT", ""),
        col("price", "TEXT", "NOT NULL"),
    ],
    constraints: &[],
};

pub const APPS_CATEGORIES: TableDef = TableDef {
    name: "apps_categories",
    columns: &[
        col("app_id", "TEXT", "NOT NULL REFERENCES apps(id)"),
        col("category_id", "TEXT", "NOT NULL REFERENCES categories(id)"),
    ],
    constraints: &["PRIMARY KEY (app_id, category_id)"],
};

pub const APPS_PRICING_PLANS: TableDef = TableDef {
    name: "apps_pricing_plans",
    columns: &[
        col("app_id", "TEXT", "NOT NULL REFERENCES apps(id)"),
        col("pricing_plan_id", "TEXT", "NOT NULL REFERENCES pricing_plans(id)"),
    ],
    constraints: &["PRIMARY KEY (app_id, pricing_plan_id)"],
};

pub const KEY_BENEFITS: TableDef = TableDef {
    name: "key_benefits",
    columns: &[
        col("app_id", "TEXT", "NOT NULL REFERENCES apps(id)"),
        col("title", "TEXT", "NOT NULL"),
        col("description", "TEXT", ""),
    ],
    constraints: &[],
};

/// Every table, in load order: referenced tables come before their referrers
pub const TABLES: &[TableDef] = &[
    APPS,
    CATEGORIES,
    PRICING_PLANS,
    APPS_CATEGORIES,
    APPS_PRICING_PLANS,
    KEY_BENEFITS,
];

/// Find a table definition by name
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|table| table.name == name)
}

impl TableDef {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|column| column.name)
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                if column.constraints.is_empty() {
                    format!("  {} {}", column.name, column.sql_type)
                } else {
                    format!("  {} {} {}", column.name, column.sql_type, column.constraints)
                }
            })
            .collect();
        parts.extend(self.constraints.iter().map(|c| format!("  {}", c)));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            parts.join(",\n")
        )
    }

    /// INSERT statement with one positional parameter per column
    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len())
            .map(|i| format!("?{}", i))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_names().collect::<Vec<_>>().join(", "),
            placeholders.join(", ")
        )
    }
}

/// Create every marketplace table. Safe to call on a database that already has them.
pub fn create_tables(db: &Database) -> MarketDbResult<()> {
    let sql: Vec<String> = TABLES.iter().map(|table| table.create_sql()).collect();
    db.execute(&format!("{};", sql.join(";\n")))?;
    info!(tables = TABLES.len(), "created schema");
    Ok(())
}

/// Drop every marketplace table, referrers first
pub fn drop_tables(db: &Database) -> MarketDbResult<()> {
    let sql: Vec<String> = TABLES
        .iter()
        .rev()
        .map(|table| format!("DROP TABLE IF EXISTS {};", table.name))
        .collect();
    db.execute(&sql.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_sql() {
        assert_eq!(
            CATEGORIES.create_sql(),
            "CREATE TABLE IF NOT EXISTS categories (\n  id TEXT PRIMARY KEY,\n  title TEXT NOT NULL\n)"
        );
        assert!(APPS_CATEGORIES
            .create_sql()
            .contains("PRIMARY KEY (app_id, category_id)"));
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            PRICING_PLANS.insert_sql(),
            "INSERT INTO pricing_plans (id, app_id, title, price) VALUES (?1, ?2, ?3, ?4)"
        );
    }

    #[test]
    fn test_create_tables_is_idempotent() -> MarketDbResult<()> {
        let db = Database::new_in_memory()?;
        create_tables(&db)?;
        create_tables(&db)?;
        let mut expected: Vec<&str> = TABLES.iter().map(|t| t.name).collect();
        expected.sort();
        assert_eq!(db.table_names()?, expected);

        drop_tables(&db)?;
        assert!(db.table_names()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_order() {
        let position = |name: &str| TABLES.iter().position(|t| t.name == name);
        assert!(position("apps") < position("apps_pricing_plans"));
        assert!(position("pricing_plans") < position("apps_pricing_plans"));
        assert!(position("categories") < position("apps_categories"));
        assert_eq!(table("key_benefits"), Some(&KEY_BENEFITS));
        assert_eq!(table("reviews"), None);
    }
}
