//! Cross-table marketplace reports
//!
//! Each report joins pricing plans or categories to apps through the
//! junction tables, aggregates, and returns typed rows.

use crate::common::error::{MarketDbError, MarketDbResult};
use crate::database::Database;
use crate::invalid_arg_err;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price labels that mean the plan costs nothing
pub const FREE_PRICE_LABELS: [&str; 2] = ["Free", "Free to install"];

/// Number of rows the default reports return
pub const DEFAULT_TOP_LIMIT: u32 = 3;

/// Default inclusive price range, in dollars
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (5.0, 10.0);

/// Pricing plans offered for free, counted across their app links
pub const FREE_PLAN_COUNT_SQL: &str = "SELECT COUNT(*) AS count
    FROM pricing_plans
    LEFT JOIN apps_pricing_plans ON pricing_plans.id = apps_pricing_plans.pricing_plan_id
    LEFT JOIN apps ON apps_pricing_plans.app_id = apps.id
    WHERE price = ?1 OR price = ?2";

/// Categories ranked by how many apps they hold
pub const TOP_CATEGORIES_SQL: &str = "SELECT COUNT(*) AS count, categories.title AS category
    FROM categories
    LEFT JOIN apps_categories ON categories.id = apps_categories.category_id
    GROUP BY category
    ORDER BY count DESC
    LIMIT ?1";

/// Prices ranked by how many apps use them, within an inclusive range.
///
/// The amount is cut out of the price label: monthly plans look like
/// `$9.99/month`, one-time plans like `$7 one time charge`.
pub const TOP_PRICES_IN_RANGE_SQL: &str = "SELECT count(*) AS count, price,
    CASE
        WHEN price LIKE '%/%' THEN CAST(substr(price, instr(price, '$')+1, instr(price, '/')-2) AS REAL)
        ELSE CAST(substr(price, instr(price, '$')+1, instr(price, 'one')-2) AS REAL)
    END AS casted_price
    FROM pricing_plans
    LEFT JOIN apps_pricing_plans ON pricing_plans.id = apps_pricing_plans.pricing_plan_id
    LEFT JOIN apps ON apps_pricing_plans.app_id = apps.id
    WHERE casted_price BETWEEN ?1 AND ?2
    GROUP BY casted_price
    ORDER BY count DESC
    LIMIT ?3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreePlanCount {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub count: i64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCount {
    pub count: i64,
    /// One of the price labels in the group
    pub price: String,
    pub casted_price: f64,
}

/// All default reports together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketReport {
    pub free_plans: FreePlanCount,
    pub top_categories: Vec<CategoryCount>,
    pub top_prices: Vec<PriceCount>,
}

/// Count pricing plan rows priced as free, joined through to their apps
pub fn free_plan_count(db: &Database) -> MarketDbResult<FreePlanCount> {
    let [free, free_to_install] = FREE_PRICE_LABELS;
    db.select_single_row_as(FREE_PLAN_COUNT_SQL, params![free, free_to_install])?
        .ok_or_else(|| MarketDbError::NotFound("free plan count returned no rows".to_string()))
}

/// The `limit` categories with the most apps
pub fn top_categories(db: &Database, limit: u32) -> MarketDbResult<Vec<CategoryCount>> {
    let rows: Vec<CategoryCount> = db.select_multiple_rows_as(TOP_CATEGORIES_SQL, params![limit])?;
    debug!(limit, returned = rows.len(), "top categories");
    Ok(rows)
}

/// The `limit` most used prices between `min` and `max` dollars inclusive.
/// Monthly and one-time prices are treated alike.
pub fn top_prices_in_range(
    db: &Database,
    min: f64,
    max: f64,
    limit: u32,
) -> MarketDbResult<Vec<PriceCount>> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(invalid_arg_err!("invalid price range {}..={}", min, max));
    }
    let rows: Vec<PriceCount> =
        db.select_multiple_rows_as(TOP_PRICES_IN_RANGE_SQL, params![min, max, limit])?;
    debug!(min, max, limit, returned = rows.len(), "top prices");
    Ok(rows)
}

/// Run every report with the default limit and price range
pub fn run_all(db: &Database) -> MarketDbResult<MarketReport> {
    let (min, max) = DEFAULT_PRICE_RANGE;
    Ok(MarketReport {
        free_plans: free_plan_count(db)?,
        top_categories: top_categories(db, DEFAULT_TOP_LIMIT)?,
        top_prices: top_prices_in_range(db, min, max, DEFAULT_TOP_LIMIT)?,
    })
}
