//! Queries across tables
//!
//! Stages the database produced by the load phase ("03") as "04" and checks
//! joins, grouping, string-to-number casting, ordering and limits.

mod common;

use marketdb::reports::{self, CategoryCount, FreePlanCount, PriceCount};
use marketdb::{Database, DatabaseConfig, MarketDbResult, Row, Value};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn staged() -> MarketDbResult<(TempDir, Database)> {
    let root = TempDir::new()?;
    let config: DatabaseConfig = common::stage_loaded_database(&root, "03")?;
    let db = Database::from_existing(&config, "03", "04")?;
    Ok((root, db))
}

#[test]
fn test_count_of_apps_with_free_pricing_plan() -> MarketDbResult<()> {
    let (_root, db) = staged()?;

    let query = "SELECT COUNT(*) AS count
                 FROM pricing_plans
                 LEFT JOIN apps_pricing_plans ON pricing_plans.id = apps_pricing_plans.pricing_plan_id
                 LEFT JOIN apps ON apps_pricing_plans.app_id = apps.id
                 WHERE price = 'Free' OR price = 'Free to install'";
    let result = db.select_single_row(query)?;
    assert_eq!(result, Some(Row::from_iter([("count", 4_i64)])));

    assert_eq!(reports::free_plan_count(&db)?, FreePlanCount { count: 4 });
    Ok(())
}

#[test]
fn test_top_3_most_common_categories() -> MarketDbResult<()> {
    let (_root, db) = staged()?;

    let query = "SELECT COUNT(*) AS count, categories.title AS category
                 FROM categories
                 LEFT JOIN apps_categories ON categories.id = apps_categories.category_id
                 GROUP BY category
                 ORDER BY count DESC
                 LIMIT 3";
    let result = db.select_multiple_rows(query)?;
    let expected: Vec<Row> = [
        (4_i64, "Store design"),
        (3, "Sales and conversion optimization"),
        (2, "Marketing"),
    ]
    .into_iter()
    .map(|(count, category)| {
        Row::from_iter([
            ("count", Value::Integer(count)),
            ("category", Value::from(category)),
        ])
    })
    .collect();
    assert_eq!(result, expected);

    let typed = reports::top_categories(&db, 3)?;
    assert_eq!(
        typed,
        vec![
            CategoryCount {
                count: 4,
                category: "Store design".to_string(),
            },
            CategoryCount {
                count: 3,
                category: "Sales and conversion optimization".to_string(),
            },
            CategoryCount {
                count: 2,
                category: "Marketing".to_string(),
            },
        ]
    );
    Ok(())
}

#[test]
fn test_top_3_prices_between_5_and_10_dollars() -> MarketDbResult<()> {
    let (_root, db) = staged()?;

    let query = "SELECT count(*) AS count, price,
                 CASE
                     WHEN price LIKE '%/%' THEN CAST(substr(price, instr(price, '$')+1, instr(price, '/')-2) AS REAL)
                     ELSE CAST(substr(price, instr(price, '$')+1, instr(price, 'one')-2) AS REAL)
                 END AS casted_price
                 FROM pricing_plans
                 LEFT JOIN apps_pricing_plans ON pricing_plans.id = apps_pricing_plans.pricing_plan_id
                 LEFT JOIN apps ON apps_pricing_plans.app_id = apps.id
                 WHERE casted_price BETWEEN 5 AND 10
                 GROUP BY casted_price
                 ORDER BY count DESC
                 LIMIT 3";
    let result: Vec<serde_json::Value> = db
        .select_multiple_rows(query)?
        .iter()
        .map(Row::to_json)
        .collect();
    assert_eq!(
        result,
        vec![
            serde_json::json!({ "count": 4, "price": "$9.99/month", "casted_price": 9.99 }),
            serde_json::json!({ "count": 3, "price": "$5/month", "casted_price": 5.0 }),
            serde_json::json!({ "count": 2, "price": "$10/month", "casted_price": 10.0 }),
        ]
    );

    let typed = reports::top_prices_in_range(&db, 5.0, 10.0, 3)?;
    assert_eq!(
        typed,
        vec![
            PriceCount {
                count: 4,
                price: "$9.99/month".to_string(),
                casted_price: 9.99,
            },
            PriceCount {
                count: 3,
                price: "$5/month".to_string(),
                casted_price: 5.0,
            },
            PriceCount {
                count: 2,
                price: "$10/month".to_string(),
                casted_price: 10.0,
            },
        ]
    );
    Ok(())
}

#[test]
fn test_one_time_charge_counts_in_range() -> MarketDbResult<()> {
    let (_root, db) = staged()?;

    let prices = reports::top_prices_in_range(&db, 5.0, 10.0, 10)?;
    let one_time = prices
        .iter()
        .find(|p| p.price == "$7 one time charge")
        .map(|p| (p.count, p.casted_price));
    assert_eq!(one_time, Some((1, 7.0)));
    assert!(prices.iter().all(|p| p.price != "$19/month"));
    Ok(())
}

#[test]
fn test_run_all_reports() -> MarketDbResult<()> {
    let (_root, db) = staged()?;

    let report = reports::run_all(&db)?;
    assert_eq!(report.free_plans.count, 4);
    assert_eq!(report.top_categories.len(), 3);
    assert_eq!(report.top_prices.len(), 3);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["top_categories"][0]["category"], "Store design");
    assert_eq!(json["top_prices"][1]["casted_price"], 5.0);
    Ok(())
}
