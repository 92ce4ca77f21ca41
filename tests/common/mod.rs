//! Shared fixture: a small marketplace dataset written as CSV exports

#![allow(dead_code)]

use marketdb::{create_tables, CsvLoader, Database, DatabaseConfig, MarketDbResult};
use std::path::Path;
use tempfile::TempDir;

pub const APPS_CSV: &str = "\
id,url,title,developer,developer_link,icon,rating,reviews_count,description_raw,description,tagline,pricing_hint
1,https://apps.example.com/a,Page Builder,Acme,,,4.8,120,<p>raw</p>,Build pages,Drag and drop,Free plan available
2,https://apps.example.com/b,Upsell Pro,Bolt,,,4.5,80,,Upsells,More revenue,
3,https://apps.example.com/c,Theme Kit,Acme,,,4.1,15,,Themes,,Free trial available
4,https://apps.example.com/d,Promo Bar,Crest,,,3.9,7,,Banners,,
5,https://apps.example.com/e,Mailer,Dune,,,4.9,300,,Email,,
6,https://apps.example.com/f,Stats,Echo,,,,0,,Analytics,,
";

pub const CATEGORIES_CSV: &str = "\
id,title
1,Store design
2,Sales and conversion optimization
3,Marketing
4,Reporting
";

pub const APPS_CATEGORIES_CSV: &str = "\
app_id,category_id
1,1
2,1
3,1
4,1
1,2
2,2
3,2
5,3
6,3
1,4
";

// Plan 9 is free but offered by no app, so it still counts once through the LEFT JOIN
pub const PRICING_PLANS_CSV: &str = "\
id,app_id,title,price
1,1,Basic,Free
2,3,Starter,Free to install
3,1,Pro,$9.99/month
4,3,Lite,$5/month
5,5,Plus,$10/month
6,6,Team,$19/month
7,6,Lifetime,$7 one time charge
8,4,Growth,$9.99/month
9,,Legacy,Free
";

pub const APPS_PRICING_PLANS_CSV: &str = "\
app_id,pricing_plan_id
1,1
2,1
3,2
1,3
2,3
4,8
5,8
3,4
4,4
6,4
5,5
1,5
6,6
6,7
";

pub const KEY_BENEFITS_CSV: &str = "\
app_id,title,description
1,Fast setup,Live in minutes
5,Automations,Send on schedule
";

/// Write every fixture CSV into `dir`
pub fn write_dataset(dir: &Path) -> std::io::Result<()> {
    let files = [
        ("apps.csv", APPS_CSV),
        ("categories.csv", CATEGORIES_CSV),
        ("apps_categories.csv", APPS_CATEGORIES_CSV),
        ("pricing_plans.csv", PRICING_PLANS_CSV),
        ("apps_pricing_plans.csv", APPS_PRICING_PLANS_CSV),
        ("key_benefits.csv", KEY_BENEFITS_CSV),
    ];
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents)?;
    }
    Ok(())
}

/// Stage database `id` under `root/db` with the schema created and the fixture loaded
pub fn stage_loaded_database(root: &TempDir, id: &str) -> MarketDbResult<DatabaseConfig> {
    let csv_dir = root.path().join("csv");
    std::fs::create_dir_all(&csv_dir)?;
    write_dataset(&csv_dir)?;

    let config = DatabaseConfig::with_data_dir(root.path().join("db"));
    let mut db = Database::create_new(&config, id)?;
    create_tables(&db)?;
    CsvLoader::new(&csv_dir).load_all(&mut db)?;
    Ok(config)
}
