//! MarketDB - Main Entry Point
//!
//! Command line front end: stage databases, load the dataset, run reports
//! and ad-hoc SQL, or drop into an interactive shell.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process;
use tracing::Level;

use marketdb::{reports, CsvLoader, Database, DatabaseConfig, QueryResult};

fn run_interactive_mode(database: &Database) -> Result<(), Box<dyn std::error::Error>> {
    println!("MarketDB v{}", env!("CARGO_PKG_VERSION"));
    println!("Enter '.help' for usage hints.");
    println!("Enter SQL statements terminated with a semicolon (;)");
    println!();

    let mut settings = Settings::default();
    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir()
        .map(|mut path| {
            path.push(".marketdb_history");
            path
        })
        .unwrap_or_else(|| PathBuf::from(".marketdb_history"));

    // Load history if it exists
    let _ = rl.load_history(&history_file);

    let mut sql_buffer = String::new();

    loop {
        let prompt = if sql_buffer.is_empty() {
            "marketdb> "
        } else {
            "       -> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if sql_buffer.is_empty() && trimmed.starts_with('.') {
                    let _ = rl.add_history_entry(trimmed);
                    match handle_special_command(trimmed, database, &mut settings) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                    continue;
                }

                if trimmed.is_empty() {
                    continue;
                }

                if !sql_buffer.is_empty() {
                    sql_buffer.push(' ');
                }
                sql_buffer.push_str(trimmed);

                if trimmed.ends_with(';') {
                    let _ = rl.add_history_entry(&sql_buffer);
                    if let Err(e) = execute_sql(database, &sql_buffer, &settings) {
                        eprintln!("Error: {}", e);
                    }
                    sql_buffer.clear();
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                sql_buffer.clear();
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_file);

    Ok(())
}

struct Settings {
    mode: OutputMode,
    timer: bool,
}

#[derive(Debug, Clone, Copy)]
enum OutputMode {
    Table,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: OutputMode::Table,
            timer: true,
        }
    }
}

fn handle_special_command(
    command: &str,
    database: &Database,
    settings: &mut Settings,
) -> Result<bool, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    let cmd = parts.first().copied().unwrap_or("");

    match cmd {
        ".exit" | ".quit" => {
            println!("Goodbye!");
            Ok(true)
        }
        ".help" => {
            print_help();
            Ok(false)
        }
        ".tables" => {
            for table in database.table_names()? {
                println!("{}", table);
            }
            Ok(false)
        }
        ".schema" => {
            let filter = parts.get(1).copied();
            for table in database.table_names()? {
                if filter.is_some_and(|name| name != table) {
                    continue;
                }
                if let Some(sql) = database.table_sql(&table)? {
                    println!("{};", sql);
                }
            }
            Ok(false)
        }
        ".mode" => {
            match parts.get(1).map(|m| m.to_lowercase()).as_deref() {
                Some("table") => settings.mode = OutputMode::Table,
                Some("json") => settings.mode = OutputMode::Json,
                Some(_) => eprintln!("Invalid mode. Use: table or json"),
                None => {}
            }
            println!("Mode: {:?}", settings.mode);
            Ok(false)
        }
        ".timer" => {
            if let Some(setting) = parts.get(1) {
                settings.timer = setting.eq_ignore_ascii_case("on");
            }
            println!("Timer: {}", if settings.timer { "on" } else { "off" });
            Ok(false)
        }
        ".report" => {
            print_report(database, matches!(settings.mode, OutputMode::Json))?;
            Ok(false)
        }
        _ => {
            println!("Unknown command: {}", cmd);
            println!("Type '.help' for list of available commands.");
            Ok(false)
        }
    }
}

fn print_help() {
    println!(
        r#"
.help                    Show this help message
.quit                    Exit this program
.exit                    Exit this program
.tables                  List all tables
.schema ?TABLE?          Show the CREATE statements (all tables or specific table)
.mode MODE               Set output mode (table, json)
.timer on|off            Turn SQL timer on or off (default: on)
.report                  Run the marketplace reports

SQL Statements:
  Type SQL statements terminated with a semicolon (;)
  Multi-line statements are supported

Keyboard Shortcuts:
  Ctrl+C                Cancel current statement
  Ctrl+D                Exit (same as .exit)
  Up/Down arrows        Navigate command history
"#
    );
}

fn print_result(result: &QueryResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else if result.column_count() > 0 {
        print!("{}", result.to_table_string());
    }
    Ok(())
}

fn print_report(database: &Database, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let report = reports::run_all(database)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Apps on free pricing plans: {}", report.free_plans.count);
    println!();
    println!("Top categories:");
    for row in &report.top_categories {
        println!("  {:>6}  {}", row.count, row.category);
    }
    println!();
    println!("Top prices between $5 and $10:");
    for row in &report.top_prices {
        println!("  {:>6}  {} ({})", row.count, row.price, row.casted_price);
    }
    Ok(())
}

fn execute_sql(
    database: &Database,
    sql: &str,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = std::time::Instant::now();
    let result = database.query(sql)?;
    print_result(&result, matches!(settings.mode, OutputMode::Json))?;

    let rows = result.row_count();
    let plural = if rows == 1 { "" } else { "s" };
    if settings.timer {
        println!(
            "Query executed successfully ({} row{} in {:.3}s)",
            rows,
            plural,
            start_time.elapsed().as_secs_f64()
        );
    } else {
        println!("Query executed successfully ({} row{})", rows, plural);
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "marketdb")]
#[command(about = "MarketDB - Marketplace dataset on embedded SQLite")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory holding staged database files (overrides config and MARKETDB_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Staged database id to work on (in-memory if not specified)
    #[arg(short, long)]
    database: Option<String>,

    /// Stage the database from this existing id before opening it
    #[arg(long, requires = "database")]
    from: Option<String>,

    /// Create the marketplace tables
    #[arg(long)]
    init: bool,

    /// Load CSV exports from this directory
    #[arg(long)]
    load: Option<PathBuf>,

    /// Run the marketplace reports
    #[arg(short, long)]
    report: bool,

    /// SQL query to execute
    #[arg(short, long)]
    query: Option<String>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<DatabaseConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => DatabaseConfig::from_json_file(path)?,
        None => DatabaseConfig::from_env(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    let mut database = match (&cli.database, &cli.from) {
        (Some(target), Some(source)) => Database::from_existing(&config, source, target)?,
        (Some(id), None) => Database::open_stage(&config, id)?,
        (None, _) => Database::new_in_memory()?,
    };

    if cli.init {
        marketdb::create_tables(&database)?;
    }

    if let Some(dir) = &cli.load {
        let report = CsvLoader::new(dir).load_all(&mut database)?;
        for table in &report.tables {
            println!("{:<20} {:>8} rows", table.table, table.rows);
        }
    }

    if cli.report {
        print_report(&database, cli.json)?;
    }

    if let Some(query) = &cli.query {
        let result = database.query(query)?;
        print_result(&result, cli.json)?;
    }

    if cli.interactive {
        run_interactive_mode(&database)?;
    } else if !(cli.init
        || cli.load.is_some()
        || cli.report
        || cli.query.is_some()
        || cli.from.is_some())
    {
        println!("Nothing to do: pass --init, --load, --report, --query or --interactive");
        process::exit(1);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
