//! tql: typed queries against SQLite from the command line
//!
//! # Usage
//!
//! ```bash
//! # List tables, or the columns of one table
//! tql -d app.db schema
//! tql -d app.db schema users
//!
//! # Query
//! tql -d app.db select users --columns id,name --where "age >= 18" --order "name desc"
//!
//! # Show SQL and parameters only
//! tql -d app.db delete sessions --where "expired = 1" --dry-run
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use tql::config::{OutputFormat, TqlConfig};
use tql::prelude::*;

#[derive(Parser)]
#[command(name = "tql")]
#[command(version)]
#[command(about = "Typed queries against SQLite databases", long_about = None)]
#[command(after_help = "EXAMPLES:
    tql -d app.db schema users
    tql -d app.db select users --where \"name like 'A%' and age > 30\" --limit 10
    tql -d app.db count orders --where \"shipped is null\"")]
struct Cli {
    /// SQLite database file
    #[arg(short, long, env = "TQL_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Config file (defaults to ./tql.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log prepared statements and bound parameters
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables, or the columns of TABLE
    Schema { table: Option<String> },
    /// Select rows from a table
    Select {
        table: String,
        /// Comma separated column names (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Filter, e.g. "age >= 18 and name like 'A%'"
        #[arg(short, long = "where")]
        filter: Option<String>,
        /// Ordering, e.g. "name desc nulls last, id"
        #[arg(short, long)]
        order: Option<String>,
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
        /// Don't execute, just show the generated SQL
        #[arg(long)]
        dry_run: bool,
    },
    /// Count rows in a table
    Count {
        table: String,
        #[arg(short, long = "where")]
        filter: Option<String>,
    },
    /// Delete rows from a table
    Delete {
        table: String,
        #[arg(short, long = "where")]
        filter: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => TqlConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TqlConfig::discover()?,
    };
    init_logging(cli.verbose, config.log_level.as_deref());

    let format = cli.format.or(config.format).unwrap_or_default();
    let path = cli
        .database
        .clone()
        .or(config.database)
        .context("No database. Use --database, set TQL_DATABASE or add `database` to tql.toml")?;
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    match &cli.command {
        Commands::Schema { table } => show_schema(&db, table.as_deref()),
        Commands::Select {
            table,
            columns,
            filter,
            order,
            limit,
            offset,
            dry_run,
        } => {
            let table = db.table(table)?;
            let columns = if columns.is_empty() {
                table.all_columns()
            } else {
                columns
                    .iter()
                    .map(|c| table.column::<SqlValue>(c.as_str()))
                    .collect::<TqlResult<Vec<_>>>()?
            };
            let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

            let mut query = table.select(columns)?;
            if let Some(filter) = filter {
                query = query.filter(parse_filter(&table, filter)?)?;
            }
            if let Some(order) = order {
                query = query.order_by(parse_order(&table, order)?)?;
            }
            match (limit, offset) {
                (Some(limit), offset) => {
                    query = query.limit_offset(*limit, offset.unwrap_or(0))?;
                }
                // SQLite has no OFFSET without LIMIT.
                (None, Some(offset)) => {
                    query = query.limit_offset(Limit::MAX, *offset)?;
                }
                (None, None) => {}
            }

            let sql = query.sql();
            if *dry_run {
                print_sql(&sql, &query.parameters());
                return Ok(());
            }

            let mut stmt = query.compile(&db)?;
            stmt.bind(BindParameters::ALL)?;
            let rows = stmt.fetch_all()?;
            format_output(&names, &rows, format)
        }
        Commands::Count { table, filter } => {
            let table = db.table(table)?;
            let mut query = table.count();
            if let Some(filter) = filter {
                query = query.filter(parse_filter(&table, filter)?)?;
            }
            let mut stmt = query.compile(&db)?;
            stmt.bind(BindParameters::ALL)?;
            println!("{}", stmt.execute()?.to_string().cyan());
            Ok(())
        }
        Commands::Delete {
            table,
            filter,
            dry_run,
        } => {
            let table = db.table(table)?;
            let mut query = table.delete();
            if let Some(filter) = filter {
                query = query.filter(parse_filter(&table, filter)?)?;
            }

            let sql = query.sql();
            if *dry_run {
                print_sql(&sql, &query.parameters());
                return Ok(());
            }

            let mut stmt = query.compile(&db)?;
            stmt.bind(BindParameters::ALL)?;
            let affected = stmt.execute()?;
            println!("{} {} rows affected", "✓".green(), affected);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, level: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("tql=debug")
    } else if let Some(level) = level {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show_schema(db: &Database, table: Option<&str>) -> Result<()> {
    match table {
        None => {
            let names = db.table_names()?;
            if names.is_empty() {
                println!("{}", "(no tables)".dimmed());
            }
            for name in names {
                let columns = db.table(&name)?.column_count();
                println!("{} {}", name.white().bold(), format!("({} columns)", columns).dimmed());
            }
        }
        Some(name) => {
            let table = db.table(name)?;
            println!("{}", table.name().white().bold());
            for (position, column) in table.columns().iter().enumerate() {
                println!(
                    "  {:>3} {:24} {}",
                    position.to_string().dimmed(),
                    column.name.to_string().cyan(),
                    column.value_type.to_string().yellow()
                );
            }
        }
    }
    Ok(())
}

fn print_sql(sql: &str, params: &[&Param]) {
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", sql.white());
    if !params.is_empty() {
        println!();
        println!("{}", "Bindings:".cyan());
        for param in params {
            println!("  ?{} = {}", param.index(), param.to_string().yellow());
        }
    }
}

fn format_output(names: &[String], rows: &[Vec<SqlValue>], format: OutputFormat) -> Result<()> {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let objects = rows
                .iter()
                .map(|row| {
                    names
                        .iter()
                        .cloned()
                        .zip(row.iter().map(serde_json::to_value))
                        .map(|(name, value)| value.map(|v| (name, v)))
                        .collect::<Result<serde_json::Map<_, _>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&objects)?);
        }
        OutputFormat::Table => {
            let mut widths: HashMap<usize, usize> =
                names.iter().enumerate().map(|(i, n)| (i, n.len())).collect();
            for row in rows {
                for (i, value) in row.iter().enumerate() {
                    let len = value.to_string().chars().count();
                    if let Some(w) = widths.get_mut(&i) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(i, n)| format!("{:width$}", n, width = widths[&i]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = (0..names.len()).map(|i| "─".repeat(widths[&i])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, value)| format!("{:width$}", value.to_string(), width = widths[&i]))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
    Ok(())
}
