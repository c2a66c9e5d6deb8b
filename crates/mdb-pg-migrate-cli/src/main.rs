//! mdb-pg-migrate CLI - MS Access (.mdb) to PostgreSQL migration.

use chrono::Local;
use clap::{Parser, Subcommand};
use mdb_pg_migrate::{
    build_rename_statements, default_script_name, normalize, render_script, Config, MdbFile,
    MigrateError, Orchestrator, PgStore, SchemaSource, TargetMode,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mdb-pg-migrate")]
#[command(about = "MS Access (.mdb) to PostgreSQL migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the Access database into PostgreSQL
    Run {
        /// Override target mode: drop-recreate or truncate
        #[arg(long)]
        mode: Option<String>,
    },

    /// List source tables with their row counts and target names
    Tables,

    /// Generate a snake_case rename script for an already-imported database
    RenameScript {
        /// Output path for the script [default: rename_<timestamp>.sql]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the statements against the target after writing the script
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { mode } => {
            if let Some(mode) = mode {
                config.migration.target_mode = parse_mode(&mode)?;
            }

            let orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = if result.failed_tables.is_empty() {
                    "Migration completed!"
                } else {
                    "Migration completed with failures"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!(
                    "  Tables: {}/{}",
                    result.tables_imported, result.tables_total
                );
                println!("  Rows: {}", result.rows_transferred);
                if result.tables_skipped > 0 {
                    println!("  Skipped (empty): {}", result.tables_skipped);
                }
                if !result.failed_tables.is_empty() {
                    println!("  Failed tables: {:?}", result.failed_tables);
                }
            }
        }

        Commands::Tables => {
            let source = MdbFile::new(&config.source, config.migration.chunk_bytes)?;
            let names = source.table_names().await?;
            let counts: HashMap<String, i64> =
                source.row_counts().await?.into_iter().collect();

            if cli.output_json {
                let entries: Vec<serde_json::Value> = names
                    .iter()
                    .map(|name| {
                        serde_json::json!({
                            "name": name,
                            "target_name": normalize(name),
                            "rows": counts.get(name),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Tables in {:?}:", config.source.file);
                for name in &names {
                    let rows = counts
                        .get(name)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    println!("  {} -> {} ({} rows)", name, normalize(name), rows);
                }
            }
        }

        Commands::RenameScript { output, execute } => {
            let mut store = PgStore::connect(&config.target).await?;
            let relations = store.relations().await?;
            let indexes = store.indexes().await?;
            let statements =
                build_rename_statements(&config.target.schema, &relations, &indexes);

            if statements.is_empty() {
                println!("All names are already snake_case; nothing to rename");
                return Ok(());
            }

            let now = Local::now();
            let path = output.unwrap_or_else(|| PathBuf::from(default_script_name(now)));
            let script = render_script(&config.target.schema, &statements, now);
            std::fs::write(&path, &script)?;
            print!("{}", script);
            println!("Wrote {} statements to {:?}", statements.len(), path);

            if execute {
                store.execute_script(&script).await?;
                println!("Executed rename script against {}", config.target.database);
            }
        }
    }

    Ok(())
}

fn parse_mode(mode: &str) -> Result<TargetMode, MigrateError> {
    match mode {
        "drop-recreate" | "drop_recreate" => Ok(TargetMode::DropRecreate),
        "truncate" => Ok(TargetMode::Truncate),
        other => Err(MigrateError::Config(format!(
            "unknown target mode {:?} (expected drop-recreate or truncate)",
            other
        ))),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
