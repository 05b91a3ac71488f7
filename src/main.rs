//! factload CLI - load delimited fact files into SQLite

mod commands;

use clap::{Parser, Subcommand};
use factload::config::{self, FactloadConfig};
use factload::storage::{schema, TableStats};
use factload::ui::{self, Icons, Spinner};
use factload::{
    ImportReport, ObservationLoader, StoreConnection, TableImporter, TableLoader, output,
    with_connection,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "factload")]
#[command(version)]
#[command(about = "Load delimited fact files into SQLite tables")]
#[command(long_about = r#"
factload reads a delimited fact file (tab, comma or pipe separated) and
loads it into one SQLite table in a single transaction.

Example usage:
  factload init
  factload load --file OBSERVATION_FACT.txt --database "jdbc:sqlite:HUSH.sqlite"
  factload load --file facts.csv --policy skip-row --json
  factload stats --table observation_fact
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a delimited file into a table
    Load {
        /// Source file (defaults to `source` from the config)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Store location: jdbc:sqlite:<path>, sqlite:<path>, :memory: or a path
        #[arg(short, long)]
        database: Option<String>,

        /// Override the target table name
        #[arg(short, long)]
        table: Option<String>,

        /// Malformed-row policy: reject-all or skip-row
        #[arg(short, long)]
        policy: Option<String>,

        /// Field delimiter (a single character, or "tab")
        #[arg(long)]
        delimiter: Option<String>,

        /// The file has no header row; fields map to columns by position
        #[arg(long)]
        no_header: bool,

        /// Abort a skip-row load after this many rejected rows
        #[arg(long)]
        max_rejected: Option<usize>,
    },

    /// Show row statistics for a table
    Stats {
        /// Store location
        #[arg(short, long)]
        database: Option<String>,

        /// Table to inspect (defaults to the configured table)
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Print the CREATE TABLE statement for the configured table
    Schema,

    /// Write a starter factload.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show the version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a JSON success envelope for `command`
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(e) = run(cli, output_mode) {
        if output_mode.is_human() {
            ui::error(&format!("{:#}", e));
        } else {
            let envelope = serde_json::json!({ "ok": false, "error": format!("{:#}", e) });
            println!("{}", envelope);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let human = output_mode.is_human() && !output::is_quiet();
    let cfg = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Load {
            file,
            database,
            table,
            policy,
            delimiter,
            no_header,
            max_rejected,
        } => {
            let mut options = cfg.load.clone();
            if let Some(policy) = policy {
                options.policy = policy.parse()?;
            }
            if let Some(delimiter) = delimiter {
                options.delimiter = Some(parse_delimiter(&delimiter)?);
            }
            if no_header {
                options.has_header = false;
            }
            if max_rejected.is_some() {
                options.max_rejected = max_rejected;
            }

            let source = file
                .or_else(|| cfg.source.as_ref().map(PathBuf::from))
                .ok_or_else(|| anyhow::anyhow!("no source file (use --file or set `source` in the config)"))?;

            let location = match database {
                Some(location) => location,
                None => {
                    let location = cfg.database_location();
                    config::ensure_db_dir(&location)?;
                    location
                }
            };

            let mut spec = cfg.table_spec();
            if let Some(name) = table {
                spec.name = name;
            }

            if human {
                ui::header("factload");
                ui::info(Icons::FILE, "Source", &source.display().to_string());
                ui::info(Icons::DATABASE, "Store", &location);
                ui::info(Icons::TABLE, "Table", &spec.name);
            }
            tracing::debug!("Load options: {:?}", options);

            let spinner = human.then(|| Spinner::new(&format!("Loading {}", source.display())));

            let outcome = with_connection(&location, |store| -> anyhow::Result<ImportReport> {
                let mut importer: Box<dyn TableImporter + '_> = if spec.name == ObservationLoader::TABLE {
                    Box::new(
                        ObservationLoader::new(store, &source)
                            .with_table(spec)
                            .with_options(options),
                    )
                } else {
                    Box::new(TableLoader::new(store, &source, spec).with_options(options))
                };
                Ok(importer.load()?)
            });

            let report = match outcome {
                Ok(report) => {
                    if let Some(spinner) = &spinner {
                        spinner.finish_timed("Loaded");
                    }
                    report
                }
                Err(e) => {
                    if let Some(spinner) = &spinner {
                        spinner.clear();
                    }
                    return Err(e);
                }
            };

            if human {
                ui::report(&report);
                ui::success(&format!(
                    "{} rows loaded into {}",
                    report.rows_inserted, report.table
                ));
            } else {
                emit_success(output_mode, "load", serde_json::to_value(&report)?)?;
            }
        }

        Commands::Stats { database, table } => {
            let location = database.unwrap_or_else(|| cfg.database_location());
            let table = table.unwrap_or_else(|| cfg.table_spec().name);

            // Read-only: inspecting a mistyped path must not create a store
            let mut store = StoreConnection::open_existing(&location)?;
            let stats: TableStats = store.table_stats(&table)?;
            store.close()?;

            if human {
                ui::info(Icons::STATS, "Store", &location);
                ui::stats(&stats);
            } else {
                emit_success(
                    output_mode,
                    "stats",
                    serde_json::json!({
                        "table": stats.table,
                        "exists": stats.exists,
                        "rows": stats.rows,
                    }),
                )?;
            }
        }

        Commands::Schema => {
            let spec = cfg.table_spec();
            spec.validate()?;
            let ddl = schema::create_table_sql(&spec);

            if output_mode.is_human() {
                println!("{};", ddl);
            } else {
                emit_success(
                    output_mode,
                    "schema",
                    serde_json::json!({ "table": spec.name, "sql": ddl }),
                )?;
            }
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let starter = FactloadConfig {
                database: Some(
                    config::default_database_path_in(std::path::Path::new("."))
                        .display()
                        .to_string(),
                ),
                source: None,
                load: Default::default(),
                table: Some(factload::TableSpec::observation_fact()),
            };
            config::write_config(&path, &starter, force)?;

            if human {
                ui::success(&format!("Wrote {}", path.display()));
            } else {
                emit_success(
                    output_mode,
                    "init",
                    serde_json::json!({ "path": path.display().to_string() }),
                )?;
            }
        }

        Commands::Version => commands::run_version(output_mode)?,
    }

    Ok(())
}

/// Accepts a single character, or the names `tab`, `comma`, `pipe`
fn parse_delimiter(raw: &str) -> anyhow::Result<char> {
    match raw {
        "tab" | "\\t" => return Ok('\t'),
        "comma" => return Ok(','),
        "pipe" => return Ok('|'),
        _ => {}
    }

    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => anyhow::bail!("delimiter must be a single character, got {:?}", raw),
    }
}
