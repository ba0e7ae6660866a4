//! insightdash CLI entry point

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use insightdash::{
    commands::{
        cmd_delete, cmd_ingest, cmd_init, cmd_list, cmd_serve, cmd_show, cmd_status,
        print_ingest_stats, print_init, print_insight, print_insights, print_status,
    },
    config::Config,
    error::{Error, Result},
    filter::FilterParams,
    progress::LogWriterFactory,
    store::InsightStore,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "insightdash")]
#[command(version, about = "Insight dashboard backend: JSON ingestion and a filterable REST API", long_about = None)]
struct Cli {
    /// Path to config file or config directory
    #[arg(short, long, global = true, env = "INSIGHTDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit log lines as JSON objects
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Load a JSON array of insight records into the database
    Ingest {
        /// Path to the JSON file (defaults to ingest.data_file)
        #[arg(env = "INSIGHTDASH_DATA_FILE")]
        file: Option<PathBuf>,
    },

    /// Serve the REST API
    Serve,

    /// List insights, optionally filtered
    List(ListArgs),

    /// Show one insight
    Show {
        /// Insight id
        id: i64,
    },

    /// Delete one insight
    Delete {
        /// Insight id
        id: i64,
    },

    /// Show configuration and database status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Case-insensitive substring filters, combined with AND
#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    end_year: Option<String>,

    #[arg(long)]
    start_year: Option<String>,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    topic: Option<String>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    sector: Option<String>,

    #[arg(long)]
    source: Option<String>,
}

impl From<ListArgs> for FilterParams {
    fn from(args: ListArgs) -> Self {
        FilterParams {
            end_year: args.end_year,
            start_year: args.start_year,
            country: args.country,
            topic: args.topic,
            region: args.region,
            sector: args.sector,
            source: args.source,
            city: None,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(LogWriterFactory))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(LogWriterFactory))
            .init();
    }

    match cli.command {
        Commands::Init { force } => {
            let base_dir = cli.config.as_deref().map(config_base_dir);
            let config = cmd_init(base_dir, force).await?;
            if cli.json {
                let paths = serde_json::json!({
                    "config_file": config.paths.config_file,
                    "db_file": config.paths.db_file,
                });
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                print_init(&config);
            }
            return Ok(());
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "insightdash", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let store = InsightStore::new(&config).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Ingest { file } => {
            let path = config.resolve_data_file(file)?;
            let stats = cmd_ingest(&config, &store, &path).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Serve => {
            cmd_serve(&config, store).await?;
        }

        Commands::List(args) => {
            let insights = cmd_list(&store, args.into()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                print_insights(&insights);
            }
        }

        Commands::Show { id } => {
            let insight = cmd_show(&store, id).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&insight)?);
            } else {
                print_insight(&insight);
            }
        }

        Commands::Delete { id } => {
            cmd_delete(&store, id).await?;

            if cli.json {
                println!(r#"{{"deleted": {id}}}"#);
            } else {
                println!("✓ Deleted insight #{id}");
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

/// `--config` may name a `.toml` file or the directory holding it
fn config_base_dir(path: &Path) -> PathBuf {
    if is_toml_file(path) {
        path.parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir)
    } else {
        path.to_path_buf()
    }
}

fn is_toml_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if is_toml_file(path) => {
            if !path.exists() {
                return Err(Error::NotInitialized);
            }
            Config::load(path)
        }
        Some(dir) => Config::load_from(Some(dir.to_path_buf())),
        None => Config::load_from(None),
    }
}
