//! Flatstore CLI
//!
//! Command-line interface for the flat-file record store:
//! - Import delimited data
//! - Query with filters, ordering, grouping, and aggregates
//! - Generate a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use flatstore::config::{generate_default_config, Config};
use flatstore::query::Query;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flatstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flat-file record store for importing and querying delimited data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory, overriding the config file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import the delimited data in FILE into the store
    Import {
        /// File containing delimited data, header row first
        file: PathBuf,
        /// Delete the existing store before importing
        #[arg(long)]
        delete: bool,
    },

    /// Query the store
    Query {
        /// Fields to display, with optional aggregates (min, max, count, collect, sum).
        /// e.g. -s DATE,TITLE:collect. Default: all fields.
        #[arg(short = 's', long = "select", value_delimiter = ',')]
        select: Vec<String>,
        /// Field=value pairs to filter by. e.g. -f STB=stb1,REV=4.00
        #[arg(short = 'f', long = "filter", value_delimiter = ',', value_parser = parse_filter)]
        filters: Vec<(String, String)>,
        /// Fields to order by, primary first. e.g. -o DATE,TITLE
        #[arg(short = 'o', long = "order", value_delimiter = ',')]
        order: Vec<String>,
        /// Group by this field. e.g. -g TITLE
        #[arg(short = 'g', long = "group-by")]
        group_by: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .ok_or_else(|| format!("invalid filter {:?}, expected FIELD=VALUE", s))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }

    init_logging(&config);

    match cli.command {
        Commands::Import { file, delete } => {
            let store = config.open_store()?;
            let count = store
                .import_path(&file, delete)
                .with_context(|| format!("failed to import {:?}", file))?;
            println!("Imported [{}] rows from [{}]", count, file.display());
        }

        Commands::Query {
            select,
            filters,
            order,
            group_by,
        } => {
            let select: Vec<&str> = select.iter().map(String::as_str).collect();
            let order: Vec<&str> = order.iter().map(String::as_str).collect();

            let mut builder = Query::select(&select)
                .filters(filters.into_iter().collect())
                .order_by(&order);
            if let Some(group_by) = group_by {
                builder = builder.group_by(group_by);
            }
            let query = builder.build()?;

            let executor = config.executor()?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            executor.query(&query, &mut out).context("query failed")?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    std::io::stdout().write_all(content.as_bytes())?;
                }
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber. Logs go to stderr so reports on stdout stay clean.
fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("flatstore={}", config.logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
