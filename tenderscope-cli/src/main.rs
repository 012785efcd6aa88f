use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenderscope_dsl::{DslConfig, ErrorMode, SearchDsl};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tenderscope")]
#[command(about = "Tenderscope - search body compiler and aggregation answer tools")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "tenderscope.toml")]
    config: PathBuf,

    /// Fail on the first reported condition instead of logging it
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a search body from search options
    Body {
        /// Search options JSON file, `-` for stdin
        #[arg(short, long)]
        options: PathBuf,

        /// Restrict the query to one country
        #[arg(long)]
        country: Option<String>,
    },

    /// Compile a single filter clause
    Filter {
        /// Filter clause JSON file, `-` for stdin
        #[arg(short, long)]
        filter: PathBuf,
    },

    /// Print the combined request of named aggregations
    Aggregations {
        /// Named aggregation ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Parse an engine answer with named aggregation parsers
    Parse {
        /// Aggregations answer JSON file, `-` for stdin
        #[arg(short, long)]
        answer: PathBuf,

        /// Total tender count reported by the lot/bid counter
        #[arg(long, default_value = "0")]
        tenders: u64,

        /// JSON object mapping CPV codes to display names
        #[arg(long)]
        cpv_names: Option<PathBuf>,

        /// Named aggregation ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Splice synthetic wrapper layers out of an aggregations answer
    Compact {
        /// Aggregations answer JSON file, `-` for stdin
        #[arg(short, long)]
        answer: PathBuf,
    },

    /// Push a filter below every aggregation nested at a scope
    Inject {
        /// Search body JSON file (aggregation map with `--aggregations`), `-` for stdin
        #[arg(short, long)]
        tree: PathBuf,

        /// Nested scope path, e.g. lots.bids
        #[arg(short, long)]
        scope: String,

        /// Filter query JSON file
        #[arg(short, long)]
        filter: PathBuf,

        /// The tree is a bare aggregation map, not a search body
        #[arg(long)]
        aggregations: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DslConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if cli.strict {
        config.errors.mode = ErrorMode::Strict;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let dsl = SearchDsl::new(config);

    match cli.command {
        Commands::Body { options, country } => {
            commands::run_body(&dsl, &options, country.as_deref())?;
        }
        Commands::Filter { filter } => {
            commands::run_filter(&dsl, &filter)?;
        }
        Commands::Aggregations { ids } => {
            commands::run_aggregations(&dsl, &ids)?;
        }
        Commands::Parse {
            answer,
            tenders,
            cpv_names,
            ids,
        } => {
            commands::run_parse(&dsl, &answer, tenders, cpv_names.as_deref(), &ids)?;
        }
        Commands::Compact { answer } => {
            commands::run_compact(&dsl, &answer)?;
        }
        Commands::Inject {
            tree,
            scope,
            filter,
            aggregations,
        } => {
            commands::run_inject(&dsl, &tree, &scope, &filter, aggregations)?;
        }
    }

    Ok(())
}
