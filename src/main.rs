//! Modwatch CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "modwatch")]
#[command(about = "Live dependency tracking and cache invalidation for loaded modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root path (overrides the config file; defaults to current directory)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Config file (defaults to modwatch.toml in the project root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Third-party dependency directory under the project root
    #[arg(long)]
    dependency_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch an entry module and reload it whenever it or a dependency changes
    Run {
        /// Entry module to load
        entry: PathBuf,

        /// Debounce window for file change bursts, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Load an entry module once and print its dependency graph
    Graph {
        /// Entry module to load
        entry: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
    },
    /// Show version
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Json,
    Dot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("modwatch={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Modwatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = commands::load_config(cli.root.as_deref(), cli.config.as_deref())?;
    if let Some(dependency_dir) = cli.dependency_dir {
        config.dependency_dir = dependency_dir;
    }

    match cli.command {
        Commands::Run { entry, debounce_ms } => {
            if let Some(debounce_ms) = debounce_ms {
                config.debounce_ms = debounce_ms;
            }
            commands::run(config, entry).await
        }
        Commands::Graph { entry, format } => commands::graph(config, entry, format),
        Commands::Version => {
            println!("Modwatch v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
