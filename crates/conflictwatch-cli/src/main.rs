mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "conflictwatch-cli")]
#[command(about = "Offline tooling over conflictwatch seed files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse and validate a seed file without loading it anywhere
    Validate {
        /// Path to a YAML or JSON seed file
        seed: PathBuf,
    },
    /// Print summary statistics for a seed file
    Stats {
        seed: PathBuf,
        /// Only count events in this country
        #[arg(long)]
        country: Option<String>,
    },
    /// Print the top countries by event count
    Hotspots {
        seed: PathBuf,
        /// Maximum number of hotspots to print
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Print events matching a filter, newest first
    Query {
        seed: PathBuf,
        /// Comma-separated severities (low,medium,high,critical)
        #[arg(long)]
        severity: Option<String>,
        /// Comma-separated countries
        #[arg(long)]
        country: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let output = match cli.command {
        Some(Commands::Validate { seed }) => report::run_validate(&seed)?,
        Some(Commands::Stats { seed, country }) => {
            let store = report::load_store(&seed).await?;
            report::run_stats(&store, country.as_deref()).await?
        }
        Some(Commands::Hotspots { seed, limit }) => {
            let store = report::load_store(&seed).await?;
            report::run_hotspots(&store, limit).await?
        }
        Some(Commands::Query {
            seed,
            severity,
            country,
            limit,
        }) => {
            let store = report::load_store(&seed).await?;
            report::run_query(&store, severity.as_deref(), country.as_deref(), limit).await?
        }
        None => "no command given; see --help".to_string(),
    };
    println!("{output}");

    Ok(())
}
