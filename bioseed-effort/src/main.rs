//! bioseed-effort - sampling effort aggregation over a specimen database
//!
//! Subcommands run one pipeline stage each against the configured
//! database: rebuild visits, rebuild effort snapshots, pick seeds, or
//! print one location's accumulation curves.

use anyhow::{Context, Result};
use bioseed_common::config::TomlConfig;
use bioseed_common::db::init_database;
use bioseed_effort::{
    EffortAccumulator, EffortStore, SeedSelector, SeedSpec, SqliteStore, VisitAggregator,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "bioseed-effort", version, about = "Sampling effort aggregation")]
struct Cli {
    /// Root folder holding the database
    #[arg(long, env = "BIOSEED_ROOT")]
    root: Option<PathBuf>,

    /// Explicit config file
    #[arg(long, env = "BIOSEED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild visits from raw specimens
    Visits,
    /// Rebuild effort snapshots from visits
    Efforts,
    /// Select diverse seed locations
    Seeds {
        /// Minimum species richness
        #[arg(long)]
        min: Option<i64>,
        /// Maximum species richness
        #[arg(long)]
        max: Option<i64>,
        /// Number of seeds to select
        #[arg(long)]
        clusters: Option<usize>,
    },
    /// Print the final accumulation curves for a location as JSON
    Curve { location_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before tracing starts so its log level can apply;
    // its source is logged once the subscriber is installed
    let (config, config_source) = TomlConfig::load_with_source(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting bioseed-effort v{}",
        env!("CARGO_PKG_VERSION")
    );
    config_source.log();

    let db_path = config.database_path(cli.root.as_deref());
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };
    let store = SqliteStore::new(pool);

    match cli.command {
        Command::Visits => {
            let stats = VisitAggregator::new(&store)
                .rebuild(&store, config.effort.specimen_page_size)
                .await?;
            println!(
                "{} specimens read, {} skipped, {} visits",
                stats.specimens_seen, stats.specimens_skipped, stats.visits_created
            );
        }
        Command::Efforts => {
            let stats = EffortAccumulator::new(&store, config.effort.page_size, &config.effort.kingdom)
                .tally_effort()
                .await?;
            println!(
                "{} visits across {} locations, {} snapshots",
                stats.visits_processed, stats.locations, stats.snapshots_written
            );
        }
        Command::Seeds { min, max, clusters } => {
            let spec = SeedSpec {
                min_species: min.unwrap_or(config.seeds.min_species),
                max_species: max.unwrap_or(config.seeds.max_species),
                max_clusters: clusters.unwrap_or(config.seeds.max_clusters),
            };
            let seeds = SeedSelector::new(&store, config.seeds.page_size)
                .select_seeds(&spec)
                .await?;
            for location_id in seeds {
                println!("{location_id}");
            }
        }
        Command::Curve { location_id } => {
            let effort = store
                .final_effort(location_id)
                .await?
                .with_context(|| format!("No effort recorded for location {location_id}"))?;
            println!("{}", serde_json::to_string_pretty(&effort)?);
        }
    }

    Ok(())
}
