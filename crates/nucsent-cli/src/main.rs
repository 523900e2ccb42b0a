mod output;
mod scheduler;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use nucsent_core::{AppConfig, BucketWidth, SourceId};
use nucsent_sentiment::{Pipeline, PipelineOptions, Services};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nucsent")]
#[command(about = "Sentiment of public discourse about nuclear energy")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending database migrations
    Migrate,
    /// Fetch new content, then extract and label everything pending
    Ingest {
        /// Restrict the run to one source (default: every enabled source)
        #[arg(long)]
        source: Option<SourceId>,

        /// Fetch even if the store is fresh
        #[arg(long)]
        force: bool,
    },
    /// Label units still waiting for a label
    Label {
        #[arg(long)]
        source: Option<SourceId>,
    },
    /// Show the newest items and their labeled units
    Recent {
        #[arg(long)]
        source: SourceId,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Bring the source up to date first
        #[arg(long)]
        refresh: bool,
    },
    /// Show label totals and engagement averages
    Metrics {
        #[arg(long)]
        source: SourceId,

        #[arg(long)]
        refresh: bool,
    },
    /// Show label counts per period over the trailing window
    Trend {
        #[arg(long)]
        source: SourceId,

        /// Bucket width such as `1m`, `2m` or `2w` (default: from sources.yaml)
        #[arg(long)]
        bucket: Option<BucketWidth>,

        #[arg(long)]
        refresh: bool,
    },
    /// Show label counts for one calendar month
    Month {
        #[arg(long)]
        source: SourceId,

        /// Months back from the current one (0-12)
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show the most frequent terms per label
    Terms {
        #[arg(long)]
        source: SourceId,

        /// Trailing window in months (default: from sources.yaml)
        #[arg(long)]
        months: Option<u32>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete items and units that are configured placeholder text
    Purge {
        #[arg(long)]
        source: SourceId,
    },
    /// Run ingestion for every enabled source on the configured cron schedule
    Schedule {
        /// Run once immediately before waiting for the first tick
        #[arg(long)]
        run_now: bool,
    },
}

impl Commands {
    /// Whether the command talks to providers or classifiers and therefore
    /// needs credentials.
    fn needs_services(&self) -> bool {
        match self {
            Commands::Ingest { .. } | Commands::Label { .. } | Commands::Schedule { .. } => true,
            Commands::Recent { refresh, .. }
            | Commands::Metrics { refresh, .. }
            | Commands::Trend { refresh, .. } => *refresh,
            Commands::Ping
            | Commands::Migrate
            | Commands::Month { .. }
            | Commands::Terms { .. }
            | Commands::Purge { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = nucsent_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = nucsent_db::PoolConfig::from_app_config(&config);
    let pool = nucsent_db::connect_pool(&config.database_url, pool_config).await?;
    if matches!(cli.command, Commands::Ping) {
        nucsent_db::health_check(&pool).await?;
        println!("database ok");
        return Ok(());
    }
    let applied = nucsent_db::run_migrations(&pool).await?;
    if matches!(cli.command, Commands::Migrate) {
        println!("migrations applied: {applied}");
        return Ok(());
    }

    let pipeline = Arc::new(build_pipeline(&config, pool, cli.command.needs_services())?);
    run(&cli, &config, pipeline).await
}

fn build_pipeline(
    config: &AppConfig,
    pool: sqlx::SqlitePool,
    with_services: bool,
) -> anyhow::Result<Pipeline> {
    let sources = nucsent_core::load_sources(&config.sources_path)?;
    if with_services {
        return Ok(Pipeline::from_config(config, pool, sources)?);
    }
    Ok(Pipeline::new(
        pool,
        sources,
        Services::read_only(&config.keyword)?,
        PipelineOptions::from_app_config(config),
    ))
}

async fn run(cli: &Cli, config: &AppConfig, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let json = cli.json;
    match &cli.command {
        Commands::Ping | Commands::Migrate => {}
        Commands::Ingest { source, force } => {
            let targets = selected_sources(&pipeline, *source);
            let mut failures = 0usize;
            for id in &targets {
                match pipeline.ensure_up_to_date(*id, *force).await {
                    Ok(report) => output::print_run_report(&report, json)?,
                    Err(e) => {
                        failures += 1;
                        tracing::error!(source = %id, error = %e, "ingest failed");
                    }
                }
            }
            if failures > 0 && failures == targets.len() {
                anyhow::bail!("ingest failed for all {failures} sources");
            }
        }
        Commands::Label { source } => {
            for id in selected_sources(&pipeline, *source) {
                let stats = pipeline.label(id).await?;
                output::print_label_stats(id, &stats, json)?;
            }
        }
        Commands::Recent {
            source,
            limit,
            refresh,
        } => {
            refresh_if(&pipeline, *source, *refresh).await;
            let items = pipeline.get_recent(*source, *limit).await?;
            output::print_recent(*source, &items, json)?;
        }
        Commands::Metrics { source, refresh } => {
            refresh_if(&pipeline, *source, *refresh).await;
            let metrics = pipeline.get_metrics(*source).await?;
            output::print_metrics(&metrics, json)?;
        }
        Commands::Trend {
            source,
            bucket,
            refresh,
        } => {
            refresh_if(&pipeline, *source, *refresh).await;
            let series = pipeline.get_period_stats(*source, *bucket).await?;
            output::print_series(*source, &series, json)?;
        }
        Commands::Month { source, offset } => {
            let counts = pipeline.get_month_stats(*source, *offset).await?;
            output::print_month(*source, *offset, &counts, json)?;
        }
        Commands::Terms {
            source,
            months,
            limit,
        } => {
            let terms = pipeline.get_top_terms(*source, *months, *limit).await?;
            output::print_terms(*source, &terms, json)?;
        }
        Commands::Purge { source } => {
            let stats = pipeline.purge_placeholders(*source).await?;
            output::print_purge(*source, &stats, json)?;
        }
        Commands::Schedule { run_now } => {
            if *run_now {
                scheduler::run_pass(&pipeline).await;
            }
            let mut scheduler =
                scheduler::build_scheduler(Arc::clone(&pipeline), &config.schedule).await?;
            tracing::info!(schedule = %config.schedule, "scheduler started");
            scheduler::shutdown_signal().await;
            scheduler.shutdown().await?;
        }
    }
    Ok(())
}

/// `source` when given, otherwise every enabled source.
fn selected_sources(pipeline: &Pipeline, source: Option<SourceId>) -> Vec<SourceId> {
    match source {
        Some(id) => vec![id],
        None => pipeline.sources().enabled().map(|s| s.id).collect(),
    }
}

/// Bring `source` up to date before a read. Failures are logged; the read
/// still answers from what is stored.
async fn refresh_if(pipeline: &Pipeline, source: SourceId, refresh: bool) {
    if !refresh {
        return;
    }
    if let Err(e) = pipeline.ensure_up_to_date(source, false).await {
        tracing::warn!(source = %source, error = %e, "refresh failed; serving stored data");
    }
}
