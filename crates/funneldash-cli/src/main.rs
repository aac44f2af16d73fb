mod imports;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use funneldash_core::{AppConfig, FunnelFilters};
use funneldash_db::PgFunnelStore;
use funneldash_ingest::{FieldExtractor, RoiPolicy};
use funneldash_redtrack::RedTrackImporter;

#[derive(Debug, Parser)]
#[command(name = "funneldash-cli")]
#[command(about = "Funnel dashboard command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import funnel records
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Check that the RedTrack API accepts the configured key
    Probe,
    /// List dates that already have stored records, newest first
    Dates,
    /// Print totals and per-day totals for the filtered records
    Report(ReportArgs),
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum ImportCommands {
    /// Import a CSV export file
    Csv {
        /// Path to the CSV file
        path: PathBuf,
        /// Overwrite stored records for dates present in the file
        #[arg(long)]
        replace: bool,
        /// How ROI is derived: `computed` (profit / cost) or `reported`
        #[arg(long, default_value = "computed")]
        roi: RoiPolicy,
    },
    /// Import a date range from the RedTrack API
    Redtrack {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the range, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Delete stored records in the range before inserting
        #[arg(long)]
        replace: bool,
        /// Fetch and normalize without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long)]
    manager: Option<String>,
    #[arg(long)]
    channel: Option<String>,
    #[arg(long)]
    niche: Option<String>,
    #[arg(long)]
    advertiser: Option<String>,
    #[arg(long)]
    variant: Option<String>,
    #[arg(long)]
    product: Option<String>,
    /// Earliest date to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Latest date to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl ReportArgs {
    fn filters(&self) -> FunnelFilters {
        FunnelFilters {
            manager: self.manager.clone(),
            channel: self.channel.clone(),
            niche: self.niche.clone(),
            advertiser: self.advertiser.clone(),
            variant: self.variant.clone(),
            product: self.product.clone(),
            start_date: self.start,
            end_date: self.end,
        }
        .normalized()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = funneldash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    funneldash_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = funneldash_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        Commands::Import { command } => {
            let extractor = load_extractor(&config)?;
            let store = PgFunnelStore::new(connect(&config).await?);
            match command {
                ImportCommands::Csv { path, replace, roi } => {
                    let content = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    imports::run_import_csv(
                        &store,
                        &extractor,
                        &content,
                        replace,
                        roi,
                        config.insert_options(),
                    )
                    .await?;
                }
                ImportCommands::Redtrack {
                    start,
                    end,
                    replace,
                    dry_run,
                } => {
                    let importer = RedTrackImporter::from_app_config(&config, extractor)?;
                    imports::run_import_redtrack(
                        &store,
                        importer.as_ref(),
                        start,
                        end,
                        replace,
                        dry_run,
                        config.insert_options(),
                    )
                    .await?;
                }
            }
        }
        Commands::Probe => {
            let extractor = load_extractor(&config)?;
            let importer = RedTrackImporter::from_app_config(&config, extractor)?
                .ok_or_else(|| anyhow::anyhow!("REDTRACK_API_KEY is not set; cannot probe"))?;
            if !importer.probe().await {
                anyhow::bail!("RedTrack rejected the probe request");
            }
            println!("RedTrack connection ok");
        }
        Commands::Dates => {
            let store = PgFunnelStore::new(connect(&config).await?);
            report::run_dates(&store).await?;
        }
        Commands::Report(args) => {
            let store = PgFunnelStore::new(connect(&config).await?);
            report::run_report(&store, &args.filters(), args.json).await?;
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = funneldash_db::PoolConfig::from_app_config(config);
    funneldash_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to database")
}

fn load_extractor(config: &AppConfig) -> anyhow::Result<Arc<FieldExtractor>> {
    let taxonomy = funneldash_core::load_taxonomy(&config.taxonomy_path)?;
    Ok(Arc::new(FieldExtractor::new(taxonomy)?))
}
