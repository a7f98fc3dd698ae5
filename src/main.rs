use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mtta_updater::config::{ApiToken, AppConfig};
use mtta_updater::fetch::Fetcher;
use mtta_updater::models::Month;
use mtta_updater::storage::XlsxStore;
use mtta_updater::update::{RowProcessor, UpdateConfig, UpdateOrchestrator};

#[derive(Parser)]
#[command(name = "mtta-updater")]
#[command(about = "Update monthly MTTA values in an escalation policy workbook")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./mtta.toml")]
    config: PathBuf,

    /// Workbook to update (overrides config)
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Worksheet name (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Use simulated data instead of real API calls
    #[arg(long, alias = "mock")]
    simulate: bool,

    /// Month column to update (Jan, Feb, etc.)
    #[arg(long, default_value = "Jan")]
    month: String,

    /// Force update even if values exist
    #[arg(long)]
    force: bool,

    /// Year to get data for (default: current year)
    #[arg(long)]
    year: Option<i32>,

    /// Delay between API requests in seconds (overrides config, default 2.5)
    #[arg(long)]
    delay: Option<f64>,

    /// Start processing from this row number
    #[arg(long)]
    start_row: Option<u32>,

    /// Stop processing at this row number
    #[arg(long)]
    end_row: Option<u32>,

    /// Disable TLS certificate verification (use only for testing)
    #[arg(long, alias = "no-verify-ssl")]
    no_verify_tls: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {:?}", cli.config))?;
    if let Some(workbook) = cli.workbook {
        config.workbook = workbook;
    }
    if cli.sheet.is_some() {
        config.sheet = cli.sheet;
    }
    if let Some(delay) = cli.delay {
        config.api.request_delay_seconds = delay;
    }
    if cli.no_verify_tls {
        config.api.verify_tls = false;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting mtta-updater v{}", env!("CARGO_PKG_VERSION"));

    let month: Month = cli.month.parse()?;
    let year = cli.year.unwrap_or_else(|| chrono::Utc::now().year());

    let token = if cli.simulate {
        tracing::info!("Running in simulate mode - no actual API calls will be made");
        None
    } else {
        let token = ApiToken::from_env(&config.api.token_env)?;
        tracing::info!("Using API token (first 4 chars: {}...)", token.prefix());
        tracing::info!(
            "Using {} second delay between API requests",
            config.api.request_delay_seconds
        );
        Some(token)
    };

    if !config.api.verify_tls {
        tracing::warn!(
            "TLS certificate verification is disabled. This is insecure and should only be used for testing."
        );
    }

    let fetcher = Fetcher::from_config(&config.fetcher_config(cli.simulate), token.as_ref())?;
    let orchestrator = UpdateOrchestrator::new(
        UpdateConfig {
            month,
            year,
            force: cli.force,
            start_row: cli.start_row,
            end_row: cli.end_row,
        },
        RowProcessor::new(fetcher),
    );

    let mut store = XlsxStore::new(&config.workbook, config.sheet.clone());
    let summary = orchestrator.run(&mut store).await?;

    println!("\n=== Update Results ({} {}) ===", month, year);
    println!("Rows processed:   {}", summary.rows_in_range());
    println!("Updated:          {}", summary.updated);
    println!("Skipped (exists): {}", summary.skipped_existing);
    println!("Skipped (no ID):  {}", summary.skipped_no_id);
    println!("Failed:           {}", summary.failed);
    println!("Duration:         {:?}", summary.duration);
    if cli.simulate {
        println!("\n(simulated values - no API calls made)");
    }

    Ok(())
}
