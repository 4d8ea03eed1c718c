use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use orders_sheets_sync::config::log_dir_from_lookup;
use orders_sheets_sync::{logging, Config, Dataset, DatasetStatus, SheetsSync, SyncError};

#[derive(Parser)]
#[command(
    name = "sheets-sync",
    version,
    about = "Fetch order and inventory data and upload it to Google Sheets"
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for the per-run log file (default: $LOG_DIR or ./logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Process a single dataset instead of both
    #[arg(long, value_enum)]
    only: Option<DatasetArg>,

    /// Fetch and normalize, but write to an in-memory sheet
    #[arg(long)]
    dry_run: bool,

    /// Fail a dataset on the first value that does not convert
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DatasetArg {
    Orders,
    Inventory,
}

impl From<DatasetArg> for Dataset {
    fn from(arg: DatasetArg) -> Self {
        match arg {
            DatasetArg::Orders => Dataset::Orders,
            DatasetArg::Inventory => Dataset::Inventory,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| log_dir_from_lookup(|key| std::env::var(key).ok()));
    let log_path = match logging::init(&cli.log_level, &log_dir) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Failed to set up logging in {}: {}", log_dir.display(), e);
            return ExitCode::from(2);
        }
    };

    let code = match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{:#}", e);
            match e.downcast_ref::<SyncError>() {
                Some(SyncError::Config(_)) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    };
    tracing::info!("Check detailed logs at: {}", log_path.display());
    code
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("Starting order and inventory sync");

    let config = Config::from_env()?;
    let mut sync = SheetsSync::builder(config)
        .dry_run(cli.dry_run)
        .strict(cli.strict)
        .build()
        .context("failed to initialize HTTP clients")?;
    tracing::info!("{}", sync);

    let datasets: Vec<Dataset> = match cli.only {
        Some(only) => vec![only.into()],
        None => Dataset::ALL.to_vec(),
    };
    let report = sync.run(&datasets);

    tracing::info!("{}", "=".repeat(60));
    for outcome in &report.outcomes {
        match &outcome.status {
            DatasetStatus::Succeeded {
                rows,
                conversion_issues,
                range,
            } => tracing::info!(
                "{}: OK ({} rows at {}, {} conversion issue(s))",
                outcome.dataset,
                rows,
                range,
                conversion_issues
            ),
            DatasetStatus::Failed { stage, error, .. } => {
                tracing::error!("{}: FAILED during {}: {}", outcome.dataset, stage, error)
            }
        }
    }

    if report.is_success() {
        tracing::info!("Sync completed successfully");
    } else {
        tracing::error!("Sync completed with {} failed dataset(s)", report.failed().count());
    }
    Ok(report.is_success())
}
