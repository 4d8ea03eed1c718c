//! Order and inventory sync into Google Sheets.
//!
//! Fetches order and inventory records from two HTTP endpoints, coerces them
//! into typed records, and overwrites a worksheet per dataset in a shared
//! spreadsheet. The two datasets are processed one after the other and fail
//! independently.
//!
//! # Quick start
//!
//! ```no_run
//! use orders_sheets_sync::{Config, Dataset, SheetsSync};
//!
//! let config = Config::from_env().unwrap();
//! let mut sync = SheetsSync::builder(config).build().unwrap();
//! let report = sync.run(&Dataset::ALL);
//! std::process::exit(if report.is_success() { 0 } else { 1 });
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod sheets;

pub use config::{Config, WorksheetTarget};
pub use error::{Result, SyncError};
pub use fetcher::{HttpFetcher, RawRecord, RecordSource};
pub use models::{InventoryRecord, OrderRecord};
pub use normalize::{normalize, ConversionError, ConversionMode, Normalized, Record};
pub use pipeline::{Dataset, DatasetOutcome, DatasetStatus, Pipeline, RunReport, Stage};
pub use retry::RetryPolicy;
pub use sheets::{Anchor, Cell, SheetBackend, SheetWriter, Table};

use std::fmt;

use sheets::google::GoogleSheets;
use sheets::memory::MemorySheets;

// ---------------------------------------------------------------------------
// SheetsSyncBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`SheetsSync`] run.
///
/// Use [`SheetsSync::builder()`] to obtain one.
pub struct SheetsSyncBuilder {
    config: Config,
    dry_run: bool,
}

impl SheetsSyncBuilder {
    /// Write into an in-memory spreadsheet instead of Google Sheets.
    ///
    /// Fetching and normalization still run for real. Defaults to `false`.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Force strict conversion regardless of `STRICT_CONVERSION`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict_conversion |= strict;
        self
    }

    /// Build the HTTP fetcher and sheet backend.
    ///
    /// Credentials are not read here; the Google backend loads them on the
    /// first write.
    pub fn build(self) -> Result<SheetsSync> {
        let policy = RetryPolicy::new(self.config.max_retries, self.config.retry_delay);
        let fetcher = HttpFetcher::new(self.config.http_timeout, policy)?;

        let sheets: Box<dyn SheetBackend> = if self.dry_run {
            Box::new(MemorySheets::new().with_spreadsheet(
                &self.config.sheet_name,
                &[
                    self.config.orders.worksheet.as_str(),
                    self.config.inventory.worksheet.as_str(),
                ],
            ))
        } else {
            Box::new(GoogleSheets::new(
                self.config.credentials_file.clone(),
                self.config.http_timeout,
            )?)
        };

        Ok(SheetsSync {
            config: self.config,
            fetcher,
            sheets,
            dry_run: self.dry_run,
        })
    }
}

// ---------------------------------------------------------------------------
// SheetsSync
// ---------------------------------------------------------------------------

/// A configured fetcher and sheet backend, ready to run.
pub struct SheetsSync {
    config: Config,
    fetcher: HttpFetcher,
    sheets: Box<dyn SheetBackend>,
    dry_run: bool,
}

impl SheetsSync {
    pub fn builder(config: Config) -> SheetsSyncBuilder {
        SheetsSyncBuilder {
            config,
            dry_run: false,
        }
    }

    /// Process each dataset once. Failures are reported, not returned.
    pub fn run(&mut self, datasets: &[Dataset]) -> RunReport {
        Pipeline::new(&self.config, &self.fetcher, &mut *self.sheets).run(datasets)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for SheetsSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SheetsSync(sheet={}, orders={}, inventory={}, dry_run={})",
            self.config.sheet_name,
            self.config.orders.worksheet,
            self.config.inventory.worksheet,
            self.dry_run
        )
    }
}
