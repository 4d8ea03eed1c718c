//! Per-dataset fetch → normalize → write sequencing.
//!
//! Orders and inventory are separate failure domains: an error in any stage
//! of one dataset is logged and recorded in the [`RunReport`], and the other
//! dataset still runs.

use std::fmt;

use crate::config::{Config, WorksheetTarget};
use crate::error::SyncError;
use crate::fetcher::RecordSource;
use crate::models::{InventoryRecord, OrderRecord};
use crate::normalize::{normalize, ConversionMode, Record};
use crate::sheets::{SheetBackend, SheetWriter, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Orders,
    Inventory,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Orders, Dataset::Inventory];
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Orders => f.write_str(OrderRecord::DATASET),
            Dataset::Inventory => f.write_str(InventoryRecord::DATASET),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    Succeeded {
        rows: usize,
        conversion_issues: usize,
        range: String,
    },
    Failed {
        stage: Stage,
        kind: &'static str,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutcome {
    pub dataset: Dataset,
    pub status: DatasetStatus,
}

impl DatasetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DatasetStatus::Succeeded { .. })
    }
}

/// Outcome of every dataset attempted in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<DatasetOutcome>,
}

impl RunReport {
    /// True when every attempted dataset succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(DatasetOutcome::is_success)
    }

    pub fn outcome(&self, dataset: Dataset) -> Option<&DatasetOutcome> {
        self.outcomes.iter().find(|o| o.dataset == dataset)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    source: &'a dyn RecordSource,
    sheets: &'a mut dyn SheetBackend,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        source: &'a dyn RecordSource,
        sheets: &'a mut dyn SheetBackend,
    ) -> Self {
        Self {
            config,
            source,
            sheets,
        }
    }

    /// Process `datasets` in order; never stops early.
    pub fn run(&mut self, datasets: &[Dataset]) -> RunReport {
        let mut report = RunReport::default();
        for &dataset in datasets {
            tracing::info!("{}", "=".repeat(60));
            tracing::info!("Processing {}", dataset);
            let status = match self.run_dataset(dataset) {
                Ok(status) => status,
                Err((stage, err)) => {
                    tracing::error!("{}: {} stage failed: {}", dataset, stage, err);
                    DatasetStatus::Failed {
                        stage,
                        kind: err.kind(),
                        error: err.to_string(),
                    }
                }
            };
            if let DatasetStatus::Succeeded { rows, range, .. } = &status {
                tracing::info!("{}: wrote {} rows to {}", dataset, rows, range);
            }
            report.outcomes.push(DatasetOutcome { dataset, status });
        }
        report
    }

    fn run_dataset(&mut self, dataset: Dataset) -> Result<DatasetStatus, (Stage, SyncError)> {
        let config = self.config;
        match dataset {
            Dataset::Orders => {
                self.process::<OrderRecord>(config.orders_url.as_str(), &config.orders)
            }
            Dataset::Inventory => {
                self.process::<InventoryRecord>(config.inventory_url.as_str(), &config.inventory)
            }
        }
    }

    fn process<R: Record>(
        &mut self,
        endpoint: &str,
        target: &WorksheetTarget,
    ) -> Result<DatasetStatus, (Stage, SyncError)> {
        let raw = self
            .source
            .fetch_records(endpoint)
            .map_err(|e| (Stage::Fetch, e))?;

        let mode = if self.config.strict_conversion {
            ConversionMode::Strict
        } else {
            ConversionMode::Lenient
        };
        let normalized =
            normalize::<R>(&raw, mode).map_err(|e| (Stage::Normalize, SyncError::from(e)))?;

        let table = Table::from_records(&normalized.records);
        let summary = SheetWriter::new(
            &mut *self.sheets,
            &self.config.sheet_name,
            self.config.create_missing_worksheet,
        )
        .write_table(&table, target)
        .map_err(|e| (Stage::Write, e))?;

        Ok(DatasetStatus::Succeeded {
            rows: summary.rows,
            conversion_issues: normalized.issues.len(),
            range: summary.range,
        })
    }
}
