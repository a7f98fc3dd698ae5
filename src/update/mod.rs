//! Update orchestrator.
//!
//! Drives one monthly run:
//! 1. Load the sheet and locate the `id` and month columns
//! 2. Walk the requested row range, skipping rows without an ID or with a
//!    value already present (unless forced)
//! 3. Fetch each remaining row's metric and write it into the sheet
//! 4. Commit the sheet once at the end

mod row;

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{EscalationPolicyRow, MetricQuery, ModelError, Month, MonthWindow};
use crate::storage::{Sheet, SheetStore, StorageError};

pub use row::RowProcessor;

/// Header of the escalation policy identifier column.
pub const ID_COLUMN: &str = "id";

/// Column holding the policy name.
pub const NAME_COLUMN_INDEX: u32 = 1;

/// First data row; row 1 is the header.
pub const FIRST_DATA_ROW: u32 = 2;

/// Errors that abort a run before any row is processed.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Column '{column}' not found. Available columns: {available:?}")]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Parameters for one run.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Month column to fill
    pub month: Month,

    /// Year the month belongs to
    pub year: i32,

    /// Overwrite values that are already present
    pub force: bool,

    /// First row to process (1-based, inclusive)
    pub start_row: Option<u32>,

    /// Last row to process (1-based, inclusive)
    pub end_row: Option<u32>,
}

/// Result of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub first_row: u32,
    pub last_row: u32,
    pub updated: u32,
    pub skipped_no_id: u32,
    pub skipped_existing: u32,
    pub failed: u32,
    pub cells_written: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Rows in the processed range.
    pub fn rows_in_range(&self) -> u32 {
        (self.last_row + 1).saturating_sub(self.first_row)
    }
}

/// Inclusive row range after clamping caller bounds to `[2, last_row]`.
///
/// A bound of 0 is treated as unset.
pub fn resolve_row_range(last_row: u32, start_row: Option<u32>, end_row: Option<u32>) -> (u32, u32) {
    let first = start_row
        .filter(|&s| s > 0)
        .map_or(FIRST_DATA_ROW, |s| s.max(FIRST_DATA_ROW));
    let last = end_row
        .filter(|&e| e > 0)
        .map_or(last_row, |e| e.min(last_row));
    (first, last)
}

/// Fills one month column of the sheet with fetched metrics.
pub struct UpdateOrchestrator {
    config: UpdateConfig,
    processor: RowProcessor,
}

impl UpdateOrchestrator {
    pub fn new(config: UpdateConfig, processor: RowProcessor) -> Self {
        Self { config, processor }
    }

    /// Run the update against `store`.
    ///
    /// Fails before touching any row if the sheet cannot be loaded or a
    /// required column is missing. Row-level fetch failures never fail the run.
    pub async fn run(&self, store: &mut dyn SheetStore) -> Result<RunSummary, UpdateError> {
        let started = Instant::now();
        let month = self.config.month;

        info!("Loading sheet from {}", store.describe());
        let mut sheet = store.load()?;

        let id_col = require_column(&sheet, ID_COLUMN)?;
        let month_col = require_column(&sheet, month.abbreviation())?;
        let window = MonthWindow::resolve(month, self.config.year)?;

        let (first_row, last_row) =
            resolve_row_range(sheet.last_row(), self.config.start_row, self.config.end_row);
        let mut summary = RunSummary {
            first_row,
            last_row,
            ..Default::default()
        };

        info!(
            "Processing rows {} to {} (total: {} rows) for {} {} [{} .. {}]",
            first_row,
            last_row,
            summary.rows_in_range(),
            month,
            self.config.year,
            window.start_param(),
            window.end_param()
        );

        for row_number in first_row..=last_row {
            let id = sheet.cell(row_number, id_col).to_string();
            if id.trim().is_empty() {
                debug!("Skipping row {}: No ID value", row_number);
                summary.skipped_no_id += 1;
                continue;
            }

            let row = EscalationPolicyRow {
                row: row_number,
                id: id.trim().to_string(),
                name: sheet.cell(row_number, NAME_COLUMN_INDEX).to_string(),
                existing: sheet.cell(row_number, month_col),
            };

            if row.has_existing_value() && !self.config.force {
                info!(
                    "Skipping row {}: {} (ID: {}) - {} value already exists: {}",
                    row.row, row.name, row.id, month, row.existing
                );
                summary.skipped_existing += 1;
                continue;
            }

            info!("Processing: {} (ID: {})", row.name, row.id);
            let query = MetricQuery::for_policy(&row.id, &window);

            match self.processor.process(&row, &query).await {
                Some(minutes) => {
                    sheet.set_number(row.row, month_col, minutes.value());
                    info!("  Updated {} column: {} minutes", month, minutes);
                    summary.updated += 1;
                }
                None => {
                    warn!("  Failed to update {} column for {}", month, row.name);
                    if row.has_existing_value() {
                        info!("  Keeping existing value: {}", row.existing);
                    }
                    summary.failed += 1;
                }
            }
        }

        summary.cells_written = store.commit(&sheet)?;
        summary.duration = started.elapsed();
        info!("Sheet updated successfully: {}", store.describe());

        Ok(summary)
    }
}

fn require_column(sheet: &Sheet, name: &str) -> Result<u32, UpdateError> {
    sheet
        .column_index(name)
        .ok_or_else(|| UpdateError::ColumnNotFound {
            column: name.to_string(),
            available: sheet.headers().to_vec(),
        })
}
