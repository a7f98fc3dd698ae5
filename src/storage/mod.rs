//! Spreadsheet persistence.
//!
//! Business logic works on an in-memory [`Sheet`]; a [`SheetStore`] loads it
//! once and commits pending cell updates back once:
//! - `XlsxStore`: an `.xlsx` workbook on disk, updated in place
//! - `MemoryStore`: an owned sheet, used in tests

mod memory;
mod sheet;
mod xlsx;

use std::path::PathBuf;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sheet::{CellUpdate, Sheet, NUMBER_FORMAT_2DP};
pub use xlsx::XlsxStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Workbook not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Sheet has not been loaded")]
    NotLoaded,
}

/// Source and sink for the tabular document.
pub trait SheetStore {
    /// Read the whole sheet into memory.
    fn load(&mut self) -> Result<Sheet, StorageError>;

    /// Persist the sheet's pending updates. Returns how many cells were written.
    fn commit(&mut self, sheet: &Sheet) -> Result<usize, StorageError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}
