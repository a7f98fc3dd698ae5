//! `.xlsx` workbook store.
//!
//! The workbook is loaded once and kept in memory; commit applies only the
//! pending cell updates to it and saves over the source file, so other
//! sheets, styles and formulas survive.

use std::path::PathBuf;

use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use super::{Sheet, SheetStore, StorageError};
use crate::models::CellValue;

/// Workbook on disk, updated in place.
pub struct XlsxStore {
    path: PathBuf,
    sheet_name: Option<String>,
    book: Option<Spreadsheet>,
    sheet_index: usize,
}

impl XlsxStore {
    /// Store for `path`, using the named worksheet or the first one.
    pub fn new(path: impl Into<PathBuf>, sheet_name: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name,
            book: None,
            sheet_index: 0,
        }
    }

    fn resolve_index(&self, book: &Spreadsheet) -> Result<usize, StorageError> {
        let sheets = book.get_sheet_collection();
        match &self.sheet_name {
            Some(name) => sheets
                .iter()
                .position(|ws| ws.get_name() == name.as_str())
                .ok_or_else(|| StorageError::SheetNotFound(name.clone())),
            None if sheets.is_empty() => {
                Err(StorageError::SheetNotFound("<first sheet>".to_string()))
            }
            None => Ok(0),
        }
    }
}

/// Copy a worksheet's used range into a [`Sheet`].
fn read_worksheet(ws: &Worksheet) -> Sheet {
    let max_col = ws.get_highest_column();
    let max_row = ws.get_highest_row();

    let headers = (1..=max_col).map(|c| ws.get_value((c, 1))).collect();
    let rows = (2..=max_row)
        .map(|r| {
            (1..=max_col)
                .map(|c| CellValue::from_raw(&ws.get_value((c, r))))
                .collect()
        })
        .collect();

    Sheet::new(headers, rows)
}

impl SheetStore for XlsxStore {
    fn load(&mut self) -> Result<Sheet, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        info!("Loading workbook from {:?}", self.path);
        let book = umya_spreadsheet::reader::xlsx::read(&self.path)
            .map_err(|e| StorageError::Workbook(e.to_string()))?;

        let index = self.resolve_index(&book)?;
        let ws = book
            .get_sheet(&index)
            .ok_or_else(|| StorageError::SheetNotFound(index.to_string()))?;
        let sheet = read_worksheet(ws);
        debug!(
            "Read worksheet '{}' with {} columns and {} rows",
            ws.get_name(),
            sheet.headers().len(),
            sheet.last_row()
        );

        self.sheet_index = index;
        self.book = Some(book);
        Ok(sheet)
    }

    fn commit(&mut self, sheet: &Sheet) -> Result<usize, StorageError> {
        let index = self.sheet_index;
        let book = self.book.as_mut().ok_or(StorageError::NotLoaded)?;
        let ws = book
            .get_sheet_mut(&index)
            .ok_or_else(|| StorageError::SheetNotFound(index.to_string()))?;

        let updates = sheet.pending_updates();
        for update in updates {
            let coordinate = (update.column, update.row);
            ws.get_cell_mut(coordinate).set_value_number(update.value);
            ws.get_style_mut(coordinate)
                .get_number_format_mut()
                .set_format_code(update.number_format);
        }

        umya_spreadsheet::writer::xlsx::write(book, &self.path)
            .map_err(|e| StorageError::Workbook(e.to_string()))?;
        info!("Saved {} cell updates to {:?}", updates.len(), self.path);

        Ok(updates.len())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
