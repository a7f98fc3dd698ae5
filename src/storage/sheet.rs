//! In-memory table: a header row plus data rows addressed by 1-based
//! (row, column) coordinates, as in a spreadsheet.

use crate::models::CellValue;

/// Display format applied to written metric values.
pub const NUMBER_FORMAT_2DP: &str = "0.00";

/// A numeric cell write waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub row: u32,
    pub column: u32,
    pub value: f64,
    pub number_format: &'static str,
}

/// Header plus rows, with pending updates tracked for commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    headers: Vec<String>,
    /// `rows[0]` is sheet row 2
    rows: Vec<Vec<CellValue>>,
    updates: Vec<CellUpdate>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            headers,
            rows,
            updates: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 1-based column of the header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<u32> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .map(|i| i as u32 + 1)
    }

    /// Last populated row number; 1 when the sheet has only a header.
    pub fn last_row(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    /// Cell at 1-based `(row, column)`. Row 1 is the header.
    pub fn cell(&self, row: u32, column: u32) -> CellValue {
        if row == 0 || column == 0 {
            return CellValue::Empty;
        }
        if row == 1 {
            return self
                .headers
                .get(column as usize - 1)
                .map(|h| CellValue::from_raw(h))
                .unwrap_or_default();
        }
        self.rows
            .get(row as usize - 2)
            .and_then(|r| r.get(column as usize - 1))
            .cloned()
            .unwrap_or_default()
    }

    /// Write a number with two-decimal display and record it for commit.
    pub fn set_number(&mut self, row: u32, column: u32, value: f64) {
        if row < 2 || column == 0 {
            return;
        }
        let r = row as usize - 2;
        let c = column as usize - 1;
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = CellValue::Number(value);

        self.updates.retain(|u| !(u.row == row && u.column == column));
        self.updates.push(CellUpdate {
            row,
            column,
            value,
            number_format: NUMBER_FORMAT_2DP,
        });
    }

    /// Writes made since load, in order.
    pub fn pending_updates(&self) -> &[CellUpdate] {
        &self.updates
    }

    pub fn is_dirty(&self) -> bool {
        !self.updates.is_empty()
    }
}
