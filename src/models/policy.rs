//! Escalation policy rows and the cell values they carry.

use std::fmt;

/// Content of a single sheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Classify raw cell text: blank is empty, numeric text is a number.
    ///
    /// Text is only taken as a number when the number renders back to the
    /// same text, so identifiers such as "0012" stay text and `to_string`
    /// always returns what the cell held.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == raw => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// True for numbers and non-empty text. An empty string counts as no value.
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Number(_) => true,
            CellValue::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One escalation policy as listed in the sheet, with its current value for
/// the target month.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationPolicyRow {
    /// 1-based sheet row (row 1 is the header)
    pub row: u32,
    pub id: String,
    pub name: String,
    pub existing: CellValue,
}

impl EscalationPolicyRow {
    pub fn has_existing_value(&self) -> bool {
        self.existing.is_present()
    }
}
