//! Sheet store backed by memory.

use super::{Sheet, SheetStore, StorageError};

/// Holds a sheet in memory and counts commits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheet: Sheet,
    commits: usize,
}

impl MemoryStore {
    pub fn new(sheet: Sheet) -> Self {
        Self { sheet, commits: 0 }
    }

    /// The sheet as of the last commit.
    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl SheetStore for MemoryStore {
    fn load(&mut self) -> Result<Sheet, StorageError> {
        Ok(self.sheet.clone())
    }

    fn commit(&mut self, sheet: &Sheet) -> Result<usize, StorageError> {
        self.sheet = sheet.clone();
        self.commits += 1;
        Ok(sheet.pending_updates().len())
    }

    fn describe(&self) -> String {
        "in-memory sheet".to_string()
    }
}
