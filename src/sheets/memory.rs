//! In-memory [`SheetBackend`] used by tests and `--dry-run`.

use std::collections::BTreeMap;

use super::{out_of_bounds, Anchor, Cell, SheetBackend, WorksheetRef};
use crate::error::{Result, SyncError};

pub type Grid = Vec<Vec<Cell>>;

#[derive(Debug, Default)]
pub struct MemorySheets {
    spreadsheets: BTreeMap<String, BTreeMap<String, Grid>>,
    deny_auth: bool,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects every request as unauthorized.
    pub fn unauthorized() -> Self {
        Self {
            deny_auth: true,
            ..Self::default()
        }
    }

    /// Register a spreadsheet with empty worksheets.
    pub fn with_spreadsheet(mut self, name: &str, worksheets: &[&str]) -> Self {
        let sheets = self.spreadsheets.entry(name.to_string()).or_default();
        for ws in worksheets {
            sheets.entry(ws.to_string()).or_default();
        }
        self
    }

    pub fn grid(&self, spreadsheet: &str, worksheet: &str) -> Option<&Grid> {
        self.spreadsheets.get(spreadsheet)?.get(worksheet)
    }

    pub fn worksheet_names(&self, spreadsheet: &str) -> Vec<String> {
        self.spreadsheets
            .get(spreadsheet)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn grid_mut(&mut self, ws: &WorksheetRef) -> Result<&mut Grid> {
        self.spreadsheets
            .get_mut(&ws.spreadsheet_id)
            .and_then(|s| s.get_mut(&ws.title))
            .ok_or_else(|| {
                SyncError::SheetAccess(format!(
                    "Worksheet '{}' not found in '{}'",
                    ws.title, ws.spreadsheet_id
                ))
            })
    }

    fn check_auth(&self) -> Result<()> {
        if self.deny_auth {
            return Err(SyncError::SheetAuth(
                "credentials rejected by in-memory backend".to_string(),
            ));
        }
        Ok(())
    }
}

impl SheetBackend for MemorySheets {
    fn open_worksheet(
        &mut self,
        spreadsheet: &str,
        worksheet: &str,
        create_if_missing: bool,
    ) -> Result<WorksheetRef> {
        self.check_auth()?;
        let sheets = self.spreadsheets.get_mut(spreadsheet).ok_or_else(|| {
            SyncError::SheetAccess(format!("Spreadsheet '{}' not found", spreadsheet))
        })?;
        if !sheets.contains_key(worksheet) {
            if !create_if_missing {
                return Err(SyncError::SheetAccess(format!(
                    "Worksheet '{}' not found in '{}'",
                    worksheet, spreadsheet
                )));
            }
            sheets.insert(worksheet.to_string(), Grid::new());
        }
        Ok(WorksheetRef {
            spreadsheet_id: spreadsheet.to_string(),
            title: worksheet.to_string(),
        })
    }

    fn clear(&mut self, ws: &WorksheetRef) -> Result<()> {
        self.check_auth()?;
        self.grid_mut(ws)?.clear();
        Ok(())
    }

    fn write_grid(&mut self, ws: &WorksheetRef, anchor: Anchor, grid: &[Vec<Cell>]) -> Result<()> {
        self.check_auth()?;
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        if width > 0 && anchor.last_cell(grid.len(), width).is_none() {
            return Err(out_of_bounds(ws, anchor, grid.len(), width));
        }
        let target = self.grid_mut(ws)?;
        let row0 = (anchor.row() - 1) as usize;
        let col0 = (anchor.col() - 1) as usize;

        for (r, values) in grid.iter().enumerate() {
            let row_idx = row0 + r;
            if target.len() <= row_idx {
                target.resize(row_idx + 1, Vec::new());
            }
            let row = &mut target[row_idx];
            if row.len() < col0 + values.len() {
                row.resize(col0 + values.len(), Cell::Empty);
            }
            for (c, cell) in values.iter().enumerate() {
                row[col0 + c] = cell.clone();
            }
        }
        Ok(())
    }
}
