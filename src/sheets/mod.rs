//! Writing normalized tables into spreadsheet worksheets.
//!
//! [`SheetWriter`] is backend-agnostic: it opens the worksheet, clears it,
//! and writes a header row plus data rows at the configured [`Anchor`].
//! [`google::GoogleSheets`] talks to the Sheets REST API;
//! [`memory::MemorySheets`] keeps grids in memory for tests and dry runs.

pub mod auth;
pub mod google;
pub mod memory;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::config::WorksheetTarget;
use crate::error::{Result, SyncError};
use crate::normalize::{Record, SHEET_DATETIME_FORMAT};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Int(i64),
    Text(String),
    Empty,
}

impl Cell {
    /// JSON value sent to the Sheets API. Empty cells are written as `""`.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Int(i) => Value::from(*i),
            Cell::Text(s) => Value::from(s.as_str()),
            Cell::Empty => Value::from(""),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<&String> for Cell {
    fn from(value: &String) -> Self {
        Cell::Text(value.clone())
    }
}

impl From<&Option<String>> for Cell {
    fn from(value: &Option<String>) -> Self {
        value.as_ref().map_or(Cell::Empty, Cell::from)
    }
}

impl From<&Option<NaiveDateTime>> for Cell {
    fn from(value: &Option<NaiveDateTime>) -> Self {
        value.map_or(Cell::Empty, |dt| {
            Cell::Text(dt.format(SHEET_DATETIME_FORMAT).to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Anchor and A1 notation
// ---------------------------------------------------------------------------

/// Largest row index a worksheet can have.
pub const MAX_ROWS: u32 = 10_000_000;
/// Largest column index a worksheet can have (`ZZZ`).
pub const MAX_COLUMNS: u32 = 18_278;

/// 1-based (row, column) of a table's top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    row: u32,
    col: u32,
}

impl Anchor {
    /// `None` when either coordinate is 0 or beyond [`MAX_ROWS`] /
    /// [`MAX_COLUMNS`].
    pub fn new(row: u32, col: u32) -> Option<Self> {
        ((1..=MAX_ROWS).contains(&row) && (1..=MAX_COLUMNS).contains(&col))
            .then_some(Self { row, col })
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Bottom-right cell of a `height` x `width` block placed here, or
    /// `None` when the block is empty or does not fit in a worksheet.
    pub fn last_cell(&self, height: usize, width: usize) -> Option<(u32, u32)> {
        let height = u32::try_from(height).ok().filter(|h| *h > 0)?;
        let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
        let row = self.row.checked_add(height - 1)?;
        let col = self.col.checked_add(width - 1)?;
        (row <= MAX_ROWS && col <= MAX_COLUMNS).then_some((row, col))
    }

    /// Cell reference such as `D1`.
    pub fn a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row)
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self { row: 1, col: 1 }
    }
}

/// Spreadsheet column letters for a 1-based column index (1 = A, 27 = AA).
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Error for a block that would run past the worksheet's last row or column.
pub(crate) fn out_of_bounds(
    ws: &WorksheetRef,
    anchor: Anchor,
    height: usize,
    width: usize,
) -> SyncError {
    SyncError::SheetAccess(format!(
        "{} rows x {} columns at {} do not fit in worksheet '{}'",
        height,
        width,
        anchor.a1(),
        ws.title
    ))
}

/// Worksheet title quoted for use in a range, e.g. `'Q1 Orders'`.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Range starting at `anchor` on `worksheet`, e.g. `'Orders'!A1`.
pub fn a1_range(worksheet: &str, anchor: Anchor) -> String {
    format!("{}!{}", quote_title(worksheet), anchor.a1())
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header names plus data rows in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn from_records<R: Record>(records: &[R]) -> Self {
        Self {
            headers: R::headers().into_iter().map(str::to_string).collect(),
            rows: records.iter().map(Record::to_row).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Header row followed by the data rows.
    pub fn to_grid(&self) -> Vec<Vec<Cell>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.headers.iter().map(Cell::from).collect());
        grid.extend(self.rows.iter().cloned());
        grid
    }
}

// ---------------------------------------------------------------------------
// SheetBackend
// ---------------------------------------------------------------------------

/// An opened worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetRef {
    pub spreadsheet_id: String,
    pub title: String,
}

/// Remote spreadsheet operations needed by [`SheetWriter`].
pub trait SheetBackend {
    /// Locate `worksheet` inside the spreadsheet named `spreadsheet`.
    ///
    /// Fails with `SheetAccess` if either is missing, unless
    /// `create_if_missing` is set and only the worksheet is absent.
    fn open_worksheet(
        &mut self,
        spreadsheet: &str,
        worksheet: &str,
        create_if_missing: bool,
    ) -> Result<WorksheetRef>;

    /// Remove every value from the worksheet.
    fn clear(&mut self, ws: &WorksheetRef) -> Result<()>;

    /// Write `grid` with its top-left cell at `anchor`.
    fn write_grid(&mut self, ws: &WorksheetRef, anchor: Anchor, grid: &[Vec<Cell>]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SheetWriter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub range: String,
    pub rows: usize,
    pub columns: usize,
}

/// Overwrites worksheets of one spreadsheet.
pub struct SheetWriter<'a> {
    backend: &'a mut dyn SheetBackend,
    spreadsheet: &'a str,
    create_missing: bool,
}

impl<'a> SheetWriter<'a> {
    pub fn new(backend: &'a mut dyn SheetBackend, spreadsheet: &'a str, create_missing: bool) -> Self {
        Self {
            backend,
            spreadsheet,
            create_missing,
        }
    }

    /// Clear the target worksheet and write `table` at its anchor.
    ///
    /// `rows` in the summary counts data rows, not the header.
    pub fn write_table(&mut self, table: &Table, target: &WorksheetTarget) -> Result<WriteSummary> {
        tracing::info!("Opening worksheet '{}' in '{}'", target.worksheet, self.spreadsheet);
        let ws = self
            .backend
            .open_worksheet(self.spreadsheet, &target.worksheet, self.create_missing)?;

        tracing::info!("Clearing existing data in '{}'", ws.title);
        self.backend.clear(&ws)?;

        let range = a1_range(&ws.title, target.anchor);
        tracing::info!(
            "Writing {} rows x {} columns at {}",
            table.rows.len(),
            table.width(),
            range
        );
        self.backend.write_grid(&ws, target.anchor, &table.to_grid())?;

        Ok(WriteSummary {
            range,
            rows: table.rows.len(),
            columns: table.width(),
        })
    }
}
