//! Cell-level access to a worksheet
//!
//! The population engine only needs a handful of operations on a sheet, so it
//! talks to this trait instead of a concrete spreadsheet library. The editable
//! implementation wraps `umya_spreadsheet::Worksheet`; the inspector provides a
//! read-only one over calamine ranges.

use crate::types::CellScalar;
use thiserror::Error;
use umya_spreadsheet::Worksheet;

/// Largest row index an .xlsx sheet accepts
pub const MAX_SHEET_ROWS: u32 = 1_048_576;
/// Largest column index an .xlsx sheet accepts
pub const MAX_SHEET_COLUMNS: u32 = 16_384;

/// What a sheet holds at a coordinate
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Empty,
    Value(String),
    /// Formula text including the leading `=`
    Formula(String),
}

impl CellContent {
    pub fn is_empty(&self) -> bool {
        match self {
            CellContent::Empty => true,
            CellContent::Value(v) => v.is_empty(),
            CellContent::Formula(_) => false,
        }
    }

    /// Text used for header matching
    pub fn text(&self) -> Option<&str> {
        match self {
            CellContent::Empty => None,
            CellContent::Value(v) | CellContent::Formula(v) => Some(v),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellWriteError {
    #[error("cell ({row}, {col}) is outside the sheet limits")]
    OutOfBounds { row: u32, col: u32 },

    #[error("{0}")]
    Rejected(String),
}

/// Read access, 1-based coordinates
pub trait SheetRead {
    /// Name of the worksheet
    fn name(&self) -> &str;

    /// `(max_row, max_col)` of the used area, at least `(1, 1)`
    fn dimensions(&self) -> (u32, u32);

    fn cell(&self, row: u32, col: u32) -> CellContent;
}

/// Write access, 1-based coordinates
pub trait SheetWrite: SheetRead {
    /// Write a typed value; `CellScalar::Null` is a no-op
    fn write_scalar(&mut self, row: u32, col: u32, value: &CellScalar)
        -> Result<(), CellWriteError>;

    /// Write plain text, used as the fallback when a typed write fails
    fn write_text(&mut self, row: u32, col: u32, text: &str) -> Result<(), CellWriteError>;

    /// Put a formula (with or without the leading `=`) into a cell
    fn write_formula(&mut self, row: u32, col: u32, formula: &str)
        -> Result<(), CellWriteError>;
}

fn check_bounds(row: u32, col: u32) -> Result<(), CellWriteError> {
    if row == 0 || col == 0 || row > MAX_SHEET_ROWS || col > MAX_SHEET_COLUMNS {
        return Err(CellWriteError::OutOfBounds { row, col });
    }
    Ok(())
}

impl SheetRead for Worksheet {
    fn name(&self) -> &str {
        self.get_name()
    }

    fn dimensions(&self) -> (u32, u32) {
        let (max_col, max_row) = self.get_highest_column_and_row();
        (max_row.max(1), max_col.max(1))
    }

    fn cell(&self, row: u32, col: u32) -> CellContent {
        match self.get_cell((col, row)) {
            None => CellContent::Empty,
            Some(cell) if cell.is_formula() => CellContent::Formula(format!("={}", cell.get_formula())),
            Some(cell) => {
                let value = cell.get_value();
                if value.is_empty() {
                    CellContent::Empty
                } else {
                    CellContent::Value(value.to_string())
                }
            }
        }
    }
}

impl SheetWrite for Worksheet {
    fn write_scalar(
        &mut self,
        row: u32,
        col: u32,
        value: &CellScalar,
    ) -> Result<(), CellWriteError> {
        check_bounds(row, col)?;
        match value {
            CellScalar::Null => {}
            CellScalar::Bool(b) => {
                self.get_cell_mut((col, row)).set_value_bool(*b);
            }
            CellScalar::Int(i) => {
                self.get_cell_mut((col, row)).set_value_number(*i as f64);
            }
            CellScalar::Float(f) => {
                if !f.is_finite() {
                    return Err(CellWriteError::Rejected(format!(
                        "non-finite number {} cannot be stored",
                        f
                    )));
                }
                self.get_cell_mut((col, row)).set_value_number(*f);
            }
            CellScalar::Text(s) => {
                self.get_cell_mut((col, row)).set_value_string(s.as_str());
            }
        }
        Ok(())
    }

    fn write_text(&mut self, row: u32, col: u32, text: &str) -> Result<(), CellWriteError> {
        check_bounds(row, col)?;
        self.get_cell_mut((col, row)).set_value_string(text);
        Ok(())
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u32,
        formula: &str,
    ) -> Result<(), CellWriteError> {
        check_bounds(row, col)?;
        let body = formula.strip_prefix('=').unwrap_or(formula);
        self.get_cell_mut((col, row)).set_formula(body.to_string());
        Ok(())
    }
}

/// Convert a 1-based column index to Excel letters (1 → A, 27 → AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    result
}
