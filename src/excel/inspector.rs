//! Template inspector - read-only view of how a template would be filled

use super::header_locator::{find_header_row, locate_columns};
use super::sheet::{column_letter, CellContent, SheetRead};
use super::sheet_writer::{find_insertion_row, find_last_filled_row};
use super::TARGET_SHEET;
use crate::error::{EstimateError, EstimateResult};
use crate::types::FieldKey;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A calamine value range plus its formula range, addressed 1-based
pub struct RangeSheet {
    name: String,
    values: Range<Data>,
    formulas: Option<Range<String>>,
}

impl RangeSheet {
    pub fn new(name: &str, values: Range<Data>, formulas: Option<Range<String>>) -> Self {
        Self {
            name: name.to_string(),
            values,
            formulas,
        }
    }
}

impl SheetRead for RangeSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        let ends = [
            self.values.end(),
            self.formulas.as_ref().and_then(|f| f.end()),
        ];
        ends.iter()
            .flatten()
            .fold((1, 1), |(rows, cols), (r, c)| {
                (rows.max(r + 1), cols.max(c + 1))
            })
    }

    fn cell(&self, row: u32, col: u32) -> CellContent {
        if row == 0 || col == 0 {
            return CellContent::Empty;
        }
        let pos = (row - 1, col - 1);

        if let Some(formula) = self.formulas.as_ref().and_then(|f| f.get_value(pos)) {
            if !formula.is_empty() {
                return CellContent::Formula(format!("={}", formula));
            }
        }

        match self.values.get_value(pos) {
            None | Some(Data::Empty) => CellContent::Empty,
            Some(Data::String(s)) => CellContent::Value(s.clone()),
            Some(other) => CellContent::Value(other.to_string()),
        }
    }
}

/// A recognized column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub field: FieldKey,
    pub column: u32,
    pub letter: String,
}

/// What a population run would do with a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub sheets: Vec<String>,
    pub header_row: u32,
    pub columns: Vec<ColumnInfo>,
    pub missing_fields: Vec<FieldKey>,
    pub last_filled_row: u32,
    pub next_row: u32,
    /// Column letters whose formulas would be carried into new rows
    pub formula_columns: Vec<String>,
}

impl InspectReport {
    /// True when at least one known column was found
    pub fn is_fillable(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Inspect the `Estimation` sheet of a template without modifying it
pub fn inspect_template(path: &Path) -> EstimateResult<InspectReport> {
    if !path.exists() {
        return Err(EstimateError::InputNotFound(path.to_path_buf()));
    }
    let workbook_error = |e: calamine::XlsxError| EstimateError::Workbook {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut workbook: Xlsx<_> = open_workbook(path).map_err(workbook_error)?;
    let sheets = workbook.sheet_names().to_vec();
    if !sheets.iter().any(|s| s == TARGET_SHEET) {
        return Err(EstimateError::SheetNotFound {
            expected: TARGET_SHEET.to_string(),
            available: sheets,
        });
    }

    let values = workbook
        .worksheet_range(TARGET_SHEET)
        .map_err(workbook_error)?;
    let formulas = workbook.worksheet_formula(TARGET_SHEET).ok();
    let sheet = RangeSheet::new(TARGET_SHEET, values, formulas);

    Ok(inspect_sheet(&sheet, path, sheets))
}

/// Build the report for any readable sheet
pub fn inspect_sheet<S: SheetRead + ?Sized>(
    sheet: &S,
    path: &Path,
    sheets: Vec<String>,
) -> InspectReport {
    let header_row = find_header_row(sheet);
    let located = locate_columns(sheet);

    let columns: Vec<ColumnInfo> = located
        .iter()
        .map(|(field, column)| ColumnInfo {
            field: *field,
            column: *column,
            letter: column_letter(*column),
        })
        .collect();
    let missing_fields = FieldKey::ALL
        .iter()
        .filter(|k| !located.contains_key(k))
        .copied()
        .collect();

    let data_cols: Vec<u32> = located.values().copied().collect();
    let (last_filled_row, next_row) = if data_cols.is_empty() {
        (header_row, header_row + 1)
    } else {
        (
            find_last_filled_row(sheet, &data_cols, header_row),
            find_insertion_row(sheet, &data_cols, header_row),
        )
    };

    let formula_columns = if last_filled_row > header_row {
        let (_, width) = sheet.dimensions();
        (1..=width)
            .filter(|&col| matches!(sheet.cell(last_filled_row, col), CellContent::Formula(_)))
            .map(column_letter)
            .collect()
    } else {
        Vec::new()
    };

    InspectReport {
        path: path.to_path_buf(),
        sheets,
        header_row,
        columns,
        missing_fields,
        last_filled_row,
        next_row,
        formula_columns,
    }
}
