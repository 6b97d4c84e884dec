//! Sheet writer - appends row records below a template's existing data
//!
//! Rows are written after the last pre-filled template row. Formulas found in
//! that row are carried down into each appended row so computed columns
//! (totals, durations) keep working. The writer never overwrites a value or a
//! formula it did not put there.

use super::flattener::{flatten, SkipReason};
use super::header_locator::{
    find_header_row, locate_columns, scan_headers, ColumnMap, HEADER_SCAN_ROWS,
};
use super::sanitizer::{safe_numeric_convert, sanitize};
use super::sheet::{CellContent, CellWriteError, SheetRead, SheetWrite};
use crate::error::{EstimateError, EstimateResult};
use crate::types::{CellScalar, FieldKey, FieldValue};
use serde::Serialize;
use tracing::{debug, warn};

/// Upper bound on rows scanned below the header row
const DATA_SCAN_LIMIT: u32 = 5_000;
/// Rows past the used area still considered when looking for a free row
const TRAILING_ROW_SLACK: u32 = 100;
/// Columns considered when carrying formulas down
const FORMULA_COPY_COLUMNS: u32 = 100;

/// A row that was not written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSkip {
    /// 0-based position in the input `rows` array
    pub index: usize,
    pub reason: SkipReason,
}

/// A cell left untouched after both write attempts failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWarning {
    pub row: u32,
    pub col: u32,
    pub field: FieldKey,
    pub reason: String,
}

/// Outcome of one population run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub header_row: u32,
    pub start_row: u32,
    pub last_filled_row: u32,
    pub columns: ColumnMap,
    pub rows_written: usize,
    pub skipped_rows: Vec<RowSkip>,
    pub cells_written: usize,
    /// Cells stored as plain text after the typed write failed
    pub cell_fallbacks: usize,
    pub cell_warnings: Vec<CellWarning>,
    pub formulas_copied: usize,
}

impl FillReport {
    pub fn rows_skipped(&self) -> usize {
        self.skipped_rows.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped_rows.is_empty() && self.cell_warnings.is_empty()
    }
}

/// Append `rows` to the data region of `sheet`.
///
/// Fails only when no known column header is found at all.
pub fn write_rows<S: SheetWrite + ?Sized>(
    sheet: &mut S,
    rows: &[FieldValue],
) -> EstimateResult<FillReport> {
    if rows.is_empty() {
        return Ok(FillReport::default());
    }

    let header_row = find_header_row(sheet);
    let columns = locate_columns(sheet);

    let data_cols: Vec<u32> = FieldKey::ALL
        .iter()
        .filter_map(|key| columns.get(key).copied())
        .collect();

    if data_cols.is_empty() {
        let mut found: Vec<String> = scan_headers(sheet, HEADER_SCAN_ROWS).into_keys().collect();
        found.sort();
        return Err(EstimateError::NoRecognizedColumns {
            sheet: sheet.name().to_string(),
            found,
        });
    }

    let start_row = find_insertion_row(sheet, &data_cols, header_row);
    let last_filled_row = find_last_filled_row(sheet, &data_cols, header_row);
    debug!(
        header_row,
        start_row,
        last_filled_row,
        columns = columns.len(),
        "located data region"
    );

    let mut report = FillReport {
        header_row,
        start_row,
        last_filled_row,
        columns,
        ..FillReport::default()
    };

    let mut current_row = start_row;
    for (index, row) in rows.iter().enumerate() {
        let flat = match flatten(row) {
            Ok(flat) => flat,
            Err(reason) => {
                warn!(row = index + 1, %reason, "skipping row");
                report.skipped_rows.push(RowSkip { index, reason });
                continue;
            }
        };

        if current_row > last_filled_row && last_filled_row > header_row {
            report.formulas_copied += copy_formulas(sheet, last_filled_row, current_row);
        }

        for (key, col) in &report.columns {
            let Some(value) = flat.get(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let scalar = cell_scalar(*key, value);
            if scalar.is_null() {
                continue;
            }

            match write_cell(sheet, current_row, *col, &scalar) {
                Ok(CellOutcome::Written) => report.cells_written += 1,
                Ok(CellOutcome::Fallback) => {
                    report.cells_written += 1;
                    report.cell_fallbacks += 1;
                }
                Err(e) => {
                    warn!(row = current_row, col = *col, field = %key, error = %e, "could not write cell");
                    report.cell_warnings.push(CellWarning {
                        row: current_row,
                        col: *col,
                        field: *key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.rows_written += 1;
        current_row += 1;
    }

    Ok(report)
}

/// Numeric fields are coerced first; anything unparsable is written as given
fn cell_scalar(key: FieldKey, value: &FieldValue) -> CellScalar {
    if key.is_numeric() {
        if let Some(n) = safe_numeric_convert(value) {
            return CellScalar::Float(n);
        }
    }
    sanitize(value)
}

enum CellOutcome {
    Written,
    Fallback,
}

fn write_cell<S: SheetWrite + ?Sized>(
    sheet: &mut S,
    row: u32,
    col: u32,
    value: &CellScalar,
) -> Result<CellOutcome, CellWriteError> {
    match sheet.write_scalar(row, col, value) {
        Ok(()) => Ok(CellOutcome::Written),
        Err(first) => {
            debug!(row, col, error = %first, "typed write failed, retrying as text");
            sheet
                .write_text(row, col, &value.to_string())
                .map(|()| CellOutcome::Fallback)
        }
    }
}

fn row_is_empty<S: SheetRead + ?Sized>(sheet: &S, row: u32, data_cols: &[u32]) -> bool {
    data_cols.iter().all(|&col| sheet.cell(row, col).is_empty())
}

/// First row below the header whose data columns are all empty
pub fn find_insertion_row<S: SheetRead + ?Sized>(
    sheet: &S,
    data_cols: &[u32],
    header_row: u32,
) -> u32 {
    let (height, _) = sheet.dimensions();
    let start = header_row + 1;
    let end = (height + TRAILING_ROW_SLACK).min(start + DATA_SCAN_LIMIT);

    let mut last_scanned = header_row;
    for row in start..end {
        if row_is_empty(sheet, row, data_cols) {
            return row;
        }
        last_scanned = row;
    }
    last_scanned + 1
}

/// Last row below the header with any data column filled, or the header row
pub fn find_last_filled_row<S: SheetRead + ?Sized>(
    sheet: &S,
    data_cols: &[u32],
    header_row: u32,
) -> u32 {
    let (height, _) = sheet.dimensions();
    let end = (height + 1).min(header_row + DATA_SCAN_LIMIT);

    (header_row + 1..end)
        .filter(|&row| !row_is_empty(sheet, row, data_cols))
        .last()
        .unwrap_or(header_row)
}

/// Copy formulas from `src_row` into the empty cells of `dst_row`.
///
/// Formula text is copied verbatim; references are not shifted.
pub fn copy_formulas<S: SheetWrite + ?Sized>(sheet: &mut S, src_row: u32, dst_row: u32) -> usize {
    let (_, width) = sheet.dimensions();
    let mut copied = 0;

    for col in 1..=width.min(FORMULA_COPY_COLUMNS) {
        if !sheet.cell(dst_row, col).is_empty() {
            continue;
        }
        if let CellContent::Formula(formula) = sheet.cell(src_row, col) {
            match sheet.write_formula(dst_row, col, &formula) {
                Ok(()) => copied += 1,
                Err(e) => warn!(src_row, dst_row, col, error = %e, "could not copy formula"),
            }
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use umya_spreadsheet::{Spreadsheet, Worksheet};

    const HEADERS: [&str; 17] = [
        "Platform (Desktop / Web / Mobile)",
        "Module",
        "Component",
        "Features",
        "Make/ Reuse",
        "Complexity (Simple / Complex / Average)",
        "Project Name",
        "Actual (working day)",
        "UI Design",
        "UI Module",
        "BL",
        "General",
        "Service/ API",
        "DB Struct.",
        "DB Prog.",
        "DB - UDF",
        "# Comp.",
    ];

    fn template(header_row: u32) -> Spreadsheet {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.new_sheet("Estimation").unwrap();
        for (i, title) in HEADERS.iter().enumerate() {
            ws.write_text(header_row, i as u32 + 1, title).unwrap();
        }
        ws.write_text(header_row, 18, "Total").unwrap();
        book
    }

    fn sheet(book: &mut Spreadsheet) -> &mut Worksheet {
        book.get_sheet_by_name_mut("Estimation").unwrap()
    }

    fn rows(value: serde_json::Value) -> Vec<FieldValue> {
        match FieldValue::from(value) {
            FieldValue::List(items) => items,
            other => vec![other],
        }
    }

    fn value(ws: &Worksheet, row: u32, col: u32) -> String {
        ws.cell(row, col).text().unwrap_or_default().to_string()
    }

    #[test]
    fn test_rows_land_below_header() {
        let mut book = template(3);
        let ws = sheet(&mut book);

        let report = write_rows(
            ws,
            &rows(json!([
                {"platform": "Web", "module": "Auth", "feature": "Login",
                 "hours": {"ui_design": 4, "general": "2.5"}, "num_components": 3},
                {"platform": "Mobile", "module": "Feed"}
            ])),
        )
        .unwrap();

        assert_eq!(report.header_row, 3);
        assert_eq!(report.start_row, 4);
        assert_eq!(report.last_filled_row, 3);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.columns.len(), 17);
        assert!(report.is_clean());

        assert_eq!(value(ws, 4, 1), "Web");
        assert_eq!(value(ws, 4, 2), "Auth");
        assert_eq!(value(ws, 4, 4), "Login");
        assert_eq!(value(ws, 4, 9), "4");
        assert_eq!(value(ws, 4, 12), "2.5");
        assert_eq!(value(ws, 4, 17), "3");
        // missing hour buckets are written as zero
        assert_eq!(value(ws, 5, 16), "0");
        // null previous-project fields are not written
        assert!(ws.cell(5, 7).is_empty());
        assert_eq!(value(ws, 5, 1), "Mobile");
    }

    #[test]
    fn test_insertion_after_prefilled_rows() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        for row in 2..=4 {
            for col in 1..=17 {
                ws.write_text(row, col, &format!("old-{}-{}", row, col)).unwrap();
            }
        }

        let report = write_rows(
            ws,
            &rows(json!([{"module": "New A"}, {"module": "New B"}])),
        )
        .unwrap();

        assert_eq!(report.start_row, 5);
        assert_eq!(report.last_filled_row, 4);
        assert_eq!(value(ws, 5, 2), "New A");
        assert_eq!(value(ws, 6, 2), "New B");
        for row in 2..=4 {
            for col in 1..=17 {
                assert_eq!(value(ws, row, col), format!("old-{}-{}", row, col));
            }
        }
    }

    #[test]
    fn test_formulas_are_carried_down() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        ws.write_text(2, 2, "Existing").unwrap();
        ws.write_formula(2, 18, "=SUM(A1:A5)").unwrap();

        let report = write_rows(ws, &rows(json!([{"module": "Appended"}]))).unwrap();

        assert_eq!(report.start_row, 3);
        assert_eq!(report.formulas_copied, 1);
        assert_eq!(ws.cell(3, 18), CellContent::Formula("=SUM(A1:A5)".to_string()));
        assert_eq!(ws.cell(2, 18), CellContent::Formula("=SUM(A1:A5)".to_string()));
        assert_eq!(value(ws, 2, 2), "Existing");
    }

    #[test]
    fn test_formula_copy_never_overwrites() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        ws.write_text(2, 2, "Existing").unwrap();
        ws.write_formula(2, 18, "=I2+J2").unwrap();
        ws.write_formula(2, 19, "=K2*2").unwrap();
        // the append row already has something in column 19
        ws.write_text(3, 19, "manual").unwrap();

        let report = write_rows(ws, &rows(json!([{"module": "Appended"}]))).unwrap();

        assert_eq!(report.formulas_copied, 1);
        assert_eq!(ws.cell(3, 18), CellContent::Formula("=I2+J2".to_string()));
        assert_eq!(value(ws, 3, 19), "manual");
    }

    #[test]
    fn test_no_formula_copy_without_prefilled_row() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        ws.write_formula(1, 19, "=NOW()").unwrap();

        let report = write_rows(ws, &rows(json!([{"module": "Only"}]))).unwrap();

        assert_eq!(report.formulas_copied, 0);
        assert!(ws.cell(2, 19).is_empty());
    }

    #[test]
    fn test_template_without_known_columns_is_fatal() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.new_sheet("Estimation").unwrap();
        ws.write_text(1, 1, "Name").unwrap();
        ws.write_text(1, 2, "Budget").unwrap();

        let err = write_rows(ws, &rows(json!([{"module": "x"}]))).unwrap_err();
        match err {
            EstimateError::NoRecognizedColumns { sheet, found } => {
                assert_eq!(sheet, "Estimation");
                assert_eq!(found, vec!["budget".to_string(), "name".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_input_leaves_sheet_alone() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.new_sheet("Estimation").unwrap();
        let report = write_rows(ws, &[]).unwrap();
        assert_eq!(report, FillReport::default());
    }

    #[test]
    fn test_bad_rows_are_skipped_without_gaps() {
        let mut book = template(1);
        let ws = sheet(&mut book);

        let report = write_rows(
            ws,
            &rows(json!([{"module": "First"}, "not a row", {"module": "Second"}])),
        )
        .unwrap();

        assert_eq!(report.rows_written, 2);
        assert_eq!(report.rows_skipped(), 1);
        assert_eq!(report.skipped_rows[0].index, 1);
        assert_eq!(value(ws, 2, 2), "First");
        assert_eq!(value(ws, 3, 2), "Second");
    }

    #[test]
    fn test_non_numeric_hours_are_written_as_given() {
        let mut book = template(1);
        let ws = sheet(&mut book);

        write_rows(
            ws,
            &rows(json!([{"hours": {"general": "TBD", "db_udf": -3}, "feature": "x"}])),
        )
        .unwrap();

        assert_eq!(value(ws, 2, 4), "x");
        assert_eq!(value(ws, 2, 12), "TBD");
        assert_eq!(value(ws, 2, 16), "-3");
    }

    #[test]
    fn test_boolean_hours_are_written_as_numbers() {
        let mut book = template(1);
        let ws = sheet(&mut book);

        write_rows(
            ws,
            &rows(json!([{"module": "Auth", "hours": {"general": true, "db_udf": false}}])),
        )
        .unwrap();

        assert_eq!(value(ws, 2, 12), "1");
        assert_eq!(value(ws, 2, 16), "0");
    }

    #[test]
    fn test_list_values_are_sanitized() {
        let mut book = template(1);
        let ws = sheet(&mut book);

        write_rows(
            ws,
            &rows(json!([{"feature": ["SSO", "MFA"], "component": {"name": "Login"}}])),
        )
        .unwrap();

        assert_eq!(value(ws, 2, 4), "SSO | MFA");
        assert_eq!(value(ws, 2, 3), "{\"name\": \"Login\"}");
    }

    #[test]
    fn test_partial_template_writes_known_columns_only() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.new_sheet("Estimation").unwrap();
        ws.write_text(2, 3, "Module").unwrap();
        ws.write_text(2, 5, "General").unwrap();

        let report = write_rows(
            ws,
            &rows(json!([{"module": "Auth", "platform": "Web", "hours": {"general": 1}}])),
        )
        .unwrap();

        assert_eq!(report.header_row, 2);
        assert_eq!(report.columns.len(), 2);
        assert_eq!(value(ws, 3, 3), "Auth");
        assert_eq!(value(ws, 3, 5), "1");
        assert_eq!(report.cells_written, 2);
    }

    #[test]
    fn test_find_insertion_row_skips_partially_filled_rows() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        ws.write_text(2, 1, "Web").unwrap();
        ws.write_text(3, 9, "4").unwrap();

        let data_cols: Vec<u32> = (1..=17).collect();
        assert_eq!(find_insertion_row(ws, &data_cols, 1), 4);
        assert_eq!(find_last_filled_row(ws, &data_cols, 1), 3);
    }

    #[test]
    fn test_gap_in_template_data() {
        let mut book = template(1);
        let ws = sheet(&mut book);
        ws.write_text(2, 2, "A").unwrap();
        ws.write_text(4, 2, "C").unwrap();

        let data_cols: Vec<u32> = (1..=17).collect();
        // first free row is the gap, but formulas come from the last filled row
        assert_eq!(find_insertion_row(ws, &data_cols, 1), 3);
        assert_eq!(find_last_filled_row(ws, &data_cols, 1), 4);
    }

    /// In-memory sheet with a single `Module` column whose typed writes fail
    struct RejectingSheet {
        cells: std::collections::BTreeMap<(u32, u32), String>,
        text_writes_fail: bool,
    }

    impl RejectingSheet {
        fn new(text_writes_fail: bool) -> Self {
            let mut cells = std::collections::BTreeMap::new();
            cells.insert((1, 1), "Module".to_string());
            Self {
                cells,
                text_writes_fail,
            }
        }
    }

    impl SheetRead for RejectingSheet {
        fn name(&self) -> &str {
            "Estimation"
        }

        fn dimensions(&self) -> (u32, u32) {
            self.cells
                .keys()
                .fold((1, 1), |(r, c), &(row, col)| (r.max(row), c.max(col)))
        }

        fn cell(&self, row: u32, col: u32) -> CellContent {
            self.cells
                .get(&(row, col))
                .cloned()
                .map(CellContent::Value)
                .unwrap_or(CellContent::Empty)
        }
    }

    impl SheetWrite for RejectingSheet {
        fn write_scalar(
            &mut self,
            _row: u32,
            _col: u32,
            _value: &CellScalar,
        ) -> Result<(), CellWriteError> {
            Err(CellWriteError::Rejected("typed writes unsupported".to_string()))
        }

        fn write_text(&mut self, row: u32, col: u32, text: &str) -> Result<(), CellWriteError> {
            if self.text_writes_fail {
                return Err(CellWriteError::Rejected("sheet is read-only".to_string()));
            }
            self.cells.insert((row, col), text.to_string());
            Ok(())
        }

        fn write_formula(
            &mut self,
            _row: u32,
            _col: u32,
            _formula: &str,
        ) -> Result<(), CellWriteError> {
            Err(CellWriteError::Rejected("formulas unsupported".to_string()))
        }
    }

    #[test]
    fn test_rejected_typed_write_falls_back_to_text() {
        let mut sheet = RejectingSheet::new(false);

        let report = write_rows(&mut sheet, &rows(json!([{"module": "Auth"}]))).unwrap();

        assert_eq!(report.rows_written, 1);
        assert_eq!(report.cells_written, 1);
        assert_eq!(report.cell_fallbacks, 1);
        assert!(report.cell_warnings.is_empty());
        assert_eq!(sheet.cell(2, 1), CellContent::Value("Auth".to_string()));
    }

    #[test]
    fn test_failed_fallback_becomes_cell_warning() {
        let mut sheet = RejectingSheet::new(true);

        let report = write_rows(
            &mut sheet,
            &rows(json!([{"module": "Auth"}, {"module": "Feed"}])),
        )
        .unwrap();

        assert_eq!(report.rows_written, 2);
        assert_eq!(report.cells_written, 0);
        assert_eq!(report.cell_fallbacks, 0);
        assert_eq!(
            report.cell_warnings,
            vec![
                CellWarning {
                    row: 2,
                    col: 1,
                    field: FieldKey::Module,
                    reason: "sheet is read-only".to_string(),
                },
                CellWarning {
                    row: 3,
                    col: 1,
                    field: FieldKey::Module,
                    reason: "sheet is read-only".to_string(),
                },
            ]
        );
        assert!(!report.is_clean());
        assert_eq!(sheet.cell(2, 1), CellContent::Empty);
    }
}
