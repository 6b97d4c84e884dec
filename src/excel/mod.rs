//! Excel template population
//!
//! - Populate: envelope rows → the `Estimation` sheet of a template (umya-spreadsheet)
//! - Inspect: read-only template analysis (calamine)
//! - Template / export: generated workbooks (rust_xlsxwriter)

mod exporter;
mod flattener;
mod header_locator;
mod inspector;
mod populator;
mod sanitizer;
pub mod sheet;
mod sheet_writer;
mod template;

/// The only sheet the populator writes to
pub const TARGET_SHEET: &str = "Estimation";

pub use exporter::ExcelExporter;
pub use flattener::{flatten, FlatRow, SkipReason};
pub use header_locator::{
    columns_from_headers, find_header_row, locate_columns, normalize_header_text, scan_headers,
    ColumnMap, HeaderMap, HEADER_DICTIONARY,
};
pub use inspector::{inspect_sheet, inspect_template, ColumnInfo, InspectReport, RangeSheet};
pub use populator::{
    default_output_path, download_file_name, populate_bytes, populate_workbook, read_template,
    safe_project_name, PopulateOutcome, TemplatePopulator,
};
pub use sanitizer::{clean_text, safe_numeric_convert, sanitize, MAX_CELL_CHARS};
pub use sheet_writer::{write_rows, CellWarning, FillReport, RowSkip};
pub use template::{default_template_bytes, write_default_template};
