//! Default estimation template
//!
//! Used when no template is supplied: a single `Estimation` sheet whose first
//! row carries the canonical header titles.

use super::header_locator::HEADER_DICTIONARY;
use super::TARGET_SHEET;
use crate::error::{EstimateError, EstimateResult};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

fn build() -> EstimateResult<Workbook> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_text_wrap();

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(TARGET_SHEET)
        .map_err(|e| EstimateError::Export(format!("Failed to set worksheet name: {}", e)))?;

    for (col_idx, (title, key)) in HEADER_DICTIONARY.iter().enumerate() {
        let col = col_idx as u16;
        worksheet
            .write_string_with_format(0, col, *title, &header_format)
            .map_err(|e| EstimateError::Export(format!("Failed to write header: {}", e)))?;
        let width = if key.is_hours() { 11.0 } else { 22.0 };
        worksheet
            .set_column_width(col, width)
            .map_err(|e| EstimateError::Export(format!("Failed to size column: {}", e)))?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| EstimateError::Export(format!("Failed to freeze header: {}", e)))?;

    Ok(workbook)
}

/// Write the default template to `path`
pub fn write_default_template(path: &Path) -> EstimateResult<()> {
    build()?
        .save(path)
        .map_err(|e| EstimateError::Export(format!("Failed to save template: {}", e)))
}

/// The default template as .xlsx bytes
pub fn default_template_bytes() -> EstimateResult<Vec<u8>> {
    build()?
        .save_to_buffer()
        .map_err(|e| EstimateError::Export(format!("Failed to build template: {}", e)))
}
