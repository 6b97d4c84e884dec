//! Feature list export
//!
//! A two-sheet workbook built straight from the envelope, independent of any
//! template: `Features` lists one line per row, `Summary` carries the project
//! metadata and derived totals.

use crate::envelope::{Envelope, EstimateSummary, FeatureLine};
use crate::error::{EstimateError, EstimateResult};
use crate::excel::sanitizer::{clean_text, sanitize};
use crate::types::CellScalar;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

const FEATURE_HEADERS: [&str; 4] = ["Title", "Hours", "Complexity", "Priority"];

/// Excel exporter for estimation envelopes
pub struct ExcelExporter {
    envelope: Envelope,
}

impl ExcelExporter {
    /// Create a new Excel exporter
    pub fn new(envelope: Envelope) -> Self {
        Self { envelope }
    }

    /// Export the envelope to an Excel .xlsx file
    pub fn export(&self, output_path: &Path) -> EstimateResult<()> {
        let mut workbook = self.build()?;
        workbook.save(output_path).map_err(|e| EstimateError::Save {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Export the envelope as .xlsx bytes
    pub fn export_to_buffer(&self) -> EstimateResult<Vec<u8>> {
        let mut workbook = self.build()?;
        workbook
            .save_to_buffer()
            .map_err(|e| EstimateError::Export(format!("Failed to build workbook: {}", e)))
    }

    fn build(&self) -> EstimateResult<Workbook> {
        let mut workbook = Workbook::new();
        self.export_features(&mut workbook)?;
        self.export_summary(&mut workbook)?;
        Ok(workbook)
    }

    /// One line per object row; non-object rows are left out
    fn export_features(&self, workbook: &mut Workbook) -> EstimateResult<()> {
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name("Features")
            .map_err(|e| EstimateError::Export(format!("Failed to set worksheet name: {}", e)))?;

        for (col, title) in FEATURE_HEADERS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *title, &header_format)
                .map_err(|e| EstimateError::Export(format!("Failed to write header: {}", e)))?;
        }
        worksheet
            .set_column_width(0, 48.0)
            .map_err(|e| EstimateError::Export(format!("Failed to size column: {}", e)))?;

        let lines = self
            .envelope
            .rows
            .iter()
            .filter(|r| r.is_map())
            .map(FeatureLine::from_row);

        for (idx, line) in lines.enumerate() {
            let row = (idx + 1) as u32;
            write_string(worksheet, row, 0, &line.title)?;
            write_number(worksheet, row, 1, line.hours)?;
            write_string(worksheet, row, 2, line.complexity.as_deref().unwrap_or(""))?;
            match line.priority.as_ref().map(sanitize) {
                Some(CellScalar::Int(n)) => write_number(worksheet, row, 3, n as f64)?,
                Some(CellScalar::Float(n)) => write_number(worksheet, row, 3, n)?,
                Some(other) if !other.is_null() => write_string(worksheet, row, 3, &other.to_string())?,
                _ => {}
            }
        }

        Ok(())
    }

    fn export_summary(&self, workbook: &mut Workbook) -> EstimateResult<()> {
        let label_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name("Summary")
            .map_err(|e| EstimateError::Export(format!("Failed to set worksheet name: {}", e)))?;
        worksheet
            .set_column_width(0, 34.0)
            .map_err(|e| EstimateError::Export(format!("Failed to size column: {}", e)))?;

        let project = &self.envelope.project;
        let summary = EstimateSummary::from_envelope(&self.envelope);
        let estimator = project
            .estimator
            .as_ref()
            .map(|e| e.name.clone())
            .unwrap_or_default();

        let text_rows = [
            ("Estimation Title", project.name.clone()),
            ("Client", self.envelope.client().to_string()),
            ("Estimator", estimator),
            ("Version", self.envelope.schema_version.clone()),
        ];
        let number_rows = [
            ("Rows", summary.row_count as f64),
            ("Total Hours", summary.total_hours),
            ("Contingency %", summary.contingency_pct * 100.0),
            ("Total Hours (with contingency)", summary.total_hours_with_contingency),
            (
                "Single Resource Duration (days)",
                summary.single_resource_duration_days as f64,
            ),
            (
                "Single Resource Duration (months)",
                summary.single_resource_duration_months,
            ),
        ];

        let mut row = 0u32;
        for (label, value) in text_rows {
            write_label(worksheet, row, label, &label_format)?;
            write_string(worksheet, row, 1, &value)?;
            row += 1;
        }
        for (label, value) in number_rows {
            write_label(worksheet, row, label, &label_format)?;
            write_number(worksheet, row, 1, value)?;
            row += 1;
        }

        for (complexity, count) in &summary.by_complexity {
            write_label(worksheet, row, &format!("Complexity: {}", complexity), &label_format)?;
            write_number(worksheet, row, 1, *count as f64)?;
            row += 1;
        }

        if !self.envelope.notes.is_empty() {
            row += 1;
            write_label(worksheet, row, "Notes", &label_format)?;
            for note in &self.envelope.notes {
                write_string(worksheet, row, 1, note)?;
                row += 1;
            }
        }

        Ok(())
    }
}

fn write_label(ws: &mut Worksheet, row: u32, label: &str, format: &Format) -> EstimateResult<()> {
    ws.write_string_with_format(row, 0, label, format)
        .map(|_| ())
        .map_err(|e| EstimateError::Export(format!("Failed to write label: {}", e)))
}

fn write_string(ws: &mut Worksheet, row: u32, col: u16, value: &str) -> EstimateResult<()> {
    ws.write_string(row, col, clean_text(value))
        .map(|_| ())
        .map_err(|e| EstimateError::Export(format!("Failed to write cell: {}", e)))
}

fn write_number(ws: &mut Worksheet, row: u32, col: u16, value: f64) -> EstimateResult<()> {
    ws.write_number(row, col, value)
        .map(|_| ())
        .map_err(|e| EstimateError::Export(format!("Failed to write cell: {}", e)))
}
