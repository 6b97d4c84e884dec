//! Template populator - load, fill and save an estimation workbook
//!
//! Wraps the sheet writer with workbook I/O: the template is read with
//! umya-spreadsheet so styles, other sheets and formulas survive the round
//! trip, the `Estimation` sheet is filled in place and the result is saved to
//! a new file (or returned as bytes for the HTTP layer).

use super::sheet_writer::{write_rows, FillReport};
use super::template::default_template_bytes;
use super::TARGET_SHEET;
use crate::envelope::Envelope;
use crate::error::{EstimateError, EstimateResult};
use chrono::{DateTime, Local};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use umya_spreadsheet::Spreadsheet;

/// Result of a file-to-file population
#[derive(Debug, Clone, PartialEq)]
pub struct PopulateOutcome {
    pub output: PathBuf,
    pub report: FillReport,
}

/// Populates a template file from an envelope file
pub struct TemplatePopulator {
    json_path: PathBuf,
    template_path: PathBuf,
    output_path: Option<PathBuf>,
}

impl TemplatePopulator {
    pub fn new(json_path: PathBuf, template_path: PathBuf) -> Self {
        Self {
            json_path,
            template_path,
            output_path: None,
        }
    }

    /// Write to `path` instead of the timestamped default
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    /// Validate both inputs, fill the template and save the copy.
    ///
    /// The envelope is fully validated before the workbook is opened, so a bad
    /// payload never produces an output file.
    pub fn run(&self) -> EstimateResult<PopulateOutcome> {
        if !self.template_path.exists() {
            return Err(EstimateError::InputNotFound(self.template_path.clone()));
        }
        let envelope = Envelope::load(&self.json_path)?;
        debug!(
            rows = envelope.rows.len(),
            project = %envelope.project.name,
            "envelope loaded"
        );

        let output = self
            .output_path
            .clone()
            .unwrap_or_else(|| default_output_path(&self.template_path, Local::now()));

        let mut book = umya_spreadsheet::reader::xlsx::read(&self.template_path).map_err(|e| {
            EstimateError::Workbook {
                path: self.template_path.clone(),
                reason: e.to_string(),
            }
        })?;

        let report = populate_workbook(&mut book, &envelope)?;
        let bytes = workbook_bytes(&book, &output)?;
        save_bytes(&output, &bytes)?;

        info!(
            output = %output.display(),
            rows_written = report.rows_written,
            rows_skipped = report.rows_skipped(),
            "workbook populated"
        );

        Ok(PopulateOutcome { output, report })
    }
}

/// Fill the `Estimation` sheet of an already loaded workbook
pub fn populate_workbook(book: &mut Spreadsheet, envelope: &Envelope) -> EstimateResult<FillReport> {
    let available = sheet_names(book);
    let sheet = book
        .get_sheet_by_name_mut(TARGET_SHEET)
        .ok_or_else(|| EstimateError::SheetNotFound {
            expected: TARGET_SHEET.to_string(),
            available,
        })?;
    write_rows(sheet, &envelope.rows)
}

/// Populate an in-memory template, falling back to the default template.
///
/// Returns the filled workbook as .xlsx bytes.
pub fn populate_bytes(
    template: Option<&[u8]>,
    envelope: &Envelope,
) -> EstimateResult<(Vec<u8>, FillReport)> {
    let template_bytes = match template {
        Some(bytes) => bytes.to_vec(),
        None => default_template_bytes()?,
    };

    let in_memory = PathBuf::from("<memory>");
    let mut book =
        umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(template_bytes), true).map_err(
            |e| EstimateError::Workbook {
                path: in_memory.clone(),
                reason: e.to_string(),
            },
        )?;

    let report = populate_workbook(&mut book, envelope)?;
    let bytes = workbook_bytes(&book, &in_memory)?;
    Ok((bytes, report))
}

/// Read a template file for [`populate_bytes`]
pub fn read_template(path: &Path) -> EstimateResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EstimateError::InputNotFound(path.to_path_buf()),
        _ => EstimateError::Io(e),
    })
}

fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection_no_check()
        .iter()
        .map(|ws| ws.get_name().to_string())
        .collect()
}

fn workbook_bytes(book: &Spreadsheet, path: &Path) -> EstimateResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor).map_err(|e| {
        EstimateError::Save {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    Ok(cursor.into_inner())
}

fn save_bytes(path: &Path, bytes: &[u8]) -> EstimateResult<()> {
    std::fs::write(path, bytes).map_err(|e| save_error(path, e))
}

fn save_error(path: &Path, e: std::io::Error) -> EstimateError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => EstimateError::OutputLocked {
            path: path.to_path_buf(),
        },
        _ => EstimateError::Save {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

/// `<stem>.FILLED-<YYYYmmdd-HHMMSS><.ext>` next to the template
pub fn default_output_path(template: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "estimation".to_string());
    let ext = template
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let name = format!("{}.FILLED-{}{}", stem, now.format("%Y%m%d-%H%M%S"), ext);
    template.with_file_name(name)
}

/// Project name reduced to characters safe in a download file name
pub fn safe_project_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe = kept.trim().replace(' ', "_");
    if safe.is_empty() {
        "estimation".to_string()
    } else {
        safe
    }
}

/// `<safe_project>_FILLED_<YYYYmmdd_HHMMSS>.xlsx`
pub fn download_file_name(project: &str, now: DateTime<Local>) -> String {
    format!(
        "{}_FILLED_{}.xlsx",
        safe_project_name(project),
        now.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::sheet::{CellContent, SheetRead};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn envelope(value: serde_json::Value) -> Envelope {
        Envelope::from_value(value).unwrap()
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("/tmp/Estimate v2.xlsx"), fixed_time());
        assert_eq!(
            path,
            PathBuf::from("/tmp/Estimate v2.FILLED-20240309-140507.xlsx")
        );

        let bare = default_output_path(Path::new("template"), fixed_time());
        assert_eq!(bare, PathBuf::from("template.FILLED-20240309-140507"));
    }

    #[test]
    fn test_safe_project_name() {
        assert_eq!(safe_project_name("Acme Portal: Phase 2/3"), "Acme_Portal_Phase_23");
        assert_eq!(safe_project_name("  spaced-out_name  "), "spaced-out_name");
        assert_eq!(safe_project_name("***"), "estimation");
        assert_eq!(safe_project_name(""), "estimation");
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(
            download_file_name("Acme Portal", fixed_time()),
            "Acme_Portal_FILLED_20240309_140507.xlsx"
        );
    }

    #[test]
    fn test_populate_bytes_uses_default_template() {
        let env = envelope(json!({
            "rows": [
                {"module": "Auth", "feature": "Login", "hours": {"general": 4}},
                {"module": "Billing", "feature": "Invoices"}
            ]
        }));

        let (bytes, report) = populate_bytes(None, &env).unwrap();
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.header_row, 1);
        assert_eq!(report.start_row, 2);

        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true).unwrap();
        let ws = book.get_sheet_by_name(TARGET_SHEET).unwrap();
        assert_eq!(ws.cell(2, 2), CellContent::Value("Auth".to_string()));
        assert_eq!(ws.cell(3, 4), CellContent::Value("Invoices".to_string()));
    }

    #[test]
    fn test_missing_sheet_lists_available_sheets() {
        let mut book = umya_spreadsheet::new_file();
        let err = populate_workbook(&mut book, &envelope(json!({"rows": [{}]}))).unwrap_err();
        match err {
            EstimateError::SheetNotFound { expected, available } => {
                assert_eq!(expected, "Estimation");
                assert_eq!(available, vec!["Sheet1".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_existing_template() {
        let temp_dir = TempDir::new().unwrap();
        let json = temp_dir.path().join("rows.json");
        std::fs::write(&json, r#"{"rows": []}"#).unwrap();

        let err = TemplatePopulator::new(json, temp_dir.path().join("missing.xlsx"))
            .run()
            .unwrap_err();
        assert!(matches!(err, EstimateError::InputNotFound(_)));
    }

    #[test]
    fn test_invalid_envelope_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("template.xlsx");
        crate::excel::template::write_default_template(&template).unwrap();
        let json = temp_dir.path().join("rows.json");
        std::fs::write(&json, r#"{"project": {"name": "X"}}"#).unwrap();
        let output = temp_dir.path().join("out.xlsx");

        let err = TemplatePopulator::new(json, template)
            .with_output(output.clone())
            .run()
            .unwrap_err();

        assert!(matches!(err, EstimateError::InvalidEnvelope(_)));
        assert!(!output.exists());
    }

    fn fill_job(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
        let template = temp_dir.path().join("template.xlsx");
        crate::excel::template::write_default_template(&template).unwrap();
        let json = temp_dir.path().join("rows.json");
        std::fs::write(&json, r#"{"rows": [{"module": "Auth"}]}"#).unwrap();
        (json, template)
    }

    #[test]
    fn test_save_error_mapping() {
        let path = Path::new("out.xlsx");

        let locked = save_error(path, std::io::ErrorKind::PermissionDenied.into());
        assert!(matches!(locked, EstimateError::OutputLocked { ref path } if path == Path::new("out.xlsx")));

        let other = save_error(path, std::io::Error::other("disk full"));
        match other {
            EstimateError::Save { path, reason } => {
                assert_eq!(path, PathBuf::from("out.xlsx"));
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_into_read_only_directory_is_output_locked() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let (json, template) = fill_job(&temp_dir);
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // privileged users write through permission bits
        let writable = std::fs::write(locked.join("access_check"), b"").is_ok();

        let result = TemplatePopulator::new(json, template)
            .with_output(locked.join("out.xlsx"))
            .run();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if writable {
            assert!(result.is_ok());
            return;
        }
        match result {
            Err(EstimateError::OutputLocked { path }) => assert_eq!(path, locked.join("out.xlsx")),
            other => panic!("expected OutputLocked, got {:?}", other),
        }
        assert!(!locked.join("out.xlsx").exists());
    }

    #[test]
    fn test_run_into_missing_directory_is_save_error() {
        let temp_dir = TempDir::new().unwrap();
        let (json, template) = fill_job(&temp_dir);
        let output = temp_dir.path().join("no-such-dir").join("out.xlsx");

        let err = TemplatePopulator::new(json, template)
            .with_output(output.clone())
            .run()
            .unwrap_err();
        match err {
            EstimateError::Save { path, .. } => assert_eq!(path, output),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_read_template_missing_file() {
        let err = read_template(Path::new("/nonexistent/template.xlsx")).unwrap_err();
        assert!(matches!(err, EstimateError::InputNotFound(_)));
    }
}
