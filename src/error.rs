use std::path::PathBuf;
use thiserror::Error;

pub type EstimateResult<T> = Result<T, EstimateError>;

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Could not load workbook {}: {reason}", .path.display())]
    Workbook { path: PathBuf, reason: String },

    #[error("Sheet '{expected}' not found. Available sheets: [{}]", .available.join(", "))]
    SheetNotFound {
        expected: String,
        available: Vec<String>,
    },

    #[error("Could not locate any known estimation column in '{sheet}'. Found headers: [{}]", .found.join(", "))]
    NoRecognizedColumns { sheet: String, found: Vec<String> },

    #[error("Cannot write to {}. File may be open in Excel or you lack permissions.", .path.display())]
    OutputLocked { path: PathBuf },

    #[error("Could not save workbook to {}: {reason}", .path.display())]
    Save { path: PathBuf, reason: String },

    #[error("Export error: {0}")]
    Export(String),
}

impl EstimateError {
    /// Whether the error comes from the caller's payload or template rather than the host.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EstimateError::InputNotFound(_)
                | EstimateError::Json(_)
                | EstimateError::InvalidEnvelope(_)
                | EstimateError::Workbook { .. }
                | EstimateError::SheetNotFound { .. }
                | EstimateError::NoRecognizedColumns { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_not_found_lists_available_sheets() {
        let err = EstimateError::SheetNotFound {
            expected: "Estimation".to_string(),
            available: vec!["Sheet1".to_string(), "Summary".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Sheet 'Estimation' not found. Available sheets: [Sheet1, Summary]"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn test_output_locked_message() {
        let err = EstimateError::OutputLocked {
            path: PathBuf::from("out.xlsx"),
        };
        assert!(err.to_string().contains("File may be open in Excel"));
        assert!(!err.is_input_error());
    }
}
