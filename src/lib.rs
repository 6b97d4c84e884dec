//! Estimate Forge - Excel estimation template population
//!
//! This library fills the `Estimation` sheet of an existing Excel template
//! with the rows of a JSON estimation payload.
//!
//! # Features
//!
//! - Header-driven column discovery (case, spacing and dash tolerant)
//! - Rows appended below pre-filled template data, never overwriting it
//! - Formulas of the last pre-filled row carried into every new row
//! - Spreadsheet-safe values (control characters, cell length, NaN/∞)
//! - Default template, Features/Summary export and template inspection
//!
//! # Example
//!
//! ```no_run
//! use estimate_forge::excel::TemplatePopulator;
//! use std::path::PathBuf;
//!
//! let outcome = TemplatePopulator::new(
//!     PathBuf::from("rows.json"),
//!     PathBuf::from("Estimate.xlsx"),
//! )
//! .run()?;
//!
//! println!("Rows written: {}", outcome.report.rows_written);
//! println!("Output: {}", outcome.output.display());
//! # Ok::<(), estimate_forge::error::EstimateError>(())
//! ```

pub mod api;
pub mod cli;
pub mod envelope;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use envelope::{Envelope, EstimateSummary};
pub use error::{EstimateError, EstimateResult};
pub use excel::{FillReport, TemplatePopulator};
pub use types::{CellScalar, FieldKey, FieldValue};
