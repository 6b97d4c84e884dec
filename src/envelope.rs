//! Estimation envelope - the JSON payload handed to every command
//!
//! Only the `rows` array is mandatory. Project metadata is read leniently:
//! anything missing or malformed falls back to its default so a sloppy
//! payload can still be exported.

use crate::error::{EstimateError, EstimateResult};
use crate::types::{Complexity, FieldKey, FieldValue, MakeOrReuse};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimator {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub name: String,
    pub client: Option<String>,
    pub estimator: Option<Estimator>,
    pub hours_per_day: f64,
    pub working_days_per_month: f64,
    pub contingency_pct: f64,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            name: "Unknown Project".to_string(),
            client: None,
            estimator: None,
            hours_per_day: 8.0,
            working_days_per_month: 18.0,
            contingency_pct: 0.1,
        }
    }
}

/// A validated payload
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub schema_version: String,
    pub project: ProjectInfo,
    pub rows: Vec<FieldValue>,
    /// Free-form notes from the payload's `summary` block
    pub notes: Vec<String>,
}

impl Envelope {
    /// Validate the payload shape; only `rows` is mandatory
    pub fn from_value(value: serde_json::Value) -> EstimateResult<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(EstimateError::InvalidEnvelope(
                "JSON must be an object containing a 'rows' key".to_string(),
            ));
        };

        let rows = match map.remove("rows") {
            None => {
                return Err(EstimateError::InvalidEnvelope(
                    "JSON must contain a 'rows' key".to_string(),
                ))
            }
            Some(serde_json::Value::Array(items)) => {
                items.into_iter().map(FieldValue::from).collect()
            }
            Some(_) => {
                return Err(EstimateError::InvalidEnvelope(
                    "JSON 'rows' must be an array".to_string(),
                ))
            }
        };

        let project = match map.remove("project") {
            Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring malformed 'project' block");
                ProjectInfo::default()
            }),
            None => ProjectInfo::default(),
        };

        let schema_version = map
            .get("schema_version")
            .and_then(|v| v.as_str())
            .unwrap_or("1.0")
            .to_string();

        let notes = map
            .get("summary")
            .and_then(|s| s.get("notes"))
            .and_then(|n| n.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            schema_version,
            project,
            rows,
            notes,
        })
    }

    pub fn from_json_str(json: &str) -> EstimateResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Read and validate an envelope file
    pub fn load(path: &Path) -> EstimateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EstimateError::InputNotFound(path.to_path_buf()),
            _ => EstimateError::Io(e),
        })?;
        Self::from_json_str(&content)
    }

    /// Client name, falling back to the project name
    pub fn client(&self) -> &str {
        self.project
            .client
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.project.name)
    }
}

/// Deterministic id of a row: SHA-1 over its trimmed, lowercased identity fields
pub fn compute_row_id(row: &FieldValue) -> String {
    let raw = ["platform", "module", "component", "feature"]
        .iter()
        .map(|k| identity_part(row.get(k)))
        .collect::<Vec<_>>()
        .join("|");
    hex::encode(Sha1::digest(raw.as_bytes()))
}

fn identity_part(value: Option<&FieldValue>) -> String {
    match value {
        None | Some(FieldValue::Null) => String::new(),
        Some(v) => v.to_string().trim().to_lowercase(),
    }
}

/// The row's own `row_id` when it carries one, otherwise the computed id
pub fn row_id(row: &FieldValue) -> String {
    match row.get("row_id").and_then(FieldValue::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => compute_row_id(row),
    }
}

/// Sum of the eight hour buckets; non-numeric entries count as zero
pub fn row_hours(row: &FieldValue) -> f64 {
    let Some(hours) = row.get("hours").filter(|h| h.is_map()) else {
        return row
            .get("total_hours")
            .and_then(FieldValue::as_f64)
            .unwrap_or(0.0);
    };
    FieldKey::HOURS
        .iter()
        .filter_map(|(_, bucket)| hours.get(bucket).and_then(FieldValue::as_f64))
        .sum()
}

/// One line of the flat feature list used by the export workbook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureLine {
    pub row_id: String,
    pub title: String,
    pub hours: f64,
    pub complexity: Option<String>,
    pub priority: Option<FieldValue>,
}

impl FeatureLine {
    pub fn from_row(row: &FieldValue) -> Self {
        let part = |k: &str| {
            row.get(k)
                .and_then(FieldValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let parts: Vec<String> = ["module", "component", "feature"]
            .iter()
            .map(|k| part(*k))
            .filter(|p| !p.is_empty())
            .collect();
        let title = if parts.is_empty() {
            "Feature".to_string()
        } else {
            parts.join(" - ")
        };

        Self {
            row_id: row_id(row),
            title,
            hours: row_hours(row),
            complexity: row
                .get("complexity")
                .and_then(FieldValue::as_str)
                .map(|c| Complexity::parse(c).label().to_string()),
            priority: row.get("priority").filter(|p| !p.is_null()).cloned(),
        }
    }
}

/// Totals derived from an envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateSummary {
    pub project: String,
    pub row_count: usize,
    pub total_hours: f64,
    pub contingency_pct: f64,
    pub total_hours_with_contingency: f64,
    pub single_resource_duration_days: u64,
    pub single_resource_duration_months: f64,
    pub by_complexity: BTreeMap<String, usize>,
    pub by_make_or_reuse: BTreeMap<String, usize>,
}

impl EstimateSummary {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let project = &envelope.project;
        let rows: Vec<&FieldValue> = envelope.rows.iter().filter(|r| r.is_map()).collect();

        let total_hours: f64 = rows.iter().map(|r| row_hours(r)).sum();
        let total_with_contingency = total_hours * (1.0 + project.contingency_pct);
        let days = if project.hours_per_day > 0.0 {
            (total_with_contingency / project.hours_per_day).ceil().max(0.0) as u64
        } else {
            0
        };
        let months = if project.working_days_per_month > 0.0 {
            days as f64 / project.working_days_per_month
        } else {
            0.0
        };

        let mut by_complexity = BTreeMap::new();
        let mut by_make_or_reuse = BTreeMap::new();
        for row in &rows {
            if let Some(c) = row.get("complexity").and_then(FieldValue::as_str) {
                *by_complexity
                    .entry(Complexity::parse(c).label().to_string())
                    .or_insert(0) += 1;
            }
            if let Some(m) = row.get("make_or_reuse").and_then(FieldValue::as_str) {
                *by_make_or_reuse
                    .entry(MakeOrReuse::parse(m).label().to_string())
                    .or_insert(0) += 1;
            }
        }

        Self {
            project: project.name.clone(),
            row_count: rows.len(),
            total_hours,
            contingency_pct: project.contingency_pct,
            total_hours_with_contingency: total_with_contingency,
            single_resource_duration_days: days,
            single_resource_duration_months: months,
            by_complexity,
            by_make_or_reuse,
        }
    }
}
