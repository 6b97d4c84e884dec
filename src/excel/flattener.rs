//! Row flattener - nested row records → dotted field keys

use crate::types::{FieldKey, FieldValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One row in the flat field-key space
pub type FlatRow = BTreeMap<FieldKey, FieldValue>;

/// Why a row could not be written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The `rows` entry is not a JSON object
    NotAnObject { found: &'static str },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAnObject { found } => {
                write!(f, "row must be an object, found {}", found)
            }
        }
    }
}

/// Fields copied through unchanged when present
const SCALAR_FIELDS: [(&str, FieldKey); 7] = [
    ("platform", FieldKey::Platform),
    ("module", FieldKey::Module),
    ("component", FieldKey::Component),
    ("feature", FieldKey::Feature),
    ("make_or_reuse", FieldKey::MakeOrReuse),
    ("complexity", FieldKey::Complexity),
    ("num_components", FieldKey::NumComponents),
];

/// Flatten a row record.
///
/// Hour buckets are never null (0 when missing or null) because sheet formulas
/// sum them; the previous-project pair is always present, null when unknown.
pub fn flatten(row: &FieldValue) -> Result<FlatRow, SkipReason> {
    if !row.is_map() {
        return Err(SkipReason::NotAnObject {
            found: row.type_name(),
        });
    }

    let mut out = FlatRow::new();

    for (name, key) in SCALAR_FIELDS {
        if let Some(value) = row.get(name) {
            out.insert(key, value.clone());
        }
    }

    match row.get("previous_project_actual") {
        Some(ppa @ FieldValue::Map(_)) => {
            out.insert(
                FieldKey::PreviousProjectName,
                ppa.get("project_name").cloned().unwrap_or(FieldValue::Null),
            );
            out.insert(
                FieldKey::PreviousActualDays,
                ppa.get("actual_working_days")
                    .cloned()
                    .unwrap_or(FieldValue::Null),
            );
        }
        _ => {
            out.insert(FieldKey::PreviousProjectName, FieldValue::Null);
            out.insert(FieldKey::PreviousActualDays, FieldValue::Null);
        }
    }

    let hours = row.get("hours");
    for (key, bucket) in FieldKey::HOURS {
        let value = hours
            .and_then(|h| h.get(bucket))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or(FieldValue::Int(0));
        out.insert(key, value);
    }

    Ok(out)
}
