use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

//==============================================================================
// Payload Values
//==============================================================================

/// A JSON payload value, decided once at parse time.
///
/// Row records arrive with unpredictable shapes, so every field is carried as
/// one of these variants and the sanitizer matches over all of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    /// Object entries in document order
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, FieldValue::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for totals; text is parsed, everything else is ignored
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) if f.is_finite() => Some(*f),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "string",
            FieldValue::List(_) => "array",
            FieldValue::Map(_) => "object",
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else {
                    // u64 above i64::MAX and every non-integer land here
                    match n.as_f64().filter(|f| f.is_finite()) {
                        Some(f) => FieldValue::Float(f),
                        // beyond f64 range: keep the literal
                        None => FieldValue::Text(n.to_string()),
                    }
                }
            }
            serde_json::Value::String(s) => FieldValue::Text(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

//==============================================================================
// Cell Scalars
//==============================================================================

/// A value a spreadsheet cell can hold
#[derive(Debug, Clone, PartialEq)]
pub enum CellScalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellScalar {
    pub fn is_null(&self) -> bool {
        matches!(self, CellScalar::Null)
    }
}

impl fmt::Display for CellScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellScalar::Null => Ok(()),
            CellScalar::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellScalar::Int(i) => write!(f, "{}", i),
            CellScalar::Float(x) => write!(f, "{}", x),
            CellScalar::Text(s) => write!(f, "{}", s),
        }
    }
}

//==============================================================================
// Field Keys
//==============================================================================

/// Semantic columns of the `Estimation` sheet, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Platform,
    Module,
    Component,
    Feature,
    MakeOrReuse,
    Complexity,
    PreviousProjectName,
    PreviousActualDays,
    UiDesign,
    UiModule,
    BackendLogic,
    General,
    ServiceApi,
    DbStructure,
    DbProgramming,
    DbUdf,
    NumComponents,
}

impl FieldKey {
    pub const ALL: [FieldKey; 17] = [
        FieldKey::Platform,
        FieldKey::Module,
        FieldKey::Component,
        FieldKey::Feature,
        FieldKey::MakeOrReuse,
        FieldKey::Complexity,
        FieldKey::PreviousProjectName,
        FieldKey::PreviousActualDays,
        FieldKey::UiDesign,
        FieldKey::UiModule,
        FieldKey::BackendLogic,
        FieldKey::General,
        FieldKey::ServiceApi,
        FieldKey::DbStructure,
        FieldKey::DbProgramming,
        FieldKey::DbUdf,
        FieldKey::NumComponents,
    ];

    /// The eight hour buckets, paired with their name inside `hours`
    pub const HOURS: [(FieldKey, &'static str); 8] = [
        (FieldKey::UiDesign, "ui_design"),
        (FieldKey::UiModule, "ui_module"),
        (FieldKey::BackendLogic, "backend_logic"),
        (FieldKey::General, "general"),
        (FieldKey::ServiceApi, "service_api"),
        (FieldKey::DbStructure, "db_structure"),
        (FieldKey::DbProgramming, "db_programming"),
        (FieldKey::DbUdf, "db_udf"),
    ];

    /// Dotted key as it appears in a flattened row
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Platform => "platform",
            FieldKey::Module => "module",
            FieldKey::Component => "component",
            FieldKey::Feature => "feature",
            FieldKey::MakeOrReuse => "make_or_reuse",
            FieldKey::Complexity => "complexity",
            FieldKey::PreviousProjectName => "previous_project_actual.project_name",
            FieldKey::PreviousActualDays => "previous_project_actual.actual_working_days",
            FieldKey::UiDesign => "hours.ui_design",
            FieldKey::UiModule => "hours.ui_module",
            FieldKey::BackendLogic => "hours.backend_logic",
            FieldKey::General => "hours.general",
            FieldKey::ServiceApi => "hours.service_api",
            FieldKey::DbStructure => "hours.db_structure",
            FieldKey::DbProgramming => "hours.db_programming",
            FieldKey::DbUdf => "hours.db_udf",
            FieldKey::NumComponents => "num_components",
        }
    }

    /// Keys whose values go through numeric coercion before sanitizing
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKey::PreviousActualDays
                | FieldKey::UiDesign
                | FieldKey::UiModule
                | FieldKey::BackendLogic
                | FieldKey::General
                | FieldKey::ServiceApi
                | FieldKey::DbStructure
                | FieldKey::DbProgramming
                | FieldKey::DbUdf
                | FieldKey::NumComponents
        )
    }

    pub fn is_hours(&self) -> bool {
        FieldKey::HOURS.iter().any(|(k, _)| k == self)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

//==============================================================================
// Estimation Enums
//==============================================================================

/// Complexity of a line item; unknown labels are kept as given
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Complexity {
    Simple,
    Average,
    Complex,
    Other(String),
}

impl Complexity {
    pub fn parse(label: &str) -> Self {
        match label {
            "Simple" => Complexity::Simple,
            "Average" => Complexity::Average,
            "Complex" => Complexity::Complex,
            other => Complexity::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Complexity::Simple => "Simple",
            Complexity::Average => "Average",
            Complexity::Complex => "Complex",
            Complexity::Other(s) => s,
        }
    }
}

/// Whether a line item is built or reused; unknown labels are kept as given
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MakeOrReuse {
    Make,
    Reuse,
    Other(String),
}

impl MakeOrReuse {
    pub fn parse(label: &str) -> Self {
        match label {
            "Make" => MakeOrReuse::Make,
            "Reuse" => MakeOrReuse::Reuse,
            other => MakeOrReuse::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            MakeOrReuse::Make => "Make",
            MakeOrReuse::Reuse => "Reuse",
            MakeOrReuse::Other(s) => s,
        }
    }
}
