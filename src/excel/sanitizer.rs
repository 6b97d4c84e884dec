//! Value sanitizer - payload values → spreadsheet-safe scalars
//!
//! Every function here is total: whatever shape a payload value has, the
//! result is something a cell can store.

use crate::types::{CellScalar, FieldValue};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Maximum number of characters a single cell may hold
pub const MAX_CELL_CHARS: usize = 32_767;

/// Separator used when a list of strings is written into one cell
pub const LIST_SEPARATOR: &str = " | ";

/// Coerce a payload value into a writable scalar
pub fn sanitize(value: &FieldValue) -> CellScalar {
    match value {
        FieldValue::Null => CellScalar::Null,
        FieldValue::Bool(b) => CellScalar::Bool(*b),
        FieldValue::Int(i) => CellScalar::Int(*i),
        FieldValue::Float(f) => sanitize_float(*f),
        FieldValue::Text(s) => CellScalar::Text(clean_text(s)),
        FieldValue::List(items) => {
            let strings: Option<Vec<&str>> = items.iter().map(FieldValue::as_str).collect();
            match strings {
                Some(parts) => CellScalar::Text(clean_text(&parts.join(LIST_SEPARATOR))),
                None => CellScalar::Text(clean_text(&to_spaced_json(value))),
            }
        }
        FieldValue::Map(_) => CellScalar::Text(clean_text(&to_spaced_json(value))),
    }
}

/// NaN and infinities have no cell representation
pub fn sanitize_float(f: f64) -> CellScalar {
    if f.is_finite() {
        CellScalar::Float(f)
    } else {
        CellScalar::Null
    }
}

/// Parse a value as a finite number, or `None`
pub fn safe_numeric_convert(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        FieldValue::Int(i) => Some(*i as f64),
        FieldValue::Float(f) => Some(*f).filter(|f| f.is_finite()),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Drop control characters a cell cannot hold and cap the length
pub fn clean_text(s: &str) -> String {
    s.chars()
        .filter(|c| !is_forbidden_char(*c))
        .take(MAX_CELL_CHARS)
        .collect()
}

fn is_forbidden_char(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{7F}'..='\u{9F}'
    )
}

/// JSON with `", "` and `": "` separators, non-ASCII kept verbatim
fn to_spaced_json(value: &FieldValue) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
