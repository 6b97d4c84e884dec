//! Header locator - human-readable column titles → semantic field keys
//!
//! Templates are edited by people, so titles drift in case, spacing and dash
//! style. Every title is normalized before it is compared against the fixed
//! dictionary below.

use super::sheet::SheetRead;
use crate::types::FieldKey;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

/// Rows scanned for header titles
pub const HEADER_SCAN_ROWS: u32 = 20;
/// Columns scanned for header titles
pub const HEADER_SCAN_COLUMNS: u32 = 200;
/// Rows searched for the anchoring header row
const HEADER_ROW_SEARCH_ROWS: u32 = 30;
const HEADER_ROW_SEARCH_COLUMNS: u32 = 50;
const FALLBACK_SEARCH_ROWS: u32 = 10;
const FALLBACK_SEARCH_COLUMNS: u32 = 20;

/// Canonical header titles of the `Estimation` sheet
pub const HEADER_DICTIONARY: [(&str, FieldKey); 17] = [
    ("Platform (Desktop / Web / Mobile)", FieldKey::Platform),
    ("Module", FieldKey::Module),
    ("Component", FieldKey::Component),
    ("Features", FieldKey::Feature),
    ("Make/ Reuse", FieldKey::MakeOrReuse),
    ("Complexity (Simple / Complex / Average)", FieldKey::Complexity),
    ("Project Name", FieldKey::PreviousProjectName),
    ("Actual (working day)", FieldKey::PreviousActualDays),
    ("UI Design", FieldKey::UiDesign),
    ("UI Module", FieldKey::UiModule),
    ("BL", FieldKey::BackendLogic),
    ("General", FieldKey::General),
    ("Service/ API", FieldKey::ServiceApi),
    ("DB Struct.", FieldKey::DbStructure),
    ("DB Prog.", FieldKey::DbProgramming),
    ("DB - UDF", FieldKey::DbUdf),
    ("# Comp.", FieldKey::NumComponents),
];

/// Titles that together identify the header row
const HEADER_ROW_MARKERS: [&str; 3] = ["module", "features", "platform (desktop / web / mobile)"];

/// Normalized header text → 1-based column index
pub type HeaderMap = HashMap<String, u32>;

/// Field key → 1-based column index
pub type ColumnMap = BTreeMap<FieldKey, u32>;

struct Patterns {
    dashes: Regex,
    disallowed: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        dashes: Regex::new(r"[\-\u{2010}-\u{2015}\u{2212}]+").unwrap(),
        disallowed: Regex::new(r"[^a-z0-9#/.\-()\s]+").unwrap(),
        whitespace: Regex::new(r"\s+").unwrap(),
    })
}

/// Normalized dictionary, built once per process
fn dictionary() -> &'static HashMap<String, FieldKey> {
    static DICTIONARY: OnceLock<HashMap<String, FieldKey>> = OnceLock::new();
    DICTIONARY.get_or_init(|| {
        HEADER_DICTIONARY
            .iter()
            .map(|(title, key)| (normalize_header_text(title), *key))
            .collect()
    })
}

/// Lowercase, unify dashes, drop punctuation outside `#/.-()`, collapse spaces
pub fn normalize_header_text(s: &str) -> String {
    let p = patterns();
    let lowered = s.to_lowercase().replace(['\r', '\n'], " ");
    let dashed = p.dashes.replace_all(&lowered, "-");
    let stripped = p.disallowed.replace_all(&dashed, "");
    // stripping can leave dashes adjacent again
    let rejoined = p.dashes.replace_all(&stripped, "-");
    let collapsed = p.whitespace.replace_all(&rejoined, " ");
    collapsed.trim().to_string()
}

/// Map every normalized title in the top-left block of the sheet to its column.
///
/// Scans row-major; the first occurrence of a title wins.
pub fn scan_headers<S: SheetRead + ?Sized>(sheet: &S, max_rows: u32) -> HeaderMap {
    let (height, width) = sheet.dimensions();
    let max_row = max_rows.min(height);
    let max_col = HEADER_SCAN_COLUMNS.min(width);

    let mut headers = HeaderMap::new();
    for row in 1..=max_row {
        for col in 1..=max_col {
            let content = sheet.cell(row, col);
            let Some(text) = content.text() else {
                continue;
            };
            let key = normalize_header_text(text);
            if !key.is_empty() {
                headers.entry(key).or_insert(col);
            }
        }
    }
    headers
}

/// Intersect the scanned titles with the header dictionary
pub fn locate_columns<S: SheetRead + ?Sized>(sheet: &S) -> ColumnMap {
    let scan = scan_headers(sheet, HEADER_SCAN_ROWS);
    columns_from_headers(&scan)
}

pub fn columns_from_headers(scan: &HeaderMap) -> ColumnMap {
    dictionary()
        .iter()
        .filter_map(|(title, key)| scan.get(title).map(|col| (*key, *col)))
        .collect()
}

/// Find the row holding the column titles.
///
/// Prefers a row carrying the module, features and platform titles, then the
/// first non-blank row near the top, then row 1.
pub fn find_header_row<S: SheetRead + ?Sized>(sheet: &S) -> u32 {
    let (height, width) = sheet.dimensions();

    for row in 1..=HEADER_ROW_SEARCH_ROWS.min(height) {
        let seen: HashSet<String> = (1..=HEADER_ROW_SEARCH_COLUMNS.min(width))
            .filter_map(|col| sheet.cell(row, col).text().map(normalize_header_text))
            .collect();
        if HEADER_ROW_MARKERS.iter().all(|m| seen.contains(*m)) {
            return row;
        }
    }

    for row in 1..=FALLBACK_SEARCH_ROWS.min(height) {
        let has_content = (1..=FALLBACK_SEARCH_COLUMNS.min(width))
            .any(|col| !sheet.cell(row, col).is_empty());
        if has_content {
            return row;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::sheet::SheetWrite;
    use umya_spreadsheet::{Spreadsheet, Worksheet};

    fn book_with_sheet() -> Spreadsheet {
        let mut book = umya_spreadsheet::new_file();
        book.new_sheet("Estimation").unwrap();
        book
    }

    fn sheet(book: &mut Spreadsheet) -> &mut Worksheet {
        book.get_sheet_by_name_mut("Estimation").unwrap()
    }

    fn write_headers(ws: &mut Worksheet, row: u32, titles: &[&str]) {
        for (i, title) in titles.iter().enumerate() {
            ws.write_text(row, i as u32 + 1, title).unwrap();
        }
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_header_text("  Make/ Reuse "), "make/ reuse");
        assert_eq!(normalize_header_text("make/  reuse"), "make/ reuse");
        assert_eq!(normalize_header_text("DB – UDF"), "db - udf");
        assert_eq!(normalize_header_text("DB — UDF"), "db - udf");
        assert_eq!(normalize_header_text("DB --- UDF"), "db - udf");
        assert_eq!(normalize_header_text("UI\nDesign"), "ui design");
        assert_eq!(normalize_header_text("# Comp."), "# comp.");
        assert_eq!(normalize_header_text("Total Hours*"), "total hours");
        assert_eq!(normalize_header_text("Hours ✓"), "hours");
        assert_eq!(normalize_header_text("a-✓-b"), "a-b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Platform (Desktop / Web / Mobile)",
            "  Complexity\n(Simple / Complex / Average) ",
            "DB – UDF",
            "Ünïcödé — Title!!",
            "a \t b\r\nc",
            "---",
            "",
            "   ",
            "x ✓ y",
            "a-✓-b",
            "Make – ✓ — Reuse",
        ];
        for s in samples {
            let once = normalize_header_text(s);
            assert_eq!(normalize_header_text(&once), once, "input {:?}", s);
        }
    }

    #[test]
    fn test_dictionary_has_every_field_once() {
        let dict = dictionary();
        assert_eq!(dict.len(), 17);
        for key in FieldKey::ALL {
            assert_eq!(dict.values().filter(|k| **k == key).count(), 1);
        }
    }

    #[test]
    fn test_locate_columns_tolerates_spacing_and_case() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        write_headers(ws, 1, &["MODULE", "make/  reuse", "db – udf", "Unrelated"]);

        let map = locate_columns(ws);
        assert_eq!(map.get(&FieldKey::Module), Some(&1));
        assert_eq!(map.get(&FieldKey::MakeOrReuse), Some(&2));
        assert_eq!(map.get(&FieldKey::DbUdf), Some(&3));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        write_headers(ws, 1, &["Title", "General"]);
        write_headers(ws, 2, &["General", "BL"]);

        let scan = scan_headers(ws, HEADER_SCAN_ROWS);
        assert_eq!(scan.get("general"), Some(&2));
        assert_eq!(scan.get("bl"), Some(&2));
    }

    #[test]
    fn test_scan_is_bounded_to_first_rows() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        ws.write_text(HEADER_SCAN_ROWS + 1, 1, "Module").unwrap();

        assert!(locate_columns(ws).is_empty());
        assert!(scan_headers(ws, HEADER_SCAN_ROWS + 1).contains_key("module"));
    }

    #[test]
    fn test_find_header_row_by_markers() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        ws.write_text(1, 1, "Project estimate").unwrap();
        ws.write_text(3, 2, "Summary").unwrap();
        write_headers(
            ws,
            5,
            &["Platform (Desktop / Web / Mobile)", "Module", "Component", "Features"],
        );

        assert_eq!(find_header_row(ws), 5);
    }

    #[test]
    fn test_find_header_row_falls_back_to_first_non_blank_row() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        ws.write_text(3, 4, "Module").unwrap();
        ws.write_text(6, 1, "Features").unwrap();

        assert_eq!(find_header_row(ws), 3);
    }

    #[test]
    fn test_find_header_row_defaults_to_one() {
        let mut book = book_with_sheet();
        let ws = sheet(&mut book);
        assert_eq!(find_header_row(ws), 1);

        ws.write_text(12, 1, "Module").unwrap();
        assert_eq!(find_header_row(ws), 1);
    }
}
