// Utility helpers for parsing and text cleanup.
//
// This module centralizes all the "dirty" cell/text/date handling so the
// pipeline can assume clean, typed values.
use crate::types::Cell;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static CENTER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*?)\)").unwrap());
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*?\)").unwrap());

// Text layouts tried in order. Month-first wins over day-first when both match.
const DATETIME_FORMATS: [&str; 13] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d %b %Y", "%d-%m-%Y",
];

/// Header normalization: trim, lower-case, spaces to underscores.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Display name for a field id, e.g. `teacher_clean` -> `Teacher Clean`.
pub fn display_header(field: &str) -> String {
    title_case(&field.replace('_', " ")).trim().to_string()
}

/// Title-case the way spreadsheet users expect: every run of letters starts
/// upper-case and continues lower-case. Non-letters (spaces, apostrophes,
/// digits, parentheses) all start a new run.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Text of the first parenthesized group, or `""` when there is none.
pub fn extract_center(teacher: &str) -> String {
    CENTER_TAG
        .captures(teacher)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Title-cased teacher name with every parenthesized segment (and the
/// whitespace before it) removed.
pub fn clean_teacher(teacher: &str) -> String {
    PARENTHETICAL.replace_all(&title_case(teacher), "").into_owned()
}

// Serial of 9999-12-31, the last day Excel can represent.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Excel serial date (1900 system) to a timestamp, rounded to the second.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::seconds(seconds))
}

/// Best-effort timestamp parse of a `date` cell. `None` means "unparseable",
/// which callers turn into null derived fields rather than an error.
pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(n) => excel_serial_to_datetime(*n),
        Cell::Text(s) => parse_timestamp_str(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

pub fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("  Class Type "), "class_type");
        assert_eq!(normalize_header("Level / Unit"), "level_/_unit");
        assert_eq!(normalize_header("DATE"), "date");
    }

    #[test]
    fn display_headers_for_record_fields() {
        assert_eq!(display_header("teacher_clean"), "Teacher Clean");
        assert_eq!(display_header("class_type"), "Class Type");
        assert_eq!(display_header("month_"), "Month");
    }

    #[test]
    fn title_case_matches_spreadsheet_convention() {
        assert_eq!(title_case("jane DOE"), "Jane Doe");
        assert_eq!(title_case("o'neil mc-grath"), "O'Neil Mc-Grath");
        assert_eq!(title_case("jane doe (gc)"), "Jane Doe (Gc)");
        assert_eq!(title_case("class 2b"), "Class 2B");
    }

    #[test]
    fn extracts_center_from_first_group() {
        assert_eq!(extract_center("Jane Doe (GC)"), "GC");
        assert_eq!(extract_center("Jane (Online Center) Doe (PP)"), "Online Center");
        assert_eq!(extract_center("John Smith"), "");
        assert_eq!(extract_center("Broken (GC"), "");
    }

    #[test]
    fn cleans_teacher_names() {
        assert_eq!(clean_teacher("Jane Doe (GC)"), "Jane Doe");
        assert_eq!(clean_teacher("jane doe   (gc)"), "Jane Doe");
        assert_eq!(clean_teacher("JOHN SMITH"), "John Smith");
        assert_eq!(clean_teacher("A (x) B (y)"), "A B");
    }

    #[test]
    fn parses_text_timestamps() {
        let dt = parse_timestamp_str("2025-01-15 10:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 1, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 30, 0));

        let dt = parse_timestamp_str("15/01/2025 08:05").unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour()), (1, 15, 8));

        let dt = parse_timestamp_str("2025-02-03").unwrap();
        assert_eq!((dt.month(), dt.hour()), (2, 0));

        assert!(parse_timestamp_str("not a date").is_none());
        assert!(parse_timestamp_str("   ").is_none());
    }

    #[test]
    fn slash_dates_read_month_first() {
        let dt = parse_timestamp_str("01/02/2025 10:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-01-02");

        // Only a day-first reading is valid here.
        let dt = parse_timestamp_str("13/02/2025 10:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-02-13");

        let dt = parse_timestamp_str("03/04/2025").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-03-04");
    }

    #[test]
    fn parses_cells() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp(&Cell::DateTime(dt)), Some(dt));
        assert_eq!(parse_timestamp(&Cell::Empty), None);
        assert_eq!(parse_timestamp(&Cell::Bool(true)), None);
    }

    #[test]
    fn converts_excel_serials() {
        // 45658 is 2025-01-01 in the 1900 date system.
        let dt = excel_serial_to_datetime(45658.5).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-01 12:00:00");
        assert!(excel_serial_to_datetime(-1.0).is_none());
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn formats_counts() {
        assert_eq!(format_int(9855usize), "9,855");
    }
}
