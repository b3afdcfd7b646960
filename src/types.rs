use chrono::NaiveDateTime;
use serde::Serialize;
use std::hash::{Hash, Hasher};
use tabled::Tabled;

/// A single spreadsheet cell as read from an upload.
#[derive(Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering used for free-text columns such as `teacher`.
    ///
    /// Whole numbers lose their trailing `.0` so an id typed as a number reads
    /// the same as one typed as text.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Empty, Cell::Text)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Empty, Cell::Empty) => true,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            // Bit equality keeps Eq/Hash consistent (NaN == NaN for dedup purposes).
            (Cell::Number(a), Cell::Number(b)) => a.to_bits() == b.to_bits(),
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::DateTime(a), Cell::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Empty => {}
            Cell::Text(s) => s.hash(state),
            Cell::Number(n) => n.to_bits().hash(state),
            Cell::Bool(b) => b.hash(state),
            Cell::DateTime(dt) => dt.hash(state),
        }
    }
}

/// A header row plus data rows. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Pushes a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Pads or truncates every row to the header width. Rows pushed straight
    /// onto `rows` skip `push_row`, so the pipeline calls this first.
    pub fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, Cell::Empty);
        }
    }

    /// Keeps the columns whose flag in `keep` is true, in every row.
    pub fn retain_columns(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One cleaned report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CleanRecord {
    #[serde(rename = "Teacher")]
    #[tabled(rename = "Teacher")]
    pub teacher: String,
    #[serde(rename = "Teacher Clean")]
    #[tabled(rename = "Teacher Clean")]
    pub teacher_clean: String,
    #[serde(rename = "Center")]
    #[tabled(rename = "Center")]
    pub center: String,
    #[serde(rename = "Area")]
    #[tabled(rename = "Area", display_with = "display_opt")]
    pub area: Option<String>,
    #[serde(rename = "Class Type")]
    #[tabled(rename = "Class Type")]
    pub class_type: String,
    #[serde(rename = "Date")]
    #[tabled(rename = "Date", display_with = "display_opt")]
    pub date: Option<String>,
    #[serde(rename = "Time")]
    #[tabled(rename = "Time", display_with = "display_opt")]
    pub time: Option<String>,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month", display_with = "display_opt")]
    pub month: Option<String>,
}

fn display_opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// One (Area, Teacher) row of the pivoted summary. `counts` is aligned with
/// `SummaryTable::months`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub area: String,
    pub teacher: String,
    pub counts: Vec<u64>,
}

/// Sessions per (Area, Teacher) and month, most recent month first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTable {
    pub months: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn count(&self, area: &str, teacher: &str, month: &str) -> Option<u64> {
        let col = self.months.iter().position(|m| m == month)?;
        self.rows
            .iter()
            .find(|r| r.area == area && r.teacher == teacher)
            .map(|r| r.counts[col])
    }
}

/// A value in an output sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetValue {
    Blank,
    Text(String),
    Count(u64),
}

impl From<&Option<String>> for SheetValue {
    fn from(value: &Option<String>) -> Self {
        value
            .as_ref()
            .map_or(SheetValue::Blank, |s| SheetValue::Text(s.clone()))
    }
}

impl From<&str> for SheetValue {
    fn from(value: &str) -> Self {
        SheetValue::Text(value.to_string())
    }
}

/// Render-ready sheet. The first `index_columns` columns form the row index
/// (only the Summary sheet has one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetValue>>,
    pub index_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct SheetRowCount {
    #[tabled(rename = "Sheet")]
    pub sheet: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

/// Counters collected while cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub rows_in: usize,
    pub empty_columns_dropped: usize,
    pub blank_rows_dropped: usize,
    pub duplicates_removed: usize,
    pub unparsed_dates: usize,
    pub unmapped_rows: usize,
    pub rows_out: usize,
}

/// The finished report: summary, one bucket per report area, the unmapped
/// bucket and the full cleaned table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBundle {
    pub summary: SummaryTable,
    pub areas: Vec<(String, Vec<CleanRecord>)>,
    pub unmapped: Vec<CleanRecord>,
    pub raw: Vec<CleanRecord>,
    pub stats: ReportStats,
}

pub const SUMMARY_SHEET: &str = "Summary";
pub const UNMAPPED_SHEET: &str = "Unmapped";
pub const RAW_SHEET: &str = "Raw Data";

/// Display headers of a cleaned record, in output order.
pub const RECORD_HEADERS: [&str; 8] = [
    "Teacher",
    "Teacher Clean",
    "Center",
    "Area",
    "Class Type",
    "Date",
    "Time",
    "Month",
];

impl ReportBundle {
    pub fn sheet_names(&self) -> Vec<String> {
        let mut names = vec![SUMMARY_SHEET.to_string()];
        names.extend(self.areas.iter().map(|(area, _)| area.clone()));
        names.push(UNMAPPED_SHEET.to_string());
        names.push(RAW_SHEET.to_string());
        names
    }

    /// All output sheets in workbook order.
    pub fn sheets(&self) -> Vec<(String, SheetTable)> {
        let mut out = vec![(SUMMARY_SHEET.to_string(), summary_sheet(&self.summary))];
        for (area, records) in &self.areas {
            out.push((area.clone(), record_sheet(records, false)));
        }
        out.push((UNMAPPED_SHEET.to_string(), record_sheet(&self.unmapped, true)));
        out.push((RAW_SHEET.to_string(), record_sheet(&self.raw, true)));
        out
    }

    pub fn sheet(&self, name: &str) -> Option<SheetTable> {
        self.sheets()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, sheet)| sheet)
    }

    /// Records behind a record sheet (anything except Summary).
    pub fn records(&self, name: &str) -> Option<&[CleanRecord]> {
        match name {
            UNMAPPED_SHEET => Some(&self.unmapped),
            RAW_SHEET => Some(&self.raw),
            _ => self
                .areas
                .iter()
                .find(|(area, _)| area == name)
                .map(|(_, records)| records.as_slice()),
        }
    }

    /// Row count per sheet, in workbook order.
    pub fn row_counts(&self) -> Vec<SheetRowCount> {
        self.sheets()
            .into_iter()
            .map(|(sheet, table)| SheetRowCount {
                sheet,
                rows: table.rows.len(),
            })
            .collect()
    }
}

fn summary_sheet(summary: &SummaryTable) -> SheetTable {
    let mut headers = vec!["Area".to_string(), "Teacher".to_string()];
    headers.extend(summary.months.iter().cloned());
    let rows = summary
        .rows
        .iter()
        .map(|r| {
            let mut row = vec![
                SheetValue::Text(r.area.clone()),
                SheetValue::Text(r.teacher.clone()),
            ];
            row.extend(r.counts.iter().map(|c| SheetValue::Count(*c)));
            row
        })
        .collect();
    SheetTable {
        headers,
        rows,
        index_columns: 2,
    }
}

fn record_sheet(records: &[CleanRecord], with_month: bool) -> SheetTable {
    let width = if with_month {
        RECORD_HEADERS.len()
    } else {
        RECORD_HEADERS.len() - 1
    };
    let headers = RECORD_HEADERS[..width].iter().map(|h| h.to_string()).collect();
    let rows = records
        .iter()
        .map(|r| {
            let mut row = vec![
                SheetValue::from(r.teacher.as_str()),
                SheetValue::from(r.teacher_clean.as_str()),
                SheetValue::from(r.center.as_str()),
                SheetValue::from(&r.area),
                SheetValue::from(r.class_type.as_str()),
                SheetValue::from(&r.date),
                SheetValue::from(&r.time),
            ];
            if with_month {
                row.push(SheetValue::from(&r.month));
            }
            row
        })
        .collect();
    SheetTable {
        headers,
        rows,
        index_columns: 0,
    }
}
