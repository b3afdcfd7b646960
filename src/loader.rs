use crate::errors::{ReportError, Result};
use crate::types::{Cell, Table};
use crate::util::parse_timestamp_str;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// Exports carry one banner row above the real header.
pub const BANNER_ROWS: usize = 1;

/// One uploaded spreadsheet: a display name (used for format detection and
/// error messages) and its raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, data })
    }

    fn is_csv(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".csv")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub rows: usize,
    pub columns: usize,
}

/// Parse every upload and stack them into one table.
///
/// Returns `Ok(None)` when there is nothing to load, so the caller can show a
/// "no data" message instead of an error.
pub fn load_uploads(uploads: &[Upload]) -> Result<Option<(Table, LoadReport)>> {
    if uploads.is_empty() {
        return Ok(None);
    }
    let mut tables = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let table = if upload.is_csv() {
            read_csv(upload)?
        } else {
            read_workbook(upload)?
        };
        info!(
            "Loaded '{}': {} rows, {} columns",
            upload.name,
            table.len(),
            table.columns.len()
        );
        tables.push(table);
    }
    let combined = concat(tables);
    let report = LoadReport {
        files: uploads.len(),
        rows: combined.len(),
        columns: combined.columns.len(),
    };
    Ok(Some((combined, report)))
}

/// First worksheet of any workbook format calamine recognizes.
fn read_workbook(upload: &Upload) -> Result<Table> {
    let workbook_err = |source: calamine::Error| ReportError::Workbook {
        name: upload.name.clone(),
        source,
    };
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(upload.data.as_slice())).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| empty_input(upload, "workbook has no worksheets"))?
        .map_err(workbook_err)?;

    // The used range starts at the first non-empty cell, so blank rows above
    // it already count toward the banner.
    let start_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range.rows().skip(BANNER_ROWS.saturating_sub(start_row));

    let header = rows
        .next()
        .ok_or_else(|| empty_input(upload, "no header row after the banner"))?;
    let mut table = Table::new(header_names(header.iter().map(cell_from_data)));
    for row in rows {
        table.push_row(row.iter().map(cell_from_data).collect());
    }
    debug!("'{}': used range starts at row {}", upload.name, start_row);
    Ok(table)
}

fn read_csv(upload: &Upload) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(upload.data.as_slice());
    let mut records = rdr.records().skip(BANNER_ROWS);

    let header = records
        .next()
        .ok_or_else(|| empty_input(upload, "no header row after the banner"))?
        .map_err(|source| csv_err(upload, source))?;
    let mut table = Table::new(header_names(header.iter().map(cell_from_text)));
    for record in records {
        let record = record.map_err(|source| csv_err(upload, source))?;
        table.push_row(record.iter().map(cell_from_text).collect());
    }
    Ok(table)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or_else(|| Cell::Number(dt.as_f64()), Cell::DateTime),
        Data::DateTimeIso(s) => {
            parse_timestamp_str(s).map_or_else(|| Cell::Text(s.clone()), Cell::DateTime)
        }
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn cell_from_text(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

/// Header labels: blanks become `Unnamed: <index>`, repeats get `.1`, `.2`...
fn header_names(cells: impl Iterator<Item = Cell>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell
                .to_text()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("Unnamed: {idx}"));
            let n = seen.entry(base.clone()).or_insert(0);
            let name = if *n == 0 {
                base
            } else {
                format!("{base}.{n}")
            };
            *n += 1;
            name
        })
        .collect()
}

/// Stack tables by column name. The first table's header leads; columns that
/// only later tables carry are appended, and missing cells stay empty.
fn concat(tables: Vec<Table>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for col in &table.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
    }
    let mut combined = Table::new(columns);
    for table in tables {
        let positions: Vec<usize> = table
            .columns
            .iter()
            .filter_map(|c| combined.column_index(c))
            .collect();
        for row in table.rows {
            let mut aligned = vec![Cell::Empty; combined.columns.len()];
            for (pos, cell) in positions.iter().zip(row) {
                aligned[*pos] = cell;
            }
            combined.rows.push(aligned);
        }
    }
    combined
}

fn empty_input(upload: &Upload, reason: &str) -> ReportError {
    ReportError::EmptyInput {
        name: upload.name.clone(),
        reason: reason.to_string(),
    }
}

fn csv_err(upload: &Upload, source: csv::Error) -> ReportError {
    ReportError::Csv {
        name: upload.name.clone(),
        source,
    }
}
