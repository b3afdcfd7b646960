// The report pipeline: normalize the stacked upload table, derive the
// per-session fields, then pivot and partition into output sheets.
use crate::center_map::CenterMap;
use crate::errors::{ReportError, Result};
use crate::loader::{load_uploads, Upload};
use crate::types::{
    Cell, CleanRecord, ReportBundle, ReportStats, SummaryRow, SummaryTable, Table,
};
use crate::util::{clean_teacher, extract_center, normalize_header, parse_timestamp};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Administrative columns every export carries and the report never shows.
pub const DROPPED_COLUMNS: [&str; 7] = [
    "code",
    "center_name",
    "level_/_unit",
    "last_name",
    "first_name",
    "service_type",
    "start_time",
];

/// Columns the derived fields are computed from.
pub const SOURCE_COLUMNS: [&str; 3] = ["date", "teacher", "class_type"];

/// Areas that get their own sheet, in workbook order.
pub const REPORT_AREAS: [&str; 6] = ["JKT 1", "JKT 2", "JKT 3", "BDG", "SBY", "CIK"];

const DATE_FMT: &str = "%d %b %Y";
const TIME_FMT: &str = "%H:%M:%S";
const MONTH_FMT: &str = "%Y-%m";

/// Load the uploads and run the pipeline. `Ok(None)` means no uploads.
pub fn build_report(uploads: &[Upload]) -> Result<Option<ReportBundle>> {
    let Some((table, load_report)) = load_uploads(uploads)? else {
        return Ok(None);
    };
    debug!("Stacked {} rows from {} files", load_report.rows, load_report.files);
    generate_report(table).map(Some)
}

/// Turn the stacked upload table into the finished report.
pub fn generate_report(table: Table) -> Result<ReportBundle> {
    generate_report_with(table, CenterMap::global())
}

pub fn generate_report_with(mut table: Table, centers: &CenterMap) -> Result<ReportBundle> {
    table.pad_rows();
    let mut stats = ReportStats {
        rows_in: table.len(),
        ..Default::default()
    };

    normalize_headers(&mut table);
    drop_empty(&mut table, &mut stats);
    drop_known_columns(&mut table)?;
    let records = derive_records(&table, centers, &mut stats)?;

    let summary = summarize(&records);
    let areas = REPORT_AREAS
        .iter()
        .map(|area| {
            let rows: Vec<CleanRecord> = records
                .iter()
                .filter(|r| r.area.as_deref() == Some(*area))
                .cloned()
                .collect();
            (area.to_string(), rows)
        })
        .collect();
    let unmapped: Vec<CleanRecord> = records.iter().filter(|r| r.area.is_none()).cloned().collect();

    stats.unparsed_dates = records.iter().filter(|r| r.date.is_none()).count();
    stats.unmapped_rows = unmapped.len();
    stats.rows_out = records.len();
    if stats.unparsed_dates > 0 {
        warn!("{} rows have an unparseable date", stats.unparsed_dates);
    }
    if stats.unmapped_rows > 0 {
        warn!("{} rows have no known center and go to Unmapped", stats.unmapped_rows);
    }
    info!(
        "Report ready: {} rows in, {} rows out, {} summary rows x {} months",
        stats.rows_in,
        stats.rows_out,
        summary.rows.len(),
        summary.months.len()
    );

    Ok(ReportBundle {
        summary,
        areas,
        unmapped,
        raw: records,
        stats,
    })
}

fn normalize_headers(table: &mut Table) {
    for col in &mut table.columns {
        *col = normalize_header(col);
    }
}

fn drop_empty(table: &mut Table, stats: &mut ReportStats) {
    let keep: Vec<bool> = (0..table.columns.len())
        .map(|c| table.rows.iter().any(|row| !row[c].is_empty()))
        .collect();
    stats.empty_columns_dropped = keep.iter().filter(|k| !**k).count();
    table.retain_columns(&keep);

    let before = table.len();
    table.rows.retain(|row| row.iter().any(|cell| !cell.is_empty()));
    stats.blank_rows_dropped = before - table.len();
    debug!(
        "Dropped {} empty columns and {} blank rows",
        stats.empty_columns_dropped, stats.blank_rows_dropped
    );
}

fn drop_known_columns(table: &mut Table) -> Result<()> {
    for column in DROPPED_COLUMNS.iter().chain(SOURCE_COLUMNS.iter()) {
        if table.column_index(column).is_none() {
            return Err(ReportError::MissingColumn {
                column: column.to_string(),
                available: table.columns.clone(),
            });
        }
    }
    let keep: Vec<bool> = table
        .columns
        .iter()
        .map(|c| !DROPPED_COLUMNS.contains(&c.as_str()))
        .collect();
    table.retain_columns(&keep);
    Ok(())
}

fn required_index(table: &Table, column: &str) -> Result<usize> {
    table
        .column_index(column)
        .ok_or_else(|| ReportError::MissingColumn {
            column: column.to_string(),
            available: table.columns.clone(),
        })
}

/// Derive the per-session fields and drop exact duplicates, first one wins.
///
/// Duplicates are judged on every column still in the table (with `date`
/// already reformatted), not only on the projected record fields.
fn derive_records(
    table: &Table,
    centers: &CenterMap,
    stats: &mut ReportStats,
) -> Result<Vec<CleanRecord>> {
    let date_idx = required_index(table, "date")?;
    let teacher_idx = required_index(table, "teacher")?;
    let class_idx = required_index(table, "class_type")?;

    let mut seen: HashSet<Vec<Cell>> = HashSet::new();
    let mut records = Vec::with_capacity(table.len());
    for row in &table.rows {
        let timestamp = parse_timestamp(&row[date_idx]);
        let date = timestamp.map(|t| t.format(DATE_FMT).to_string());
        let time = timestamp.map(|t| t.format(TIME_FMT).to_string());
        let month = timestamp.map(|t| t.format(MONTH_FMT).to_string());

        let mut key = row.clone();
        key[date_idx] = Cell::from(date.clone());
        key.push(Cell::from(time.clone()));
        key.push(Cell::from(month.clone()));
        if !seen.insert(key) {
            stats.duplicates_removed += 1;
            continue;
        }

        let teacher = row[teacher_idx].to_text().unwrap_or_default();
        let center = extract_center(&teacher);
        let area = centers.area_of(&center).map(str::to_string);
        records.push(CleanRecord {
            teacher_clean: clean_teacher(&teacher),
            teacher,
            center,
            area,
            class_type: row[class_idx].to_text().unwrap_or_default(),
            date,
            time,
            month,
        });
    }
    if stats.duplicates_removed > 0 {
        debug!("Removed {} duplicate rows", stats.duplicates_removed);
    }
    Ok(records)
}

/// Session counts per (area, teacher) and month.
///
/// Rows without an area or a month take no part. Index rows are sorted by
/// area then teacher; month columns run newest first.
pub fn summarize(records: &[CleanRecord]) -> SummaryTable {
    let mut groups: BTreeMap<(String, String), BTreeMap<String, u64>> = BTreeMap::new();
    let mut months: BTreeSet<String> = BTreeSet::new();
    for r in records {
        let (Some(area), Some(month)) = (&r.area, &r.month) else {
            continue;
        };
        *groups
            .entry((area.clone(), r.teacher_clean.clone()))
            .or_default()
            .entry(month.clone())
            .or_insert(0) += 1;
        months.insert(month.clone());
    }

    let months: Vec<String> = months.into_iter().rev().collect();
    let rows = groups
        .into_iter()
        .map(|((area, teacher), by_month)| SummaryRow {
            area,
            teacher,
            counts: months
                .iter()
                .map(|m| by_month.get(m).copied().unwrap_or(0))
                .collect(),
        })
        .collect();
    SummaryTable { months, rows }
}
