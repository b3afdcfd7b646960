use crate::errors::Result;
use crate::types::{ReportBundle, SheetTable, SheetValue};
use log::info;
use rust_xlsxwriter::{
    DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub const RESULT_FILE_NAME: &str = "Result.xlsx";
pub const RESULT_MIME: &str = "application/vnd.ms-excel";

/// Render the report as an in-memory xlsx file.
pub fn workbook_bytes(bundle: &ReportBundle) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(bundle)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn write_workbook(path: impl AsRef<Path>, bundle: &ReportBundle) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = build_workbook(bundle)?;
    workbook.save(path)?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn build_workbook(bundle: &ReportBundle) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    // Fixed creation stamp, so the same input always yields the same bytes.
    let created = ExcelDateTime::from_ymd(2025, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
    for (name, sheet) in bundle.sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;
        write_sheet(worksheet, &sheet)?;
    }
    Ok(workbook)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetTable) -> Result<()> {
    let header = Format::new().set_bold().set_border(FormatBorder::Thin);
    let index = Format::new().set_bold().set_align(FormatAlign::Top);

    for (col, title) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title, &header)?;
    }
    for (r, row) in sheet.rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            match value {
                SheetValue::Blank => {}
                SheetValue::Text(s) if (col as usize) < sheet.index_columns => {
                    worksheet.write_string_with_format(r, col, s, &index)?;
                }
                SheetValue::Text(s) => {
                    worksheet.write_string(r, col, s)?;
                }
                SheetValue::Count(n) => {
                    worksheet.write_number(r, col, *n as f64)?;
                }
            }
        }
    }
    if sheet.index_columns > 0 {
        merge_index_runs(worksheet, sheet, &index)?;
    }
    worksheet.autofit();
    Ok(())
}

/// Merge consecutive equal cells of the outermost index column, so each area
/// label spans its teachers.
fn merge_index_runs(worksheet: &mut Worksheet, sheet: &SheetTable, format: &Format) -> Result<()> {
    let mut start = 0;
    while start < sheet.rows.len() {
        let label = &sheet.rows[start][0];
        let mut end = start;
        while end + 1 < sheet.rows.len() && &sheet.rows[end + 1][0] == label {
            end += 1;
        }
        if end > start {
            if let SheetValue::Text(s) = label {
                worksheet.merge_range(start as u32 + 1, 0, end as u32 + 1, 0, s, format)?;
            }
        }
        start = end + 1;
    }
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Markdown preview of any output sheet, header plus the first `max_rows`.
pub fn preview_sheet(sheet: &SheetTable, max_rows: usize) {
    if sheet.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_sheet(sheet, max_rows));
}

fn render_sheet(sheet: &SheetTable, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(sheet.headers.iter().cloned());
    for row in sheet.rows.iter().take(max_rows) {
        builder.push_record(row.iter().map(|value| match value {
            SheetValue::Blank => String::new(),
            SheetValue::Text(s) => s.clone(),
            SheetValue::Count(n) => n.to_string(),
        }));
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    table.to_string()
}
