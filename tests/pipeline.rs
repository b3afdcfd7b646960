use calamine::{Reader, Xlsx};
use pending_report::{build_report, workbook_bytes, ReportError, Upload, REPORT_AREAS};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::io::Cursor;

const HEADER: [&str; 11] = [
    "Code",
    "Center Name",
    "Level / Unit",
    "Last Name",
    "First Name",
    "Service Type",
    "Start Time",
    "Date",
    "Teacher",
    "Class Type",
    "Remarks",
];

enum When<'a> {
    At(u16, u8, u8, u16, u8),
    Text(&'a str),
}

struct Session<'a> {
    when: When<'a>,
    teacher: &'a str,
    class_type: &'a str,
}

fn export(name: &str, sessions: &[Session]) -> Upload {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    sheet.write_string(0, 0, "Pending Results - exported").unwrap();
    for (col, title) in HEADER.iter().enumerate() {
        sheet.write_string(1, col as u16, *title).unwrap();
    }
    for (i, s) in sessions.iter().enumerate() {
        let row = i as u32 + 2;
        for (col, value) in ["S-1", "Center", "L1", "Student", "Sam", "Class", "09:00"]
            .iter()
            .enumerate()
        {
            sheet.write_string(row, col as u16, *value).unwrap();
        }
        match s.when {
            When::At(y, m, d, h, min) => {
                let dt = ExcelDateTime::from_ymd(y, m, d)
                    .unwrap()
                    .and_hms(h, min, 0)
                    .unwrap();
                sheet
                    .write_datetime_with_format(row, 7, &dt, &date_format)
                    .unwrap();
            }
            When::Text(text) => {
                sheet.write_string(row, 7, text).unwrap();
            }
        }
        sheet.write_string(row, 8, s.teacher).unwrap();
        sheet.write_string(row, 9, s.class_type).unwrap();
    }
    Upload::new(name, workbook.save_to_buffer().unwrap())
}

fn session<'a>(when: When<'a>, teacher: &'a str) -> Session<'a> {
    Session {
        when,
        teacher,
        class_type: "Regular",
    }
}

fn sheet_rows(bytes: &[u8], name: &str) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
    let range = workbook.worksheet_range(name).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn uploads() -> Vec<Upload> {
    let january = export(
        "january.xlsx",
        &[
            session(When::At(2025, 1, 6, 9, 0), "Jane Doe (GC)"),
            session(When::At(2025, 1, 20, 9, 0), "jane doe (GC)"),
            session(When::At(2025, 1, 20, 9, 0), "jane doe (GC)"),
            session(When::At(2025, 1, 21, 14, 15), "John Smith"),
        ],
    );
    let february = export(
        "february.xlsx",
        &[
            session(When::At(2025, 2, 3, 10, 30), "Jane Doe (GC)"),
            session(When::Text("TBD"), "Ani (DG)"),
            session(When::At(2025, 2, 4, 16, 0), "Budi (PP)"),
        ],
    );
    vec![january, february]
}

#[test]
fn end_to_end_report() {
    let report = build_report(&uploads()).unwrap().unwrap();

    // One duplicate (same teacher text and timestamp) is removed.
    assert_eq!(report.stats.rows_in, 7);
    assert_eq!(report.stats.duplicates_removed, 1);
    assert_eq!(report.raw.len(), 6);

    let first = &report.raw[0];
    assert_eq!(first.teacher_clean, "Jane Doe");
    assert_eq!(first.center, "GC");
    assert_eq!(first.area.as_deref(), Some("JKT 2"));
    assert_eq!(first.date.as_deref(), Some("06 Jan 2025"));
    assert_eq!(first.time.as_deref(), Some("09:00:00"));
    assert_eq!(first.month.as_deref(), Some("2025-01"));

    let summary = &report.summary;
    assert_eq!(summary.months, vec!["2025-02", "2025-01"]);
    assert_eq!(summary.count("JKT 2", "Jane Doe", "2025-02"), Some(1));
    assert_eq!(summary.count("JKT 2", "Jane Doe", "2025-01"), Some(2));
    assert_eq!(summary.count("JKT 1", "Budi", "2025-02"), Some(1));
    // Ani's date is unreadable, so she has no month and no summary row.
    assert!(summary.rows.iter().all(|r| r.teacher != "Ani"));

    let bdg = report.records("BDG").unwrap();
    assert_eq!(bdg.len(), 1);
    assert_eq!(bdg[0].date, None);
    assert_eq!(bdg[0].month, None);

    assert_eq!(report.unmapped.len(), 1);
    assert_eq!(report.unmapped[0].teacher, "John Smith");
}

#[test]
fn workbook_layout_round_trips_through_calamine() {
    let report = build_report(&uploads()).unwrap().unwrap();
    let bytes = workbook_bytes(&report).unwrap();

    let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.clone())).unwrap();
    let mut expected = vec!["Summary".to_string()];
    expected.extend(REPORT_AREAS.iter().map(|a| a.to_string()));
    expected.extend(["Unmapped".to_string(), "Raw Data".to_string()]);
    assert_eq!(workbook.sheet_names(), expected);

    let summary = sheet_rows(&bytes, "Summary");
    assert_eq!(summary[0], vec!["Area", "Teacher", "2025-02", "2025-01"]);
    assert_eq!(summary[1], vec!["JKT 1", "Budi", "1", "0"]);
    assert_eq!(summary[2], vec!["JKT 2", "Jane Doe", "1", "2"]);

    let jkt2 = sheet_rows(&bytes, "JKT 2");
    assert_eq!(
        jkt2[0],
        vec!["Teacher", "Teacher Clean", "Center", "Area", "Class Type", "Date", "Time"]
    );
    assert_eq!(jkt2.len(), 4);

    let unmapped = sheet_rows(&bytes, "Unmapped");
    assert_eq!(unmapped[0].last().map(String::as_str), Some("Month"));
    assert_eq!(unmapped[1][0], "John Smith");
    assert_eq!(unmapped[1][3], "");

    let raw = sheet_rows(&bytes, "Raw Data");
    assert_eq!(raw.len(), 7);

    let empty_area = sheet_rows(&bytes, "SBY");
    assert_eq!(empty_area.len(), 1);
}

#[test]
fn identical_inputs_give_identical_sheets() {
    let a = build_report(&uploads()).unwrap().unwrap();
    let b = build_report(&uploads()).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.sheets(), b.sheets());
}

#[test]
fn mixed_csv_and_workbook_inputs_stack() {
    let csv = b"Banner\nCode,Center Name,Level / Unit,Last Name,First Name,Service Type,Start Time,Date,Teacher,Class Type\n\
S-9,Center,L2,Doe,Kim,Class,08:00,2025-03-10 08:00:00,Rina (LW),Trial\n"
        .to_vec();
    let mut inputs = uploads();
    inputs.push(Upload::new("march.csv", csv));
    let report = build_report(&inputs).unwrap().unwrap();
    assert_eq!(report.summary.months[0], "2025-03");
    assert_eq!(report.summary.count("JKT 2", "Rina", "2025-03"), Some(1));
}

#[test]
fn missing_required_column_fails_the_run() {
    let csv = b"Banner\nCode,Center Name,Level / Unit,Last Name,First Name,Service Type,Date,Teacher,Class Type\n\
S-9,Center,L2,Doe,Kim,Class,2025-03-10 08:00:00,Rina (LW),Trial\n"
        .to_vec();
    let err = build_report(&[Upload::new("no_start.csv", csv)]).unwrap_err();
    match err {
        ReportError::MissingColumn { column, .. } => assert_eq!(column, "start_time"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn no_inputs_means_no_report() {
    assert!(build_report(&[]).unwrap().is_none());
}
