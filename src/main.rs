// Entry point and high-level CLI flow.
//
// - Load every input file given on the command line and stack them.
// - Clean, classify and summarize the sessions.
// - Write the multi-sheet workbook (and optionally a JSON run summary),
//   printing short diagnostics and previews along the way.
use anyhow::{bail, Context, Result};
use clap::Parser;
use pending_report::loader::{load_uploads, LoadReport, Upload};
use pending_report::output::{preview_sheet, preview_table_rows, write_json, write_workbook};
use pending_report::reports::generate_report;
use pending_report::types::{ReportBundle, ReportStats, SheetRowCount, SUMMARY_SHEET};
use pending_report::util::format_int;
use pending_report::RESULT_FILE_NAME;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Generate the pending result report workbook from exported spreadsheets.")]
struct Args {
    /// Exported pending-result files (xlsx, xls, xlsb, ods or csv).
    inputs: Vec<PathBuf>,

    /// Where to write the report workbook.
    #[arg(short, long, default_value = RESULT_FILE_NAME)]
    output: PathBuf,

    /// Also write a JSON run summary to this path.
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Summary rows to preview on the console.
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Log every pipeline stage.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    load: &'a LoadReport,
    stats: &'a ReportStats,
    sheets: Vec<SheetRowCount>,
    months: &'a [String],
}

/// Read and stack the inputs, printing the same short diagnostics for every
/// run. `None` means there was nothing to process.
fn handle_load(paths: &[PathBuf]) -> Result<Option<(pending_report::Table, LoadReport)>> {
    let uploads = paths
        .iter()
        .map(|p| Upload::from_path(p).with_context(|| format!("Failed to read {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let Some((table, load_report)) = load_uploads(&uploads)? else {
        return Ok(None);
    };
    println!(
        "Processing files... ({} rows loaded from {} files)",
        format_int(load_report.rows),
        format_int(load_report.files)
    );
    Ok(Some((table, load_report)))
}

fn print_report(report: &ReportBundle, preview: usize) {
    let stats = &report.stats;
    println!(
        "Cleaned {} rows ({} duplicates, {} blank rows removed).",
        format_int(stats.rows_out),
        format_int(stats.duplicates_removed),
        format_int(stats.blank_rows_dropped)
    );
    if stats.unparsed_dates > 0 {
        println!(
            "Note: {} rows have a date that could not be read.",
            format_int(stats.unparsed_dates)
        );
    }
    if stats.unmapped_rows > 0 {
        println!(
            "Note: {} rows have no known center (see the Unmapped sheet).",
            format_int(stats.unmapped_rows)
        );
    }
    println!();

    println!("Summary (most recent month first)\n");
    if let Some(summary) = report.sheet(SUMMARY_SHEET) {
        preview_sheet(&summary, preview);
    }
    println!("Sheets\n");
    let counts = report.row_counts();
    preview_table_rows(&counts, counts.len());
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let Some((table, load_report)) = handle_load(&args.inputs)? else {
        eprintln!("No valid data found. Please check your files.");
        bail!("no input files given");
    };

    let report = generate_report(table).context("Failed to generate report")?;
    print_report(&report, args.preview);

    write_workbook(&args.output, &report)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Your file is ready: {}", args.output.display());

    if let Some(path) = &args.summary_json {
        let summary = RunSummary {
            load: &load_report,
            stats: &report.stats,
            sheets: report.row_counts(),
            months: &report.summary.months,
        };
        write_json(path, &summary)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Run summary saved to {}", path.display());
    }
    Ok(())
}
