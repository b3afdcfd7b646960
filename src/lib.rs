//! Pending result report generator.
//!
//! Stacks exported pending-result spreadsheets, cleans and classifies each
//! session by learning-center area, and renders a multi-sheet summary
//! workbook.
//!
//! ```no_run
//! use pending_report::{build_report, write_workbook, Upload, RESULT_FILE_NAME};
//!
//! let uploads = vec![Upload::from_path("january.xlsx")?];
//! if let Some(report) = build_report(&uploads)? {
//!     write_workbook(RESULT_FILE_NAME, &report)?;
//! }
//! # Ok::<(), pending_report::ReportError>(())
//! ```
pub mod center_map;
pub mod errors;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use center_map::CenterMap;
pub use errors::{ReportError, Result};
pub use loader::{load_uploads, LoadReport, Upload};
pub use output::{workbook_bytes, write_workbook, RESULT_FILE_NAME, RESULT_MIME};
pub use reports::{build_report, generate_report, REPORT_AREAS};
pub use types::{CleanRecord, ReportBundle, ReportStats, SheetTable, SummaryTable, Table};
