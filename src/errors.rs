use thiserror::Error;

/// Everything that can stop a report from being produced.
///
/// Row-level problems (unparseable dates, unknown center tags) are not errors;
/// they surface as `None` fields on the cleaned records instead.
#[derive(Debug, Error)]
pub enum ReportError {
    // Directory lookups.
    #[error("Center {center} is not a valid center. Select one of {}", join(.valid))]
    UnknownCenter { center: String, valid: Vec<String> },
    #[error("Area {area} is not a valid area. Select one of {}", join(.valid))]
    UnknownArea { area: String, valid: Vec<String> },

    // Input structure.
    #[error("Missing required column '{column}' (found: {})", join(.available))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("Input '{name}' has no data: {reason}")]
    EmptyInput { name: String, reason: String },

    // Parsing.
    #[error("Failed to read workbook '{name}': {source}")]
    Workbook {
        name: String,
        #[source]
        source: calamine::Error,
    },
    #[error("Failed to read CSV '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    // Output.
    #[error("Failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

fn join(items: &[String]) -> String {
    format!("{{{}}}", items.join(", "))
}
