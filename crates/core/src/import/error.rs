//! Import pipeline error taxonomy.

use super::store::StoreError;

/// A file could not be read as a table of rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileFormatError {
    #[error("The file is empty")]
    Empty,

    #[error("File is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported file type '{0}'. Upload a CSV or Excel file")]
    Unsupported(String),

    #[error("Could not read CSV file: {0}")]
    Csv(String),

    #[error("Could not read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("The file has no header row")]
    MissingHeader,
}

/// Everything that can go wrong while validating or committing an import.
///
/// File-level variants (`FileFormat`, `Schema`) abort the whole call.
/// Row-level variants (`RowData`, `IdentityConflict`, `Storage`) are
/// recorded against a single row and processing continues.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    FileFormat(#[from] FileFormatError),

    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Row {row}: {message}")]
    RowData { row: usize, message: String },

    #[error("Row {row}: {entity} '{identity}' already exists")]
    IdentityConflict {
        row: usize,
        entity: &'static str,
        identity: String,
    },

    #[error("Row {row}: {source}")]
    Storage { row: usize, source: StoreError },

    /// The validate/commit request never reached the service.
    #[error("Network error: {0}")]
    Network(String),
}
