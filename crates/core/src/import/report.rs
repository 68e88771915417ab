//! Result shapes returned by validation, commit and bulk user import.

use serde::Serialize;

use super::error::ImportError;
use super::file::Row;

/// Maximum number of rows echoed back in [`ValidationReport::sample_data`].
pub const SAMPLE_ROWS: usize = 3;

/// Read-only assessment of a file against an import target.
///
/// `valid` is true exactly when there are no missing columns and no data
/// issues. Recommendations never affect validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub total_rows: usize,
    pub missing_columns: Vec<String>,
    pub data_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub sample_data: Vec<Row>,
}

impl ValidationReport {
    /// Report for a file that could not be read at all.
    pub fn unreadable(error: &ImportError) -> Self {
        Self {
            valid: false,
            data_issues: vec![error.to_string()],
            ..Self::default()
        }
    }

    /// Recompute `valid` from the collected findings.
    pub fn finalize(mut self) -> Self {
        self.valid = self.missing_columns.is_empty() && self.data_issues.is_empty();
        self
    }
}

/// Outcome of committing a file.
///
/// For row-level outcomes
/// `successful_imports + updated_records + skipped_records + failed_imports == total_rows`.
/// A file-level failure reports `success = false`, zero counters and the
/// cause in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    pub total_rows: usize,
    pub successful_imports: usize,
    pub updated_records: usize,
    pub skipped_records: usize,
    pub failed_imports: usize,
    pub errors: Vec<String>,
    /// User accounts created by this commit, with any generated temporary
    /// password. Shown once; only the hash is stored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_users: Vec<CreatedUser>,
}

impl ImportResult {
    /// A result for an import that stopped before processing any row.
    pub fn file_failure(error: &ImportError) -> Self {
        Self {
            success: false,
            message: format!("Import failed: {error}"),
            errors: vec![error.to_string()],
            ..Self::default()
        }
    }

    /// A result for a file whose validation report is not valid.
    pub fn rejected(report: &ValidationReport) -> Self {
        let mut errors: Vec<String> = Vec::new();
        if !report.missing_columns.is_empty() {
            errors.push(
                ImportError::Schema {
                    missing: report.missing_columns.clone(),
                }
                .to_string(),
            );
        }
        errors.extend(report.data_issues.iter().cloned());
        Self {
            success: false,
            message: "Import failed: the file did not pass validation".to_string(),
            errors,
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, error: ImportError) {
        self.failed_imports += 1;
        self.errors.push(error.to_string());
    }

    /// Mark every row as attempted and build the summary message.
    pub fn finalize(mut self) -> Self {
        self.success = true;
        self.message = format!(
            "Processed {} rows: {} created, {} updated, {} skipped, {} failed",
            self.total_rows,
            self.successful_imports,
            self.updated_records,
            self.skipped_records,
            self.failed_imports
        );
        self
    }
}

/// An account created by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub username: String,
    pub email: String,
    /// Present only when the file supplied no password for this user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

/// Outcome of a bulk user import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkUserImportResult {
    pub total_created: usize,
    pub total_errors: usize,
    pub errors: Vec<String>,
    pub created_users: Vec<CreatedUser>,
}

impl BulkUserImportResult {
    pub fn record_failure(&mut self, error: ImportError) {
        self.total_errors += 1;
        self.errors.push(error.to_string());
    }
}
