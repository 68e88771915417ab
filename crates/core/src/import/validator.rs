//! File validation.
//!
//! Validation is read-only: it parses the file, checks the header against the
//! target schema and runs every row through the target's row rules. The same
//! pass is reused by the committer, so a commit never accepts a file that
//! validation would reject.

use std::collections::{BTreeSet, HashMap};

use super::error::ImportError;
use super::file::{self, line_number, ParsedSheet, UploadedFile};
use super::report::{ValidationReport, SAMPLE_ROWS};
use super::rules::{self, Identity, ImportRecord};
use super::store::ImportStore;
use super::target::{ImportTarget, SYSTEM_COLUMNS};

/// A validated row ready to be written, tagged with its spreadsheet row number.
#[derive(Debug, Clone)]
pub struct ValidatedRow {
    pub line: usize,
    pub record: ImportRecord,
}

/// The report together with the rows that converted cleanly.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub report: ValidationReport,
    pub rows: Vec<ValidatedRow>,
}

/// Validate an uploaded file against `target`.
pub fn validate(file: &UploadedFile, target: &ImportTarget) -> ValidationReport {
    match file::parse(file) {
        Ok(sheet) => assess(&sheet, target).report,
        Err(e) => ValidationReport::unreadable(&ImportError::from(e)),
    }
}

/// Validate, then add recommendations for supplier references that do not
/// resolve in `store`. Files larger than `max_file_bytes` are unreadable.
///
/// Unresolved references do not make the report invalid; those rows fail
/// individually at commit time.
pub async fn validate_with_references(
    store: &dyn ImportStore,
    file: &UploadedFile,
    target: &ImportTarget,
    max_file_bytes: usize,
) -> ValidationReport {
    let sheet = match file::parse_with_limit(file, max_file_bytes) {
        Ok(sheet) => sheet,
        Err(e) => return ValidationReport::unreadable(&ImportError::from(e)),
    };
    let Assessment { mut report, rows } = assess(&sheet, target);

    let mut known: HashMap<i64, bool> = HashMap::new();
    for row in &rows {
        let Some(supplier_id) = row.record.referenced_supplier() else {
            continue;
        };
        let exists = match known.get(&supplier_id) {
            Some(exists) => *exists,
            None => match store.supplier_exists(supplier_id).await {
                Ok(exists) => {
                    known.insert(supplier_id, exists);
                    exists
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Supplier reference check failed");
                    report
                        .recommendations
                        .push(format!("Supplier references could not be checked: {e}"));
                    break;
                }
            },
        };
        if !exists {
            report.recommendations.push(format!(
                "Row {}: supplier {supplier_id} does not exist; this row will fail on import",
                row.line
            ));
        }
    }
    report
}

/// Check a parsed sheet against `target` and convert its rows.
///
/// Deterministic: the same sheet and target always yield the same report.
pub fn assess(sheet: &ParsedSheet, target: &ImportTarget) -> Assessment {
    let mut report = ValidationReport {
        total_rows: sheet.rows.len(),
        missing_columns: target
            .required_columns
            .iter()
            .filter(|column| !sheet.has_column(column))
            .map(|column| column.to_string())
            .collect(),
        sample_data: sheet.rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        ..ValidationReport::default()
    };

    for header in sheet.duplicate_headers() {
        report
            .data_issues
            .push(format!("Column '{header}' appears more than once in the header"));
    }
    if sheet.rows.is_empty() {
        report
            .data_issues
            .push("The file contains no data rows".to_string());
    }

    let mut rows = Vec::with_capacity(sheet.rows.len());
    let mut first_seen: HashMap<Identity, usize> = HashMap::new();
    for (index, raw) in sheet.rows.iter().enumerate() {
        let line = line_number(index);
        if sheet.overflowing_rows.binary_search(&index).is_ok() {
            report.data_issues.push(format!(
                "Row {line}: the row has more cells than the header has columns"
            ));
            continue;
        }
        match rules::parse_row(target.kind, raw, line) {
            Ok(record) => {
                let identity = record.identity();
                match first_seen.get(&identity) {
                    Some(first) => report.recommendations.push(format!(
                        "Row {line}: duplicate {} '{identity}' (first on row {first}); \
                         the later row will be skipped or overwrite the earlier one",
                        target.kind.entity_name()
                    )),
                    None => {
                        first_seen.insert(identity, line);
                    }
                }
                rows.push(ValidatedRow { line, record });
            }
            Err(issues) => report
                .data_issues
                .extend(issues.into_iter().map(|issue| issue.to_string())),
        }
    }

    let headers: BTreeSet<&str> = sheet
        .headers
        .iter()
        .map(String::as_str)
        .filter(|h| !h.is_empty())
        .collect();
    for header in &headers {
        if SYSTEM_COLUMNS.contains(header) {
            report.recommendations.push(format!(
                "Column '{header}' is managed by the system and will be ignored"
            ));
        } else if !target.knows_column(header) {
            report.recommendations.push(format!(
                "Column '{header}' is not used for {} and will be ignored",
                target.label
            ));
        }
    }

    Assessment {
        report: report.finalize(),
        rows,
    }
}
