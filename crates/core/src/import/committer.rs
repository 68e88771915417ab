//! Import commit.
//!
//! The committer re-validates the file itself and then writes rows one at a
//! time. There is no transaction around the file: a failing row is recorded
//! and the next row is attempted.

use super::error::ImportError;
use super::file::{self, UploadedFile, MAX_FILE_SIZE_BYTES};
use super::report::{CreatedUser, ImportResult};
use super::rules::ImportRecord;
use super::store::ImportStore;
use super::target::TargetKind;
use super::validator::{assess, ValidatedRow};
use crate::credentials::{credentials_for_new_user, hash_password, StoredCredentials};

/// Parameters of a single commit.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub target: TargetKind,
    pub file: UploadedFile,
    /// Overwrite records whose identity already exists instead of skipping them.
    pub update_existing: bool,
    /// Files larger than this are rejected before parsing.
    pub max_file_bytes: usize,
}

impl ImportRequest {
    /// A request with the default file size cap.
    pub fn new(target: TargetKind, file: UploadedFile, update_existing: bool) -> Self {
        Self {
            target,
            file,
            update_existing,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowOutcome {
    /// Carries the account for user rows.
    Created(Option<CreatedUser>),
    Updated,
    Skipped,
}

/// Commit `request` against `store`.
///
/// Files that fail validation are rejected without touching storage.
pub async fn commit(store: &dyn ImportStore, request: &ImportRequest) -> ImportResult {
    let target = request.target.target();
    let sheet = match file::parse_with_limit(&request.file, request.max_file_bytes) {
        Ok(sheet) => sheet,
        Err(e) => {
            let error = ImportError::from(e);
            tracing::warn!(import_type = %request.target, error = %error, "Import file rejected");
            return ImportResult::file_failure(&error);
        }
    };

    let assessment = assess(&sheet, target);
    if !assessment.report.valid {
        tracing::info!(
            import_type = %request.target,
            missing = assessment.report.missing_columns.len(),
            issues = assessment.report.data_issues.len(),
            "Import rejected by validation",
        );
        return ImportResult::rejected(&assessment.report);
    }

    let mut result = ImportResult {
        total_rows: assessment.report.total_rows,
        ..ImportResult::default()
    };

    for row in assessment.rows {
        let line = row.line;
        match commit_row(store, row, request.update_existing).await {
            Ok(RowOutcome::Created(user)) => {
                result.successful_imports += 1;
                result.created_users.extend(user);
            }
            Ok(RowOutcome::Updated) => result.updated_records += 1,
            Ok(RowOutcome::Skipped) => result.skipped_records += 1,
            Err(error) => {
                tracing::debug!(row = line, error = %error, "Import row failed");
                result.record_failure(error);
            }
        }
    }

    let result = result.finalize();
    tracing::info!(
        import_type = %request.target,
        total = result.total_rows,
        created = result.successful_imports,
        updated = result.updated_records,
        skipped = result.skipped_records,
        failed = result.failed_imports,
        "Import committed",
    );
    result
}

async fn commit_row(
    store: &dyn ImportStore,
    row: ValidatedRow,
    update_existing: bool,
) -> Result<RowOutcome, ImportError> {
    let ValidatedRow { line, mut record } = row;
    let storage = |source| ImportError::Storage { row: line, source };

    let existing = store
        .find_existing(&record.identity())
        .await
        .map_err(storage)?;

    match existing {
        Some(_) if !update_existing => Ok(RowOutcome::Skipped),
        Some(id) => {
            attach_credentials(&mut record, line, false)?;
            store.update(id, &record).await.map_err(storage)?;
            Ok(RowOutcome::Updated)
        }
        None => {
            let temporary_password = attach_credentials(&mut record, line, true)?;
            store.create(&record).await.map_err(storage)?;
            let user = match &record {
                ImportRecord::User(user) => Some(CreatedUser {
                    username: user.username.clone(),
                    email: user.email.clone(),
                    temporary_password,
                }),
                _ => None,
            };
            Ok(RowOutcome::Created(user))
        }
    }
}

/// Hash the row's password into credentials for user records.
///
/// New accounts without a password get a temporary one and must change it;
/// the plaintext is returned so it can be handed to the user. Updates
/// without a password leave the stored credentials untouched.
fn attach_credentials(
    record: &mut ImportRecord,
    line: usize,
    is_new: bool,
) -> Result<Option<String>, ImportError> {
    let ImportRecord::User(user) = record else {
        return Ok(None);
    };
    let password = user.password.take();
    let hash_failed = |e: argon2::password_hash::Error| ImportError::RowData {
        row: line,
        message: format!("could not hash password: {e}"),
    };

    let mut temporary_password = None;
    user.credentials = match (password, is_new) {
        (password, true) => {
            let (credentials, temporary) =
                credentials_for_new_user(password.as_deref()).map_err(hash_failed)?;
            if temporary.is_some() {
                tracing::info!(username = %user.username, "Generated temporary password");
            }
            temporary_password = temporary;
            Some(credentials)
        }
        (Some(password), false) => Some(StoredCredentials {
            password_hash: hash_password(&password).map_err(hash_failed)?,
            must_change_password: false,
        }),
        (None, false) => None,
    };
    Ok(temporary_password)
}
