//! Bulk user account import.
//!
//! A specialization of the generic commit for user accounts: there is no
//! preview stage and no update path. Each row either creates a new account or
//! contributes one error string. Rows without a password get a generated
//! temporary password, returned once in the result and flagged for change on
//! first login.

use std::collections::HashSet;

use super::error::ImportError;
use super::file::{self, line_number, UploadedFile};
use super::report::{BulkUserImportResult, CreatedUser};
use super::rules::{self, normalize_identity, ImportRecord, UserRecord};
use super::store::{ImportStore, UserConflict};
use super::target::TargetKind;
use crate::credentials::credentials_for_new_user;

/// Import user accounts from `file`.
///
/// Returns `Err` only for file-level failures (unreadable or oversized file,
/// missing `username` or `email` column). Row failures are collected in the
/// result.
pub async fn bulk_import_users(
    store: &dyn ImportStore,
    file: &UploadedFile,
    max_file_bytes: usize,
) -> Result<BulkUserImportResult, ImportError> {
    let sheet = file::parse_with_limit(file, max_file_bytes)?;
    let target = TargetKind::Users.target();
    let missing: Vec<String> = target
        .required_columns
        .iter()
        .filter(|column| !sheet.has_column(column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::Schema { missing });
    }

    let mut result = BulkUserImportResult::default();
    let mut seen_usernames = HashSet::new();
    let mut seen_emails = HashSet::new();

    for (index, raw) in sheet.rows.iter().enumerate() {
        let line = line_number(index);
        if sheet.overflowing_rows.binary_search(&index).is_ok() {
            result.record_failure(ImportError::RowData {
                row: line,
                message: "the row has more cells than the header has columns".to_string(),
            });
            continue;
        }
        let user = match rules::parse_row(TargetKind::Users, raw, line) {
            Ok(ImportRecord::User(user)) => user,
            Ok(_) => continue,
            Err(issues) => {
                result.record_failure(combine_issues(line, issues));
                continue;
            }
        };

        // The first created account wins; later duplicates in the same file
        // are errors. Failed rows reserve nothing.
        let username_key = normalize_identity(&user.username);
        let email_key = normalize_identity(&user.email);
        if seen_usernames.contains(&username_key) {
            result.record_failure(ImportError::RowData {
                row: line,
                message: format!("username '{}' appears more than once in the file", user.username),
            });
            continue;
        }
        if seen_emails.contains(&email_key) {
            result.record_failure(ImportError::RowData {
                row: line,
                message: format!("email '{}' appears more than once in the file", user.email),
            });
            continue;
        }

        match create_user(store, user, line).await {
            Ok(created) => {
                seen_usernames.insert(username_key);
                seen_emails.insert(email_key);
                result.total_created += 1;
                result.created_users.push(created);
            }
            Err(error) => {
                tracing::debug!(row = line, error = %error, "User import row failed");
                result.record_failure(error);
            }
        }
    }

    tracing::info!(
        created = result.total_created,
        failed = result.total_errors,
        "Bulk user import finished",
    );
    Ok(result)
}

async fn create_user(
    store: &dyn ImportStore,
    mut user: UserRecord,
    line: usize,
) -> Result<CreatedUser, ImportError> {
    let storage = |source| ImportError::Storage { row: line, source };

    match store
        .find_user_conflict(&user.username, &user.email)
        .await
        .map_err(storage)?
    {
        Some(UserConflict::Username) => {
            return Err(ImportError::IdentityConflict {
                row: line,
                entity: TargetKind::Users.entity_name(),
                identity: user.username,
            })
        }
        Some(UserConflict::Email) => {
            return Err(ImportError::RowData {
                row: line,
                message: format!("email '{}' is already in use", user.email),
            })
        }
        None => {}
    }

    let (credentials, temporary_password) =
        credentials_for_new_user(user.password.take().as_deref()).map_err(|e| {
            ImportError::RowData {
                row: line,
                message: format!("could not hash password: {e}"),
            }
        })?;
    user.credentials = Some(credentials);

    let created = CreatedUser {
        username: user.username.clone(),
        email: user.email.clone(),
        temporary_password,
    };
    store
        .create(&ImportRecord::User(user))
        .await
        .map_err(storage)?;
    Ok(created)
}

/// Fold every rule violation of one row into a single error string.
fn combine_issues(line: usize, issues: Vec<ImportError>) -> ImportError {
    let message = issues
        .into_iter()
        .map(|issue| match issue {
            ImportError::RowData { message, .. } => message,
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    ImportError::RowData { row: line, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::verify_password;
    use crate::import::error::FileFormatError;
    use crate::import::file::MAX_FILE_SIZE_BYTES;
    use crate::import::memory::MemoryStore;
    use assert_matches::assert_matches;

    fn csv(text: &str) -> UploadedFile {
        UploadedFile::csv("users.csv", text)
    }

    #[tokio::test]
    async fn missing_password_gets_temporary_one() {
        let store = MemoryStore::new();
        let file = csv(
            "username,email,password,role\n\
             ana,ana@x.test,first-long-secret,admin\n\
             bob,bob@x.test,,\n\
             cyd,cyd@x.test,second-long-secret,staff\n",
        );
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.total_created, 3);
        assert_eq!(result.total_errors, 0);
        let bob = &result.created_users[1];
        let temporary = bob.temporary_password.as_deref().expect("bob gets a password");
        assert!(result.created_users[0].temporary_password.is_none());

        let users = store.records(TargetKind::Users).await;
        assert_matches!(&users[1].1.record, ImportRecord::User(u) => {
            let creds = u.credentials.as_ref().unwrap();
            assert!(creds.must_change_password);
            assert!(verify_password(temporary, &creds.password_hash).unwrap());
        });
        assert_matches!(&users[0].1.record, ImportRecord::User(u) => {
            assert_eq!(u.role, Some("admin"));
            assert!(!u.credentials.as_ref().unwrap().must_change_password);
        });
    }

    #[tokio::test]
    async fn existing_accounts_are_errors_not_updates() {
        let store = MemoryStore::new();
        bulk_import_users(&store, &csv("username,email\nana,ana@x.test\n"), MAX_FILE_SIZE_BYTES)
            .await
            .unwrap();

        let file = csv("username,email\nANA,new@x.test\nbob,Ana@x.test\ncyd,cyd@x.test\n");
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.total_created, 1);
        assert_eq!(result.total_errors, 2);
        assert_eq!(
            result.errors,
            vec![
                "Row 2: user 'ANA' already exists",
                "Row 3: email 'Ana@x.test' is already in use",
            ]
        );
        assert_eq!(store.count(TargetKind::Users).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicates_within_file_keep_the_first_row() {
        let store = MemoryStore::new();
        let file = csv("username,email\nana,a@x.test\nana,b@x.test\nbob,A@X.test\n");
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.total_created, 1);
        assert_eq!(
            result.errors,
            vec![
                "Row 3: username 'ana' appears more than once in the file",
                "Row 4: email 'A@X.test' appears more than once in the file",
            ]
        );
    }

    #[tokio::test]
    async fn rule_violations_are_one_error_per_row() {
        let store = MemoryStore::new();
        let file = csv("username,email,role\n,not-an-email,boss\nok_user,ok@x.test,\n");
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.total_created, 1);
        assert_eq!(result.total_errors, 1);
        assert!(result.errors[0].starts_with("Row 2: username is required; email"));
    }

    #[tokio::test]
    async fn missing_columns_fail_the_call() {
        let store = MemoryStore::new();
        let err = bulk_import_users(&store, &csv("username\nana\n"), MAX_FILE_SIZE_BYTES)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required columns: email");
    }

    #[tokio::test]
    async fn unreadable_file_fails_the_call() {
        let store = MemoryStore::new();
        let file = UploadedFile::new("users.csv", None, Vec::new());
        let err = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap_err();
        assert_matches!(err, ImportError::FileFormat(FileFormatError::Empty));
    }

    #[tokio::test]
    async fn failed_rows_do_not_reserve_their_username() {
        let store = MemoryStore::new();
        bulk_import_users(&store, &csv("username,email\nbob,taken@x.test\n"), MAX_FILE_SIZE_BYTES)
            .await
            .unwrap();

        let file = csv("username,email\nana,taken@x.test\nana,ana@x.test\n");
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.errors, vec!["Row 2: email 'taken@x.test' is already in use"]);
        assert_eq!(result.total_created, 1);
        assert_eq!(result.created_users[0].email, "ana@x.test");
    }

    #[tokio::test]
    async fn rows_wider_than_the_header_are_rejected() {
        let store = MemoryStore::new();
        let file = csv("username,email\nana,ana@x.test,admin\nbob,bob@x.test\n");
        let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();

        assert_eq!(result.total_created, 1);
        assert_eq!(
            result.errors,
            vec!["Row 2: the row has more cells than the header has columns"]
        );
    }

    #[tokio::test]
    async fn oversized_file_fails_the_call() {
        let store = MemoryStore::new();
        let err = bulk_import_users(&store, &csv("username,email\nana,ana@x.test\n"), 8)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ImportError::FileFormat(FileFormatError::TooLarge { limit: 8, .. })
        );
    }
}
