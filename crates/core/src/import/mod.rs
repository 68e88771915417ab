//! Bulk data import pipeline.
//!
//! The protocol is select -> validate -> preview -> commit -> refresh:
//!
//! - [`target`] -- static registry of importable entity kinds.
//! - [`file`] -- uploaded file handling and CSV / spreadsheet parsing.
//! - [`rules`] -- per-target row rules producing typed records.
//! - [`validator`] -- read-only validation reports.
//! - [`committer`] -- best-effort create/update of validated rows.
//! - [`users`] -- bulk user account import with generated credentials.
//! - [`status`] -- per-target record counts.
//! - [`template`] -- header-only template files.
//! - [`session`] -- client-side protocol state machine.
//! - [`store`] -- storage trait, with an in-memory implementation in [`memory`].
//!
//! Rows are independently importable: one row's failure never aborts the
//! rows after it. Only file-level failures (unreadable file, missing
//! columns, invalid data) stop an import before any row is written.

pub mod committer;
pub mod error;
pub mod file;
pub mod memory;
pub mod report;
pub mod rules;
pub mod session;
pub mod status;
pub mod store;
pub mod target;
pub mod template;
pub mod users;
pub mod validator;

pub use error::{FileFormatError, ImportError};
pub use report::{BulkUserImportResult, ImportResult, ValidationReport};
pub use target::{ImportTarget, TargetKind};
