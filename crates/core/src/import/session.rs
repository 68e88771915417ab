//! Operator-side import protocol as an explicit state machine.
//!
//! ```text
//! Idle --select_file--> FileSelected --begin_validation--> Validating
//! Validating --complete_validation--> Validated --begin_commit--> Committing
//! Committing --complete_commit--> Completed
//! Validating | Committing --fail--> Failed
//! any --reset--> Idle
//! ```
//!
//! Only one request may be in flight at a time. A commit can only start from
//! a `Validated` state whose report is valid; selecting another file or
//! target discards the report.

use super::committer::ImportRequest;
use super::error::ImportError;
use super::file::UploadedFile;
use super::report::{ImportResult, ValidationReport};
use super::target::TargetKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot {action} while a request is in flight")]
    InFlight { action: &'static str },

    #[error("Cannot {action}: no file selected")]
    NoFile { action: &'static str },

    #[error("Cannot {action} in state {state}")]
    Unexpected {
        action: &'static str,
        state: &'static str,
    },

    #[error("The file has validation issues; fix them before importing")]
    InvalidReport,
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    FileSelected,
    Validating,
    Validated(ValidationReport),
    Committing,
    Completed(ImportResult),
    Failed(ImportError),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileSelected => "file_selected",
            Self::Validating => "validating",
            Self::Validated(_) => "validated",
            Self::Committing => "committing",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Validating | Self::Committing)
    }
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    target: TargetKind,
    file: Option<UploadedFile>,
    state: SessionState,
}

impl ImportSession {
    pub fn new(target: TargetKind) -> Self {
        Self {
            target,
            file: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    /// The current report, if the session is in `Validated`.
    pub fn report(&self) -> Option<&ValidationReport> {
        match &self.state {
            SessionState::Validated(report) => Some(report),
            _ => None,
        }
    }

    fn ensure_not_in_flight(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.state.is_in_flight() {
            return Err(TransitionError::InFlight { action });
        }
        Ok(())
    }

    pub fn select_file(&mut self, file: UploadedFile) -> Result<(), TransitionError> {
        self.ensure_not_in_flight("select a file")?;
        self.file = Some(file);
        self.state = SessionState::FileSelected;
        Ok(())
    }

    pub fn change_target(&mut self, target: TargetKind) -> Result<(), TransitionError> {
        self.ensure_not_in_flight("change the import type")?;
        self.target = target;
        self.state = if self.file.is_some() {
            SessionState::FileSelected
        } else {
            SessionState::Idle
        };
        Ok(())
    }

    /// Start validating the selected file. Returns what to send.
    pub fn begin_validation(&mut self) -> Result<(TargetKind, UploadedFile), TransitionError> {
        const ACTION: &str = "validate";
        self.ensure_not_in_flight(ACTION)?;
        let file = self
            .file
            .clone()
            .ok_or(TransitionError::NoFile { action: ACTION })?;
        self.state = SessionState::Validating;
        Ok((self.target, file))
    }

    pub fn complete_validation(&mut self, report: ValidationReport) -> Result<(), TransitionError> {
        self.expect_state("complete validation", |s| matches!(s, SessionState::Validating))?;
        self.state = SessionState::Validated(report);
        Ok(())
    }

    /// Start committing. Requires a valid report for the current file and target.
    pub fn begin_commit(&mut self, update_existing: bool) -> Result<ImportRequest, TransitionError> {
        const ACTION: &str = "import";
        self.ensure_not_in_flight(ACTION)?;
        match &self.state {
            SessionState::Validated(report) if report.valid => {}
            SessionState::Validated(_) => return Err(TransitionError::InvalidReport),
            other => {
                return Err(TransitionError::Unexpected {
                    action: ACTION,
                    state: other.name(),
                })
            }
        }
        let file = self
            .file
            .clone()
            .ok_or(TransitionError::NoFile { action: ACTION })?;
        self.state = SessionState::Committing;
        Ok(ImportRequest::new(self.target, file, update_existing))
    }

    /// Record the commit outcome. A completed commit discards the file.
    pub fn complete_commit(&mut self, result: ImportResult) -> Result<(), TransitionError> {
        self.expect_state("complete the import", |s| matches!(s, SessionState::Committing))?;
        if result.success {
            self.file = None;
        }
        self.state = SessionState::Completed(result);
        Ok(())
    }

    /// Record a failed request (for example a transport error). The file is kept.
    pub fn fail(&mut self, error: ImportError) -> Result<(), TransitionError> {
        self.expect_state("record a failure", SessionState::is_in_flight)?;
        self.state = SessionState::Failed(error);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.file = None;
        self.state = SessionState::Idle;
    }

    fn expect_state(
        &self,
        action: &'static str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<(), TransitionError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(TransitionError::Unexpected {
                action,
                state: self.state.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::committer::commit;
    use crate::import::memory::MemoryStore;
    use crate::import::validator::validate;
    use assert_matches::assert_matches;

    fn suppliers_file() -> UploadedFile {
        UploadedFile::csv("suppliers.csv", "name,city\nOak,Oslo\nBirch,Bergen\n")
    }

    #[tokio::test]
    async fn full_protocol_round() {
        let store = MemoryStore::new();
        let mut session = ImportSession::new(TargetKind::Suppliers);
        session.select_file(suppliers_file()).unwrap();

        let (kind, file) = session.begin_validation().unwrap();
        session.complete_validation(validate(&file, kind.target())).unwrap();
        assert!(session.report().unwrap().valid);

        let request = session.begin_commit(false).unwrap();
        assert_matches!(session.state(), SessionState::Committing);
        session.complete_commit(commit(&store, &request).await).unwrap();

        assert_matches!(session.state(), SessionState::Completed(r) => {
            assert_eq!(r.successful_imports, 2);
        });
        assert!(session.file().is_none());
    }

    #[test]
    fn commit_requires_a_valid_report() {
        let mut session = ImportSession::new(TargetKind::Suppliers);
        assert_matches!(
            session.begin_commit(false),
            Err(TransitionError::Unexpected { state: "idle", .. })
        );

        session
            .select_file(UploadedFile::csv("s.csv", "name\n\n"))
            .unwrap();
        let (kind, file) = session.begin_validation().unwrap();
        session.complete_validation(validate(&file, kind.target())).unwrap();
        assert_eq!(session.begin_commit(false).unwrap_err(), TransitionError::InvalidReport);
        assert_matches!(session.state(), SessionState::Validated(_));
    }

    #[test]
    fn second_request_while_in_flight_is_rejected() {
        let mut session = ImportSession::new(TargetKind::Suppliers);
        session.select_file(suppliers_file()).unwrap();
        session.begin_validation().unwrap();

        assert_matches!(session.begin_validation(), Err(TransitionError::InFlight { .. }));
        assert_matches!(session.begin_commit(true), Err(TransitionError::InFlight { .. }));
        assert_matches!(
            session.select_file(suppliers_file()),
            Err(TransitionError::InFlight { .. })
        );
        assert_matches!(session.state(), SessionState::Validating);
    }

    #[test]
    fn changing_target_discards_the_report() {
        let mut session = ImportSession::new(TargetKind::Suppliers);
        session.select_file(suppliers_file()).unwrap();
        let (kind, file) = session.begin_validation().unwrap();
        session.complete_validation(validate(&file, kind.target())).unwrap();

        session.change_target(TargetKind::Plants).unwrap();
        assert!(session.report().is_none());
        assert_matches!(session.state(), SessionState::FileSelected);
        assert_matches!(session.begin_commit(false), Err(TransitionError::Unexpected { .. }));
    }

    #[test]
    fn network_failure_keeps_the_file_for_retry() {
        let mut session = ImportSession::new(TargetKind::Clients);
        session.select_file(suppliers_file()).unwrap();
        session.begin_validation().unwrap();
        session
            .fail(ImportError::Network("connection reset".into()))
            .unwrap();

        assert_matches!(session.state(), SessionState::Failed(ImportError::Network(_)));
        assert!(session.file().is_some());
        assert!(session.begin_validation().is_ok());
    }

    #[test]
    fn fail_outside_a_request_is_illegal() {
        let mut session = ImportSession::new(TargetKind::Clients);
        assert_matches!(
            session.fail(ImportError::Network("x".into())),
            Err(TransitionError::Unexpected { state: "idle", .. })
        );
        session.reset();
        assert_matches!(session.begin_validation(), Err(TransitionError::NoFile { .. }));
    }
}
