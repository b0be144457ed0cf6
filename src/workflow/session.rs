use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::notify::notification::{DEFAULT_TTL, Notifier};
use crate::review::flatten::FlattenLimits;
use crate::review::form::ReviewForm;
use crate::staging::staged_file::{FileId, FileStatus, IncomingFile, StagedFile};
use crate::staging::stager::FileStager;
use crate::submit::submitter::{SubmitOutcome, Submitter, write_backup};
use crate::submit::unflatten::collect;
use crate::submit::validate::validate;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;
use crate::upload::outcome::UploadBatch;
use crate::upload::transport::Transport;
use crate::upload::uploader::{UploadObserver, Uploader};
use crate::workflow::cycle::{CycleEvent, CycleState};
use crate::workflow::error::IntakeError;
use crate::workflow::profile::WorkflowProfile;

/// Endpoints and knobs a session runs with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub webhook_url: String,
    pub limits: FlattenLimits,
    /// Where payload backups go when the profile asks for them
    pub backup_dir: Option<PathBuf>,
    pub notification_ttl: Duration,
}

impl SessionSettings {
    pub fn new(base_url: &str, webhook_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            webhook_url: webhook_url.to_string(),
            limits: FlattenLimits::default(),
            backup_dir: None,
            notification_ttl: DEFAULT_TTL,
        }
    }
}

// ============================================================================
// Review session: the whole upload-and-review cycle as one state object
// ============================================================================

/// Stage → upload → review → submit, with all state held here.
///
/// Successful uploads each produce a review form; they queue up and the
/// front of the queue is the form being edited.
pub struct ReviewSession<'a> {
    transport: &'a dyn Transport,
    profile: WorkflowProfile,
    settings: SessionSettings,
    state: CycleState,
    step: u64,
    stager: FileStager,
    reviews: VecDeque<ReviewForm>,
    notifier: Notifier,
    tracer: TraceLogger,
}

impl<'a> ReviewSession<'a> {
    pub fn new(transport: &'a dyn Transport, profile: WorkflowProfile, settings: SessionSettings) -> Self {
        let notifier = Notifier::new(settings.notification_ttl);
        Self {
            transport,
            profile,
            settings,
            state: CycleState::Idle,
            step: 0,
            stager: FileStager::new(),
            reviews: VecDeque::new(),
            notifier,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn profile(&self) -> &WorkflowProfile {
        &self.profile
    }

    pub fn stager(&self) -> &FileStager {
        &self.stager
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn upload_widget_visible(&self) -> bool {
        self.state.shows_upload_widget()
    }

    pub fn active_review(&self) -> Option<&ReviewForm> {
        self.reviews.front()
    }

    pub fn pending_reviews(&self) -> usize {
        self.reviews.len()
    }

    /// Every queued form, the active one first.
    pub fn pending_forms(&self) -> impl Iterator<Item = &ReviewForm> {
        self.reviews.iter()
    }

    fn transition(&mut self, event: CycleEvent, file: Option<&str>) -> Result<(), IntakeError> {
        self.transition_with(event, file, None)
    }

    fn transition_with(
        &mut self,
        event: CycleEvent,
        file: Option<&str>,
        detail: Option<String>,
    ) -> Result<(), IntakeError> {
        let next = self.state.apply(event)?;
        debug!(from = ?self.state, ?event, to = ?next, "cycle transition");

        let mut trace = TraceEvent::transition(self.step, self.state, event, next);
        if let Some(file) = file {
            trace = trace.with_file(file);
        }
        if let Some(detail) = detail {
            trace = trace.with_detail(detail);
        }
        self.tracer.record(&trace);

        self.step += 1;
        self.state = next;
        Ok(())
    }

    // ---- staging ----

    /// Add files. Starting from a settled cycle drops the previous batch.
    pub fn stage(&mut self, files: Vec<IncomingFile>) -> Result<Vec<FileId>, IntakeError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        if matches!(self.state, CycleState::Idle | CycleState::Failed) {
            self.stager.clear();
        }
        self.transition(CycleEvent::Stage, None)?;
        Ok(self.stager.stage(files))
    }

    /// Remove the row at `index`; a missing row is ignored.
    pub fn remove(&mut self, index: usize) -> Option<StagedFile> {
        let removed = self.stager.remove(index)?;
        if self.stager.is_empty() && self.state == CycleState::Staged {
            // Cannot fail from Staged
            let _ = self.transition(CycleEvent::Unstage, Some(&removed.name));
        }
        Some(removed)
    }

    // ---- uploading ----

    /// Upload every ready file and build review forms for the successes.
    pub fn upload(&mut self, observer: &mut dyn UploadObserver) -> Result<UploadBatch, IntakeError> {
        let has_ready = self
            .stager
            .files()
            .iter()
            .any(|f| f.status == FileStatus::Ready);
        if !has_ready {
            self.notifier.error(IntakeError::NoFilesStaged.to_string());
            return Err(IntakeError::NoFilesStaged);
        }

        self.transition(CycleEvent::StartUpload, None)?;

        let uploader = Uploader::new(self.transport, &self.settings.base_url, &self.profile);
        let batch = match uploader.upload_all(&mut self.stager, &mut self.notifier, observer) {
            Ok(batch) => batch,
            Err(e) => {
                self.transition(CycleEvent::UploadsSettled { any_success: false }, None)?;
                return Err(e);
            }
        };

        self.reviews.clear();
        for outcome in batch.successes() {
            match ReviewForm::render(
                outcome,
                &self.profile,
                &self.settings.base_url,
                &self.settings.limits,
            ) {
                Ok(form) => self.reviews.push_back(form),
                Err(e) => {
                    warn!(file = %outcome.file_name, error = %e, "result could not be rendered");
                    self.notifier
                        .error(format!("Error: {} ({})", e, outcome.file_name));
                }
            }
        }

        let any_success = !self.reviews.is_empty();
        let detail = format!(
            "{} succeeded, {} failed, {} skipped",
            batch.successes().count(),
            batch.failures().count(),
            batch.skipped.len()
        );
        self.transition_with(CycleEvent::UploadsSettled { any_success }, None, Some(detail))?;
        Ok(batch)
    }

    // ---- reviewing ----

    pub fn edit(&mut self, dotted_path: &str, value: &str) -> Result<(), IntakeError> {
        let form = self
            .reviews
            .front_mut()
            .ok_or(IntakeError::NoActiveReview)?;
        form.set_field(dotted_path, value)
    }

    /// Current payload for the active form, seeded from the profile template.
    pub fn collect(&self) -> Result<Value, IntakeError> {
        let form = self
            .active_review()
            .ok_or(IntakeError::NoActiveReview)?;
        Ok(collect(&form.fields, self.profile.payload_seed()))
    }

    /// Open a saved payload as the form under review.
    pub fn resume(&mut self, form: ReviewForm) -> Result<(), IntakeError> {
        self.transition(CycleEvent::Resume, Some(&form.file_name))?;
        self.reviews.clear();
        self.reviews.push_back(form);
        Ok(())
    }

    /// Throw the active form away.
    pub fn discard(&mut self) -> Result<Option<ReviewForm>, IntakeError> {
        if self.state != CycleState::Reviewing {
            return Ok(None);
        }
        let dropped = self.reviews.pop_front();
        let more_pending = !self.reviews.is_empty();
        self.transition(CycleEvent::Discard { more_pending }, None)?;
        Ok(dropped)
    }

    // ---- submitting ----

    /// Validate and post the active form's payload.
    ///
    /// Validation failures are returned as errors and leave the form open.
    /// Webhook failures are returned as an outcome and also leave it open.
    pub fn submit(&mut self) -> Result<SubmitOutcome, IntakeError> {
        let payload = self.collect()?;

        if let Err(e) = validate(&payload, &self.profile.required_fields) {
            self.notifier.error(e.to_string());
            return Err(e);
        }

        if self.profile.backup_before_submit {
            if let Some(dir) = &self.settings.backup_dir {
                match write_backup(&payload, dir) {
                    Ok(path) => debug!(path = %path.display(), "payload backed up"),
                    Err(e) => warn!(error = %e, "payload backup failed"),
                }
            }
        }

        let file_name = self
            .active_review()
            .map(|f| f.file_name.clone())
            .unwrap_or_default();
        self.transition(CycleEvent::Submit, Some(&file_name))?;

        let outcome = Submitter::new(self.transport, &self.settings.webhook_url).submit(&payload);
        if outcome.is_success() {
            self.notifier.success(outcome.message());
            self.reviews.pop_front();
            let more_pending = !self.reviews.is_empty();
            self.transition(CycleEvent::SubmitSucceeded { more_pending }, Some(&file_name))?;
        } else {
            self.notifier.error(outcome.message());
            self.transition_with(
                CycleEvent::SubmitFailed,
                Some(&file_name),
                Some(outcome.message()),
            )?;
        }

        Ok(outcome)
    }

    /// Drop everything and go back to idle.
    pub fn reset(&mut self) {
        self.stager.clear();
        self.reviews.clear();
        // Reset is accepted from every state
        let _ = self.transition(CycleEvent::Reset, None);
    }
}
