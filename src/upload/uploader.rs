use std::sync::mpsc;
use std::thread;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::notify::notification::Notifier;
use crate::staging::staged_file::{FileId, FileStatus, StagedFile};
use crate::staging::stager::FileStager;
use crate::upload::outcome::{UploadBatch, UploadEvent, UploadOutcome};
use crate::upload::progress::progress_percent;
use crate::upload::transport::{Transport, TransportResponse, UploadRequest};
use crate::workflow::error::IntakeError;
use crate::workflow::profile::WorkflowProfile;

/// Hooks for showing upload progress as it happens.
pub trait UploadObserver {
    fn on_start(&mut self, _file: &StagedFile) {}
    fn on_progress(&mut self, _file_id: FileId, _percent: u8) {}
    fn on_outcome(&mut self, _outcome: &UploadOutcome) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Sends staged files to the extraction backend.
pub struct Uploader<'a> {
    transport: &'a dyn Transport,
    base_url: &'a str,
    profile: &'a WorkflowProfile,
}

impl<'a> Uploader<'a> {
    pub fn new(transport: &'a dyn Transport, base_url: &'a str, profile: &'a WorkflowProfile) -> Self {
        Self {
            transport,
            base_url,
            profile,
        }
    }

    pub fn upload_url(&self) -> String {
        join_url(self.base_url, &self.profile.upload_path)
    }

    /// Upload every `Ready` file concurrently, one worker thread per file.
    ///
    /// Workers only talk to the transport; all stager and notifier updates
    /// happen here on the calling thread as events arrive. Files missing a
    /// required client are skipped and reported, the rest still go out.
    pub fn upload_all(
        &self,
        stager: &mut FileStager,
        notifier: &mut Notifier,
        observer: &mut dyn UploadObserver,
    ) -> Result<UploadBatch, IntakeError> {
        let ready: Vec<StagedFile> = stager
            .files()
            .iter()
            .filter(|f| f.status == FileStatus::Ready)
            .cloned()
            .collect();

        if ready.is_empty() {
            notifier.error(IntakeError::NoFilesStaged.to_string());
            return Err(IntakeError::NoFilesStaged);
        }

        let mut batch = UploadBatch::default();
        let mut jobs = Vec::new();
        for file in ready {
            match self.build_request(&file) {
                Ok(request) => jobs.push((file, request)),
                Err(e) => {
                    notifier.error(e.to_string());
                    batch.skipped.push((file.id, e));
                }
            }
        }

        info!(
            url = %self.upload_url(),
            files = jobs.len(),
            skipped = batch.skipped.len(),
            "starting uploads"
        );

        let transport = self.transport;
        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<UploadEvent>();

            for (file, request) in &jobs {
                observer.on_start(file);
                stager.set_status(file.id, FileStatus::Uploading(0));

                let file_id = file.id;
                let progress_tx = tx.clone();
                let done_tx = tx.clone();
                scope.spawn(move || {
                    let sink = Box::new(move |loaded: u64, total: u64| {
                        let percent = progress_percent(loaded, total);
                        let _ = progress_tx.send(UploadEvent::Progress { file_id, percent });
                    });
                    let result = transport.upload(request, sink);
                    let _ = done_tx.send(UploadEvent::Finished { file_id, result });
                });
            }
            drop(tx);

            for event in rx {
                match event {
                    UploadEvent::Progress { file_id, percent } => {
                        // Progress can trail the response; settled rows stay settled
                        let changed = stager.get(file_id).is_some_and(|f| {
                            matches!(f.status, FileStatus::Uploading(p) if p != percent)
                        });
                        if changed {
                            stager.set_status(file_id, FileStatus::Uploading(percent));
                            observer.on_progress(file_id, percent);
                        }
                    }
                    UploadEvent::Finished { file_id, result } => {
                        let Some((file, _)) = jobs.iter().find(|(f, _)| f.id == file_id) else {
                            continue;
                        };
                        let outcome = reconcile(self.profile, file, result);
                        if outcome.is_success() {
                            stager.set_status(file_id, FileStatus::Completed);
                            notifier.success(success_message(&outcome));
                        } else {
                            stager.set_status(file_id, FileStatus::Failed);
                            notifier.error(outcome.error_message.clone().unwrap_or_default());
                        }
                        observer.on_outcome(&outcome);
                        batch.outcomes.push(outcome);
                    }
                }
            }
        });

        info!(
            succeeded = batch.successes().count(),
            failed = batch.failures().count(),
            "uploads settled"
        );
        Ok(batch)
    }

    fn build_request(&self, file: &StagedFile) -> Result<UploadRequest, IntakeError> {
        let mut fields = Vec::new();
        match &file.client {
            Some(client) => {
                fields.push(("client_id".to_string(), client.id.clone()));
                fields.push(("client_name".to_string(), client.name.clone()));
            }
            None if self.profile.require_client => {
                return Err(IntakeError::ClientNotSelected {
                    file: file.name.clone(),
                });
            }
            None => {}
        }

        Ok(UploadRequest {
            url: self.upload_url(),
            file_name: file.name.clone(),
            byte_size: file.byte_size,
            source: file.source.clone(),
            fields,
        })
    }
}

/// Turn a raw transport result into an outcome under the profile's rules.
pub fn reconcile(
    profile: &WorkflowProfile,
    file: &StagedFile,
    result: Result<TransportResponse, IntakeError>,
) -> UploadOutcome {
    let response = match result {
        Ok(response) => response,
        Err(IntakeError::Transport { message, .. }) => {
            warn!(file = %file.name, %message, "upload transport error");
            return UploadOutcome::failed(
                file.id,
                &file.name,
                None,
                format!("Failed to upload {}. Please try again.", file.name),
            );
        }
        Err(e) => {
            warn!(file = %file.name, error = %e, "upload could not be sent");
            return UploadOutcome::failed(
                file.id,
                &file.name,
                None,
                format!("Failed to upload {}: {}", file.name, e),
            );
        }
    };

    let status = response.status;
    let parsed: Result<Value, _> = serde_json::from_str(&response.body);

    if !profile.accepts(status) {
        let reason = parsed
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}", status));
        debug!(file = %file.name, status, %reason, "upload rejected");
        return UploadOutcome::failed(
            file.id,
            &file.name,
            Some(status),
            format!("Error: {} ({})", reason, file.name),
        );
    }

    match parsed {
        Ok(mut body) => match body.get_mut("result").map(Value::take) {
            Some(document) if !document.is_null() => {
                UploadOutcome::succeeded(file.id, &file.name, status, document)
            }
            _ => UploadOutcome::failed(
                file.id,
                &file.name,
                Some(status),
                format!("Error: response for {} carried no result", file.name),
            ),
        },
        Err(e) => UploadOutcome::failed(
            file.id,
            &file.name,
            Some(status),
            format!("Error: response for {} was not valid JSON ({})", file.name, e),
        ),
    }
}

fn success_message(outcome: &UploadOutcome) -> String {
    let pretty = outcome
        .result_document
        .as_ref()
        .and_then(|d| serde_json::to_string_pretty(d).ok())
        .unwrap_or_default();
    format!("Success:\n{}", pretty)
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
