use serde::Serialize;
use serde_json::Value;

use crate::staging::staged_file::FileId;
use crate::upload::transport::TransportResponse;
use crate::workflow::error::IntakeError;

/// Terminal result of one file's upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub file_id: FileId,
    pub file_name: String,

    /// `None` when no HTTP response was received at all
    pub http_status: Option<u16>,

    /// The `result` member of a successful response
    pub result_document: Option<Value>,

    /// Human-readable reason for a failure
    pub error_message: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(file_id: FileId, file_name: &str, status: u16, document: Value) -> Self {
        Self {
            file_id,
            file_name: file_name.to_string(),
            http_status: Some(status),
            result_document: Some(document),
            error_message: None,
        }
    }

    pub fn failed(file_id: FileId, file_name: &str, status: Option<u16>, message: String) -> Self {
        Self {
            file_id,
            file_name: file_name.to_string(),
            http_status: status,
            result_document: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_document.is_some()
    }
}

/// Messages sent from upload workers back to the control thread.
#[derive(Debug)]
pub enum UploadEvent {
    Progress { file_id: FileId, percent: u8 },
    Finished {
        file_id: FileId,
        result: Result<TransportResponse, IntakeError>,
    },
}

/// Everything one call to `upload_all` produced.
#[derive(Debug, Default)]
pub struct UploadBatch {
    /// Outcomes in the order responses arrived
    pub outcomes: Vec<UploadOutcome>,

    /// Files never sent, with the reason
    pub skipped: Vec<(FileId, IntakeError)>,
}

impl UploadBatch {
    pub fn successes(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn any_success(&self) -> bool {
        self.outcomes.iter().any(UploadOutcome::is_success)
    }
}
