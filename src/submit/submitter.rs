use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use crate::upload::transport::Transport;
use crate::workflow::error::IntakeError;

/// How the webhook responded to a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SubmitOutcome {
    /// 2xx with a JSON body
    Accepted(Value),
    /// 2xx but the body was empty or not JSON
    AcceptedUnreadable,
    /// Any other status
    Rejected { status: u16, message: String },
    /// No response at all
    TransportFailed(String),
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_) | SubmitOutcome::AcceptedUnreadable)
    }

    /// Text for the notification shown after submitting.
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Accepted(body) => format!(
                "Data submitted successfully!\n{}",
                serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
            ),
            SubmitOutcome::AcceptedUnreadable => {
                "Data submitted, but the webhook response could not be read.".to_string()
            }
            SubmitOutcome::Rejected { status, message } => {
                format!("Error: webhook answered HTTP {}: {}", status, message)
            }
            SubmitOutcome::TransportFailed(message) => {
                format!("Failed to submit data: {}", message)
            }
        }
    }
}

/// Posts reviewed payloads to the webhook.
pub struct Submitter<'a> {
    transport: &'a dyn Transport,
    webhook_url: &'a str,
}

impl<'a> Submitter<'a> {
    pub fn new(transport: &'a dyn Transport, webhook_url: &'a str) -> Self {
        Self {
            transport,
            webhook_url,
        }
    }

    pub fn submit(&self, payload: &Value) -> SubmitOutcome {
        info!(url = self.webhook_url, "submitting payload");

        let response = match self.transport.post_json(self.webhook_url, payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "webhook unreachable");
                return SubmitOutcome::TransportFailed(e.to_string());
            }
        };

        if !response.is_success() {
            let message = serde_json::from_str::<Value>(&response.body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| response.body.trim().to_string());
            warn!(status = response.status, %message, "webhook rejected payload");
            return SubmitOutcome::Rejected {
                status: response.status,
                message,
            };
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => SubmitOutcome::Accepted(body),
            Err(e) => {
                debug!(error = %e, "webhook response is not JSON");
                SubmitOutcome::AcceptedUnreadable
            }
        }
    }
}

/// Hex SHA-1 of the payload's compact JSON text.
pub fn payload_fingerprint(payload: &Value) -> String {
    let mut hasher = Sha1::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write the payload as pretty JSON into `dir`, named by its fingerprint.
pub fn write_backup(payload: &Value, dir: &Path) -> Result<PathBuf, IntakeError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| IntakeError::io(format!("creating {}", dir.display()), e))?;

    let fingerprint = payload_fingerprint(payload);
    let path = dir.join(format!("submission-{}.json", &fingerprint[..12]));
    let text = serde_json::to_string_pretty(payload)
        .map_err(|e| IntakeError::json("serializing backup", e))?;
    std::fs::write(&path, text)
        .map_err(|e| IntakeError::io(format!("writing {}", path.display()), e))?;

    debug!(path = %path.display(), "wrote payload backup");
    Ok(path)
}
