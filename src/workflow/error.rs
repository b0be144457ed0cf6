use thiserror::Error;

use crate::workflow::cycle::{CycleEvent, CycleState};

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Nothing staged when an upload was requested
    #[error("Error: No files selected for upload. Please select a file.")]
    NoFilesStaged,

    /// Profile requires a client but the file has none
    #[error("Error: No client selected for file {file}.")]
    ClientNotSelected { file: String },

    /// A user-supplied value was empty or malformed
    #[error("Please fill in all fields! ({0})")]
    MissingInput(String),

    /// Request never produced an HTTP response
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Response arrived with a status outside the accepted range
    #[error("{url} answered HTTP {status}: {message}")]
    HttpStatus { url: String, status: u16, message: String },

    /// Response body was not the JSON we expected
    #[error("JSON parse error ({context}): {source}")]
    JsonParse { context: String, source: serde_json::Error },

    /// Response parsed but is missing structure we rely on
    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    /// Result document nests deeper than the configured bound
    #[error("Result document nests deeper than {limit} levels at '{path}'")]
    DepthExceeded { path: String, limit: usize },

    /// Result document has more leaves than the configured bound
    #[error("Result document has more than {limit} fields")]
    TooManyFields { limit: usize },

    /// Payload is missing one or more required dotted paths
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    /// Review operation called while no form is open
    #[error("No review form is open")]
    NoActiveReview,

    /// Edit targets a field that is not on the form
    #[error("Field '{0}' is not on the review form")]
    UnknownField(String),

    /// State machine rejected an event
    #[error("Cannot apply {event:?} while {state:?}")]
    InvalidTransition { state: CycleState, event: CycleEvent },

    /// Named workflow profile does not exist
    #[error("Unknown workflow profile '{0}'")]
    UnknownProfile(String),

    /// Configured value could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file could not be read or written
    #[error("I/O error ({context}): {source}")]
    Io { context: String, source: std::io::Error },
}

impl IntakeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        IntakeError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        IntakeError::JsonParse {
            context: context.into(),
            source,
        }
    }

    /// Whether the error was caught locally before any network call.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            IntakeError::NoFilesStaged
                | IntakeError::ClientNotSelected { .. }
                | IntakeError::MissingInput(_)
                | IntakeError::Validation { .. }
                | IntakeError::UnknownField(_)
        )
    }
}
