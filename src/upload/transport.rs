use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use tracing::{debug, warn};

use crate::staging::staged_file::FileSource;
use crate::upload::progress::{ProgressReader, ProgressSink};
use crate::workflow::error::IntakeError;

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A multipart file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub file_name: String,
    pub byte_size: u64,
    pub source: FileSource,
    /// Extra text parts such as `client_id` and `client_name`
    pub fields: Vec<(String, String)>,
}

/// Everything the workflow needs from the network.
///
/// Implementations must be shareable across the per-file upload threads.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<TransportResponse, IntakeError>;

    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, IntakeError>;

    fn upload(
        &self,
        request: &UploadRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, IntakeError>;
}

// ============================================================================
// reqwest-backed transport
// ============================================================================

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client. `timeout` of `None` waits for as long as it takes.
    pub fn new(timeout: Option<Duration>) -> Result<Self, IntakeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError::Config(format!("could not build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn finish(
        url: &str,
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<TransportResponse, IntakeError> {
        let response = result.map_err(|e| IntakeError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| IntakeError::Transport {
            url: url.to_string(),
            message: format!("could not read response body: {}", e),
        })?;
        debug!(url, status, bytes = body.len(), "HTTP response");
        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<TransportResponse, IntakeError> {
        Self::finish(url, self.client.get(url).send())
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, IntakeError> {
        Self::finish(url, self.client.post(url).json(body).send())
    }

    fn upload(
        &self,
        request: &UploadRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, IntakeError> {
        let reader = request
            .source
            .open()
            .map_err(|e| IntakeError::io(format!("opening {}", request.file_name), e))?;
        let reader = ProgressReader::new(reader, request.byte_size, progress);

        let part = multipart::Part::reader_with_length(reader, request.byte_size)
            .file_name(request.file_name.clone());
        let mut form = multipart::Form::new().part("file", part);
        for (name, value) in &request.fields {
            form = form.text(name.clone(), value.clone());
        }

        Self::finish(&request.url, self.client.post(&request.url).multipart(form).send())
    }
}

// ============================================================================
// Scripted transport (for testing without a backend)
// ============================================================================

/// What a scripted route answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond { status: u16, body: String },
    Fail(String),
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        MockReply::Respond {
            status,
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        MockReply::Respond {
            status,
            body: body.to_string(),
        }
    }
}

/// A request seen by `MockTransport`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub file_name: Option<String>,
    pub fields: Vec<(String, String)>,
    pub json: Option<Value>,
}

/// Answers from a table of routes and records every request.
///
/// Uploads are matched by file name, everything else by method and URL.
/// Unmatched requests get a 404 with a JSON `message`.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, url: &str, reply: MockReply) -> Self {
        self.route(format!("GET {}", url), reply)
    }

    pub fn on_post(self, url: &str, reply: MockReply) -> Self {
        self.route(format!("POST {}", url), reply)
    }

    pub fn on_upload(self, file_name: &str, reply: MockReply) -> Self {
        self.route(format!("UPLOAD {}", file_name), reply)
    }

    fn route(self, key: String, reply: MockReply) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(key, reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: RecordedRequest) {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(e) => warn!("mock transport lock poisoned: {}", e),
        }
    }

    fn answer(&self, key: &str, url: &str) -> Result<TransportResponse, IntakeError> {
        let reply = self
            .routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(key).cloned());

        match reply {
            Some(MockReply::Respond { status, body }) => Ok(TransportResponse { status, body }),
            Some(MockReply::Fail(message)) => Err(IntakeError::Transport {
                url: url.to_string(),
                message,
            }),
            None => Ok(TransportResponse::new(404, r#"{"message":"no route"}"#)),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<TransportResponse, IntakeError> {
        self.record(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            file_name: None,
            fields: Vec::new(),
            json: None,
        });
        self.answer(&format!("GET {}", url), url)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, IntakeError> {
        self.record(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            file_name: None,
            fields: Vec::new(),
            json: Some(body.clone()),
        });
        self.answer(&format!("POST {}", url), url)
    }

    fn upload(
        &self,
        request: &UploadRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, IntakeError> {
        self.record(RecordedRequest {
            method: "UPLOAD",
            url: request.url.clone(),
            file_name: Some(request.file_name.clone()),
            fields: request.fields.clone(),
            json: None,
        });

        // Drain the body so progress is reported the same way a real send would
        let reader = request
            .source
            .open()
            .map_err(|e| IntakeError::io(format!("opening {}", request.file_name), e))?;
        let mut reader = ProgressReader::new(reader, request.byte_size, progress);
        let mut sink = Vec::new();
        reader
            .read_to_end(&mut sink)
            .map_err(|e| IntakeError::io(format!("reading {}", request.file_name), e))?;

        self.answer(&format!("UPLOAD {}", request.file_name), &request.url)
    }
}
