use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::trace::trace::TraceEvent;
use crate::workflow::error::IntakeError;

struct TraceSink {
    path: PathBuf,
    file: File,
    lines: u64,
}

/// Appends one JSON line per cycle transition.
///
/// A disabled logger accepts every call and writes nothing, so sessions
/// never need to know whether tracing is configured.
pub struct TraceLogger {
    sink: Option<Mutex<TraceSink>>,
}

impl TraceLogger {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| IntakeError::io(format!("opening trace file {}", path.display()), e))?;

        debug!(path = %path.display(), "cycle trace enabled");
        Ok(Self {
            sink: Some(Mutex::new(TraceSink {
                path,
                file,
                lines: 0,
            })),
        })
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Open the configured trace file; an unusable path disables tracing.
    pub fn from_option(path: Option<&str>) -> Self {
        match path.map(|p| Self::open(p)) {
            Some(Ok(logger)) => logger,
            Some(Err(e)) => {
                warn!(error = %e, "cycle trace disabled");
                Self::disabled()
            }
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn path(&self) -> Option<PathBuf> {
        let sink = self.sink.as_ref()?.lock().ok()?;
        Some(sink.path.clone())
    }

    /// Transitions recorded by this logger so far.
    pub fn lines_written(&self) -> u64 {
        self.sink
            .as_ref()
            .and_then(|s| s.lock().ok().map(|s| s.lines))
            .unwrap_or(0)
    }

    /// Write one transition. Failures are logged, never returned.
    pub fn record(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut line = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(step = event.step, error = %e, "could not encode trace event");
                return;
            }
        };
        line.push(b'\n');

        let mut sink = match sink.lock() {
            Ok(sink) => sink,
            Err(e) => {
                warn!("trace sink lock poisoned: {}", e);
                return;
            }
        };

        // One write per line keeps lines whole when several sessions share a file
        match sink.file.write_all(&line) {
            Ok(()) => sink.lines += 1,
            Err(e) => warn!(path = %sink.path.display(), error = %e, "could not write trace event"),
        }
    }
}
