use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::workflow::cycle::{CycleEvent, CycleState};

/// One line of the workflow trace file.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub from_state: String,
    pub to_state: String,
    pub event: String,

    pub file: Option<String>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn transition(step: u64, from: CycleState, event: CycleEvent, to: CycleState) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            from_state: format!("{:?}", from),
            to_state: format!("{:?}", to),
            event: format!("{:?}", event),
            file: None,
            detail: None,
        }
    }

    pub fn with_file(mut self, file: impl ToString) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
