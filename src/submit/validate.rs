use serde_json::Value;

use crate::submit::unflatten::resolve_path;
use crate::workflow::error::IntakeError;

/// Required paths that do not resolve in `payload`, in the order given.
pub fn missing_paths(payload: &Value, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|path| resolve_path(payload, path).is_none())
        .cloned()
        .collect()
}

/// Check that every required dotted path is present.
///
/// Presence is all that is checked: an empty string passes.
pub fn validate(payload: &Value, required: &[String]) -> Result<(), IntakeError> {
    let missing = missing_paths(payload, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IntakeError::Validation { missing })
    }
}
