use crate::upload::transport::Transport;
use crate::upload::uploader::join_url;
use crate::workflow::error::IntakeError;

pub const HEALTH_PATH: &str = "/health_check";
const PROD_PORT: &str = "8001";

/// Ask the backend which instance is serving; returns the raw text.
pub fn health_check(transport: &dyn Transport, base_url: &str) -> Result<String, IntakeError> {
    let url = join_url(base_url, HEALTH_PATH);
    let response = transport.get(&url)?;
    if !response.is_success() {
        return Err(IntakeError::HttpStatus {
            url,
            status: response.status,
            message: "Failed to fetch container ID".to_string(),
        });
    }
    Ok(response.body.trim().to_string())
}

/// `PROD` when the base URL targets port 8001, otherwise `DEV`.
pub fn environment_label(base_url: &str) -> &'static str {
    if url_port(base_url) == Some(PROD_PORT) {
        "PROD"
    } else {
        "DEV"
    }
}

/// Title line shown above the uploader.
pub fn instance_banner(base_url: &str, instance: &str) -> String {
    format!(
        "Upload Your Work Orders - {} INSTANCE ({})",
        environment_label(base_url),
        instance
    )
}

fn url_port(url: &str) -> Option<&str> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme.split(['/', '?', '#']).next()?;
    let (_, port) = authority.rsplit_once(':')?;
    (!port.is_empty()).then_some(port)
}
