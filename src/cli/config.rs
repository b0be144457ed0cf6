use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::review::flatten::FlattenLimits;
use crate::workflow::error::IntakeError;
use crate::workflow::profile::{WorkflowProfile, builtin_profiles};
use crate::workflow::session::SessionSettings;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "workorder-intake",
    version,
    about = "Upload work orders for extraction, review the result and forward it to the webhook"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: intake.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Extraction backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Webhook that receives reviewed payloads
    #[arg(long, global = true)]
    pub webhook_url: Option<String>,

    /// Workflow profile: mindee, gpt, light-gpt or one from the config file
    #[arg(long, global = true)]
    pub profile: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files, review the extracted fields and optionally submit
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<String>,

        /// Client id attached to every file
        #[arg(long)]
        client: Option<String>,

        /// Field edits as dotted.path=value (repeatable)
        #[arg(long = "set")]
        edits: Vec<String>,

        /// Submit the first reviewed form to the webhook
        #[arg(long)]
        submit: bool,

        /// Write the reviewed payload to this JSON file
        #[arg(short, long)]
        output: Option<String>,

        /// Directory for payload backups taken before submitting
        #[arg(long)]
        backup_dir: Option<String>,
    },

    /// Review a saved payload JSON file and submit it
    Submit {
        /// Payload JSON file (as written by `upload --output`)
        #[arg(long)]
        payload: String,

        /// Field edits as dotted.path=value (repeatable)
        #[arg(long = "set")]
        edits: Vec<String>,

        /// Directory for payload backups taken before submitting
        #[arg(long)]
        backup_dir: Option<String>,
    },

    /// Browse or create clients
    Clients {
        #[command(subcommand)]
        action: ClientsAction,
    },

    /// Show which backend instance is serving
    Health,

    /// List the available workflow profiles
    Profiles,
}

#[derive(Subcommand, Debug)]
pub enum ClientsAction {
    /// List clients, optionally filtered by name
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,

        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Create a client
    Create {
        /// Company name
        #[arg(long)]
        name: String,

        /// Commission
        #[arg(long)]
        commission: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://dev.smarterappliances.co.uk/Clientresponse/testWorkorders";
pub const DEFAULT_CLIENTS_LIST_URL: &str =
    "https://v3.dandsappliances.com/index.php?r=api/clients-list";
pub const DEFAULT_CLIENTS_CREATE_URL: &str =
    "https://v3.dandsappliances.com/index.php?r=api/clients";

/// Optional YAML config file: `intake.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Profile used when `--profile` is not given
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Extra profiles, or overrides of the built-in ones
    #[serde(default)]
    pub profiles: BTreeMap<String, WorkflowProfile>,

    #[serde(default)]
    pub limits: FlattenLimits,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub clients: ClientsConfig,

    /// JSONL file receiving workflow transitions
    pub trace_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            profile: default_profile(),
            profiles: BTreeMap::new(),
            limits: FlattenLimits::default(),
            review: ReviewConfig::default(),
            clients: ClientsConfig::default(),
            trace_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
    pub webhook_url: Option<String>,
    pub clients_list_url: Option<String>,
    pub clients_create_url: Option<String>,

    /// Per-request timeout; unset waits indefinitely
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub backup_dir: Option<String>,

    #[serde(default = "default_five")]
    pub notification_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            notification_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    #[serde(default = "default_ten")]
    pub rows_per_page: usize,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self { rows_per_page: 10 }
    }
}

// Serde default helpers
fn default_profile() -> String { "gpt".to_string() }
fn default_five() -> u64 { 5 }
fn default_ten() -> usize { 10 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("intake.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring malformed config '{}': {}", config_path, e);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Resolution (CLI > config file > environment > defaults)
// ============================================================================

/// Endpoints after all sources have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoints {
    pub base_url: String,
    pub webhook_url: String,
    pub clients_list_url: String,
    pub clients_create_url: String,
    pub timeout: Option<Duration>,
}

fn pick(cli: Option<&str>, config: Option<&str>, env_key: &str, default: &str) -> String {
    cli.map(str::to_string)
        .or_else(|| config.map(str::to_string))
        .or_else(|| std::env::var(env_key).ok())
        .unwrap_or_else(|| default.to_string())
}

pub fn resolve_endpoints(cli: &Cli, config: &AppConfig) -> ResolvedEndpoints {
    let endpoints = &config.endpoints;
    ResolvedEndpoints {
        base_url: pick(
            cli.base_url.as_deref(),
            endpoints.base_url.as_deref(),
            "INTAKE_BASE_URL",
            DEFAULT_BASE_URL,
        ),
        webhook_url: pick(
            cli.webhook_url.as_deref(),
            endpoints.webhook_url.as_deref(),
            "INTAKE_WEBHOOK_URL",
            DEFAULT_WEBHOOK_URL,
        ),
        clients_list_url: pick(
            None,
            endpoints.clients_list_url.as_deref(),
            "INTAKE_CLIENTS_LIST_URL",
            DEFAULT_CLIENTS_LIST_URL,
        ),
        clients_create_url: pick(
            None,
            endpoints.clients_create_url.as_deref(),
            "INTAKE_CLIENTS_CREATE_URL",
            DEFAULT_CLIENTS_CREATE_URL,
        ),
        timeout: endpoints.timeout_secs.map(Duration::from_secs),
    }
}

/// Built-in profiles overlaid with the config file's.
pub fn all_profiles(config: &AppConfig) -> BTreeMap<String, WorkflowProfile> {
    let mut profiles = builtin_profiles();
    for (name, profile) in &config.profiles {
        profiles.insert(name.clone(), profile.clone());
    }
    profiles
}

pub fn resolve_profile(
    cli_profile: Option<&str>,
    config: &AppConfig,
) -> Result<(String, WorkflowProfile), IntakeError> {
    let name = cli_profile.unwrap_or(&config.profile).to_string();
    let profile = all_profiles(config)
        .remove(&name)
        .ok_or_else(|| IntakeError::UnknownProfile(name.clone()))?;
    Ok((name, profile))
}

/// Session settings from resolved endpoints and config.
pub fn build_session_settings(
    endpoints: &ResolvedEndpoints,
    config: &AppConfig,
    backup_dir: Option<&str>,
) -> SessionSettings {
    let mut settings = SessionSettings::new(&endpoints.base_url, &endpoints.webhook_url);
    settings.limits = config.limits;
    settings.backup_dir = backup_dir
        .or(config.review.backup_dir.as_deref())
        .map(PathBuf::from);
    settings.notification_ttl = Duration::from_secs(config.review.notification_secs);
    settings
}

/// Split a `dotted.path=value` edit. The value may itself contain `=`.
pub fn parse_edit(edit: &str) -> Result<(String, String), IntakeError> {
    let (path, value) = edit
        .split_once('=')
        .ok_or_else(|| IntakeError::MissingInput(format!("edit '{}' is not path=value", edit)))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(IntakeError::MissingInput(format!("edit '{}' has no path", edit)));
    }
    Ok((path.to_string(), value.to_string()))
}
