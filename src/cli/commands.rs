use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::debug;

use crate::cli::config::{
    AppConfig, ResolvedEndpoints, all_profiles, build_session_settings, parse_edit,
};
use crate::clients::client_model::ClientRecord;
use crate::clients::directory::{ClientDirectory, client_page, search};
use crate::notify::console::{
    format_client_table, format_file_list, format_notifications, format_review_form,
    format_upload_summary,
};
use crate::review::form::ReviewForm;
use crate::staging::staged_file::{FileId, IncomingFile, StagedFile};
use crate::trace::logger::TraceLogger;
use crate::upload::outcome::UploadOutcome;
use crate::upload::transport::{HttpTransport, Transport};
use crate::upload::uploader::UploadObserver;
use crate::workflow::error::IntakeError;
use crate::workflow::health::{health_check, instance_banner};
use crate::workflow::profile::WorkflowProfile;
use crate::workflow::session::ReviewSession;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Resolved configuration shared by every subcommand.
pub struct CommandContext {
    pub config: AppConfig,
    pub endpoints: ResolvedEndpoints,
    pub profile_name: String,
    pub profile: WorkflowProfile,
    pub verbose: u8,
}

impl CommandContext {
    pub fn transport(&self) -> Result<HttpTransport, IntakeError> {
        HttpTransport::new(self.endpoints.timeout)
    }

    fn directory<'a>(&'a self, transport: &'a dyn Transport) -> ClientDirectory<'a> {
        ClientDirectory::new(
            transport,
            &self.endpoints.clients_list_url,
            &self.endpoints.clients_create_url,
        )
    }
}

// ============================================================================
// upload subcommand
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct UploadArgs {
    pub files: Vec<String>,
    pub client: Option<String>,
    pub edits: Vec<String>,
    pub submit: bool,
    pub output: Option<String>,
    pub backup_dir: Option<String>,
}

pub fn cmd_upload(ctx: &CommandContext, args: &UploadArgs) -> CmdResult<bool> {
    let transport = ctx.transport()?;
    let mut observer = BarObserver::new(ctx.verbose == 0);
    run_upload(ctx, &transport, args, &mut observer, &mut std::io::stdout())
}

/// Stage, upload, review and optionally submit. Returns whether the
/// requested work finished successfully.
pub fn run_upload(
    ctx: &CommandContext,
    transport: &dyn Transport,
    args: &UploadArgs,
    observer: &mut dyn UploadObserver,
    out: &mut dyn Write,
) -> CmdResult<bool> {
    let client = match &args.client {
        Some(id) => Some(ctx.directory(transport).find_client(id)?),
        None => None,
    };

    let mut incoming = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = IncomingFile::from_path(Path::new(path))
            .map_err(|e| IntakeError::io(format!("reading {}", path), e))?;
        incoming.push(match &client {
            Some(c) => file.with_client(c.clone()),
            None => file,
        });
    }

    match health_check(transport, &ctx.endpoints.base_url) {
        Ok(instance) => writeln!(out, "{}", instance_banner(&ctx.endpoints.base_url, &instance))?,
        Err(e) => debug!(error = %e, "health check failed"),
    }

    let settings = build_session_settings(&ctx.endpoints, &ctx.config, args.backup_dir.as_deref());
    let mut session = ReviewSession::new(transport, ctx.profile.clone(), settings)
        .with_tracer(TraceLogger::from_option(ctx.config.trace_file.as_deref()));

    session.stage(incoming)?;
    write!(out, "{}", format_file_list(session.stager()))?;

    let upload = session.upload(observer);
    write!(out, "{}", format_notifications(&session.notifier_mut().drain()))?;
    let batch = upload?;
    write!(out, "\n{}", format_file_list(session.stager()))?;
    write!(out, "{}", format_upload_summary(&batch))?;

    if session.active_review().is_none() {
        return Ok(false);
    }

    review_all(&mut session, &args.edits, args.output.as_deref(), args.submit, out)
}

// ============================================================================
// submit subcommand
// ============================================================================

pub fn cmd_submit(
    ctx: &CommandContext,
    payload_path: &str,
    edits: &[String],
    backup_dir: Option<&str>,
) -> CmdResult<bool> {
    let transport = ctx.transport()?;
    run_submit(ctx, &transport, payload_path, edits, backup_dir, &mut std::io::stdout())
}

/// Reopen a saved payload, apply edits and submit it.
pub fn run_submit(
    ctx: &CommandContext,
    transport: &dyn Transport,
    payload_path: &str,
    edits: &[String],
    backup_dir: Option<&str>,
    out: &mut dyn Write,
) -> CmdResult<bool> {
    let text = std::fs::read_to_string(payload_path)
        .map_err(|e| IntakeError::io(format!("reading {}", payload_path), e))?;
    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| IntakeError::json(payload_path, e))?;

    let settings = build_session_settings(&ctx.endpoints, &ctx.config, backup_dir);
    let mut form = ReviewForm::from_document(&document, &settings.limits)?;
    form.file_name = payload_path.to_string();

    let mut session = ReviewSession::new(transport, ctx.profile.clone(), settings)
        .with_tracer(TraceLogger::from_option(ctx.config.trace_file.as_deref()));
    session.resume(form)?;

    review_all(&mut session, edits, None, true, out)
}

// ============================================================================
// clients subcommand
// ============================================================================

pub fn cmd_clients_list(ctx: &CommandContext, term: Option<&str>, page: usize) -> CmdResult<()> {
    let transport = ctx.transport()?;
    run_clients_list(ctx, &transport, term, page, &mut std::io::stdout())
}

pub fn run_clients_list(
    ctx: &CommandContext,
    transport: &dyn Transport,
    term: Option<&str>,
    page: usize,
    out: &mut dyn Write,
) -> CmdResult<()> {
    let clients = ctx.directory(transport).fetch_clients()?;
    let shown: Vec<ClientRecord> = match term {
        Some(term) => search(&clients, term).into_iter().cloned().collect(),
        None => clients,
    };
    // A search always starts back on the first page
    let page = if term.is_some() { 1 } else { page };

    let page = client_page(&shown, page, ctx.config.clients.rows_per_page);
    write!(out, "{}", format_client_table(&page))?;
    Ok(())
}

pub fn cmd_clients_create(ctx: &CommandContext, name: &str, commission: &str) -> CmdResult<()> {
    let transport = ctx.transport()?;
    ctx.directory(&transport).create_client(name, commission)?;
    println!("Client created successfully!");
    Ok(())
}

// ============================================================================
// health / profiles subcommands
// ============================================================================

pub fn cmd_health(ctx: &CommandContext) -> CmdResult<()> {
    let transport = ctx.transport()?;
    let instance = health_check(&transport, &ctx.endpoints.base_url)?;
    println!("{}", instance_banner(&ctx.endpoints.base_url, &instance));
    Ok(())
}

pub fn cmd_profiles(ctx: &CommandContext) -> CmdResult<()> {
    print!("{}", format_profiles(&ctx.config, &ctx.profile_name));
    Ok(())
}

pub fn format_profiles(config: &AppConfig, selected: &str) -> String {
    let mut out = String::new();
    for (name, profile) in all_profiles(config) {
        let marker = if name == selected { "*" } else { " " };
        out.push_str(&format!(
            "{} {:<12} {:<24} required={} client={} backup={}\n",
            marker,
            name,
            profile.upload_path,
            profile.required_fields.len(),
            profile.require_client,
            profile.backup_before_submit
        ));
    }
    out
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse `path=value` edits and check each path exists on some pending form.
fn parse_edits(
    session: &ReviewSession<'_>,
    edits: &[String],
) -> Result<Vec<(String, String)>, IntakeError> {
    let mut parsed = Vec::with_capacity(edits.len());
    for edit in edits {
        let (path, value) = parse_edit(edit)?;
        if !session.pending_forms().any(|f| f.field(&path).is_some()) {
            return Err(IntakeError::UnknownField(path));
        }
        parsed.push((path, value));
    }
    Ok(parsed)
}

/// Walk every pending form: apply edits, print, save, and submit when asked.
///
/// A form that fails validation or is rejected by the webhook is reported
/// and skipped so the rest of the batch still goes out. Returns whether
/// every form made it through.
fn review_all(
    session: &mut ReviewSession<'_>,
    edits: &[String],
    output: Option<&str>,
    submit: bool,
    out: &mut dyn Write,
) -> CmdResult<bool> {
    let edits = parse_edits(session, edits)?;
    let total = session.pending_reviews();
    let mut all_ok = true;
    let mut index = 0;

    while let Some(form) = session.active_review() {
        index += 1;
        let applicable: Vec<&(String, String)> = edits
            .iter()
            .filter(|(path, _)| form.field(path).is_some())
            .collect();
        for (path, value) in applicable {
            session.edit(path, value)?;
        }

        if let Some(form) = session.active_review() {
            write!(out, "\n{}", format_review_form(form))?;
        }

        if let Some(path) = output {
            let path = numbered_output(path, index, total);
            let payload = session.collect()?;
            let text = serde_json::to_string_pretty(&payload)?;
            std::fs::write(&path, text)
                .map_err(|e| IntakeError::io(format!("writing {}", path), e))?;
            writeln!(out, "Payload written to {}", path)?;
        }

        if !submit {
            session.discard()?;
            continue;
        }

        let result = session.submit();
        write!(out, "{}", format_notifications(&session.notifier_mut().drain()))?;
        let accepted = match result {
            Ok(outcome) => outcome.is_success(),
            Err(e) if e.is_user_input() => false,
            Err(e) => return Err(e.into()),
        };
        if !accepted {
            all_ok = false;
            session.discard()?;
        }
    }

    Ok(all_ok)
}

/// `out.json` stays as given for one form; several become `out-1.json`, `out-2.json`...
fn numbered_output(path: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        return path.to_string();
    }
    let path = Path::new(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index),
    };
    path.with_file_name(name).to_string_lossy().into_owned()
}

/// One progress bar per file.
pub struct BarObserver {
    multi: MultiProgress,
    bars: HashMap<FileId, ProgressBar>,
    enabled: bool,
}

impl BarObserver {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            enabled,
        }
    }
}

impl UploadObserver for BarObserver {
    fn on_start(&mut self, file: &StagedFile) {
        if !self.enabled {
            return;
        }
        let style = ProgressStyle::with_template("{prefix:<32} [{bar:30}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(style);
        bar.set_prefix(file.name.clone());
        self.bars.insert(file.id, bar);
    }

    fn on_progress(&mut self, file_id: FileId, percent: u8) {
        if let Some(bar) = self.bars.get(&file_id) {
            bar.set_position(percent as u64);
        }
    }

    fn on_outcome(&mut self, outcome: &UploadOutcome) {
        if let Some(bar) = self.bars.get(&outcome.file_id) {
            let message = if outcome.is_success() { "Completed" } else { "Failed" };
            bar.finish_with_message(message);
        }
    }
}
