use crate::clients::directory::ClientPage;
use crate::notify::notification::{Notification, NotificationKind};
use crate::review::form::ReviewForm;
use crate::staging::stager::FileStager;
use crate::upload::outcome::UploadBatch;

// ============================================================================
// Console rendering: text stand-ins for the page widgets
// ============================================================================

/// Format the staged-file list.
///
/// Produces output like:
/// ```text
/// === 1 / 2 files ready for submission ===
///   [0] pdf  order-a.pdf  12.00 KB / 12.00 KB  Completed
///   [1] pdf  order-b.pdf  0.00 KB / 1.50 MB  Ready  (client: Acme)
/// ```
pub fn format_file_list(stager: &FileStager) -> String {
    let mut out = format!("=== {} ===\n", stager.summary_line());

    for row in stager.rows() {
        out.push_str(&format!(
            "  [{}] {}  {}  {}  {}",
            row.index, row.extension, row.name, row.transfer, row.status
        ));
        if let Some(client) = &row.client_name {
            out.push_str(&format!("  (client: {})", client));
        }
        out.push('\n');
    }

    out
}

/// Format a review form with nested sections indented under their key.
pub fn format_review_form(form: &ReviewForm) -> String {
    let mut out = String::new();

    if form.file_name.is_empty() {
        out.push_str("=== Review ===\n");
    } else {
        out.push_str(&format!("=== Review: {} ===\n", form.file_name));
    }

    if let Some(preview) = &form.preview {
        out.push_str(&format!("Preview: {}\n", preview.url));
    }

    for section in &form.sections {
        let indent = "  ".repeat(section.depth);
        if section.depth > 0 {
            let parent_indent = "  ".repeat(section.depth - 1);
            out.push_str(&format!("{}[{}]\n", parent_indent, section.label));
        }
        for field in form.section_fields(section) {
            out.push_str(&format!(
                "{}{} = {:?}    ({})\n",
                indent,
                field.label(),
                field.value,
                field.dotted_path
            ));
        }
    }

    out
}

/// One line per notification, newest last.
pub fn format_notifications(notifications: &[Notification]) -> String {
    notifications
        .iter()
        .map(|n| {
            let marker = match n.kind {
                NotificationKind::Success => "\u{2713}",
                NotificationKind::Error => "\u{2717}",
            };
            format!("{} {}\n", marker, n.message)
        })
        .collect()
}

/// Summary of an upload batch.
pub fn format_upload_summary(batch: &UploadBatch) -> String {
    let mut out = String::new();

    for outcome in &batch.outcomes {
        let status = outcome
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "---".to_string());
        if outcome.is_success() {
            out.push_str(&format!("\u{2713} {}  HTTP {}\n", outcome.file_name, status));
        } else {
            out.push_str(&format!(
                "\u{2717} {}  HTTP {}  {}\n",
                outcome.file_name,
                status,
                outcome.error_message.as_deref().unwrap_or("upload failed")
            ));
        }
    }

    out.push_str(&format!(
        "\n=== Uploads: {} succeeded, {} failed, {} skipped ===\n",
        batch.successes().count(),
        batch.failures().count(),
        batch.skipped.len()
    ));

    out
}

/// Client table with a pager line.
pub fn format_client_table(page: &ClientPage<'_>) -> String {
    let mut out = format!("{:<8} {:<40} {}\n", "ID", "Client", "Commission");

    if page.is_empty() {
        out.push_str("No data available\n");
    } else {
        for client in page.rows {
            out.push_str(&format!(
                "{:<8} {:<40} {}\n",
                client.id, client.clientname, client.commission
            ));
        }
    }

    out.push_str(&format!("Page {} of {}\n", page.page, page.total_pages));
    out
}
