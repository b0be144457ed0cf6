use serde::Serialize;
use serde_json::Value;

use crate::review::flatten::{FlattenLimits, FormField, flatten};
use crate::staging::staged_file::FileId;
use crate::upload::outcome::UploadOutcome;
use crate::upload::uploader::join_url;
use crate::workflow::error::IntakeError;
use crate::workflow::profile::WorkflowProfile;

// ============================================================================
// Review form: editable view of one extraction result
// ============================================================================

/// A run of consecutive fields sharing the same parent object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSection {
    /// Dotted path of the parent object, empty for top-level fields
    pub path: String,
    /// Key of the parent object, shown as the section heading
    pub label: String,
    /// Number of path segments in `path`
    pub depth: usize,
    /// Indices into `ReviewForm::fields`
    pub field_indices: Vec<usize>,
}

/// Link to the processed document for side-by-side review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPreview {
    /// Result key the reference came from
    pub field: String,
    /// Reference exactly as returned
    pub reference: String,
    /// Reference resolved against the base URL
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewForm {
    pub file_id: FileId,
    pub file_name: String,
    pub fields: Vec<FormField>,
    pub sections: Vec<FormSection>,
    pub preview: Option<DocumentPreview>,
}

impl ReviewForm {
    /// Build the form for a successful upload.
    pub fn render(
        outcome: &UploadOutcome,
        profile: &WorkflowProfile,
        base_url: &str,
        limits: &FlattenLimits,
    ) -> Result<Self, IntakeError> {
        let document = outcome.result_document.as_ref().ok_or_else(|| {
            IntakeError::ResponseShape(format!("{} has no result to review", outcome.file_name))
        })?;
        let mut form = Self::from_document(document, limits)?;
        form.file_id = outcome.file_id;
        form.file_name = outcome.file_name.clone();
        form.preview = find_preview(document, &profile.preview_fields, base_url);
        Ok(form)
    }

    /// Build a form from any result document, without preview or source.
    pub fn from_document(document: &Value, limits: &FlattenLimits) -> Result<Self, IntakeError> {
        let fields = flatten(document, limits)?;
        let sections = group_sections(&fields);
        Ok(Self {
            file_id: FileId(0),
            file_name: String::new(),
            fields,
            sections,
            preview: None,
        })
    }

    pub fn field(&self, dotted_path: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.dotted_path == dotted_path)
    }

    /// Edit one field in place.
    pub fn set_field(&mut self, dotted_path: &str, value: &str) -> Result<(), IntakeError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.dotted_path == dotted_path)
            .ok_or_else(|| IntakeError::UnknownField(dotted_path.to_string()))?;
        field.value = value.to_string();
        Ok(())
    }

    pub fn section_fields<'a>(&'a self, section: &'a FormSection) -> impl Iterator<Item = &'a FormField> {
        section.field_indices.iter().filter_map(|&i| self.fields.get(i))
    }
}

fn parent_path(dotted_path: &str) -> &str {
    dotted_path.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

fn group_sections(fields: &[FormField]) -> Vec<FormSection> {
    let mut sections: Vec<FormSection> = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let parent = parent_path(&field.dotted_path);
        match sections.last_mut() {
            Some(section) if section.path == parent => section.field_indices.push(index),
            _ => sections.push(FormSection {
                path: parent.to_string(),
                label: parent.rsplit('.').next().unwrap_or("").to_string(),
                depth: if parent.is_empty() {
                    0
                } else {
                    parent.split('.').count()
                },
                field_indices: vec![index],
            }),
        }
    }

    sections
}

/// First preview key present at the top level with a non-empty string.
fn find_preview(document: &Value, keys: &[String], base_url: &str) -> Option<DocumentPreview> {
    keys.iter().find_map(|key| {
        let reference = document.get(key)?.as_str()?.trim();
        if reference.is_empty() {
            return None;
        }
        Some(DocumentPreview {
            field: key.clone(),
            reference: reference.to_string(),
            url: join_url(base_url, reference),
        })
    })
}
