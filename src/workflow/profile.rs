use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Workflow profile: one parameterised upload-and-review variant
// ============================================================================

/// Everything that differs between upload widgets.
///
/// A profile names the upload endpoint, which HTTP statuses count as
/// success, the payload template pre-seeded before submission, the dotted
/// paths that must be present before the webhook is called, and where to
/// look for a document preview in the extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProfile {
    /// Path appended to the base URL for uploads, e.g. `/GPTUpload`
    pub upload_path: String,

    /// Accepted upload statuses; empty means any 2xx
    #[serde(default)]
    pub success_statuses: Vec<u16>,

    /// Payload skeleton with empty-string defaults
    #[serde(default)]
    pub schema_template: Option<Value>,

    /// Dotted paths that must resolve before submission
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Result keys holding a reference to the processed document
    #[serde(default = "default_preview_fields")]
    pub preview_fields: Vec<String>,

    /// Every staged file must carry a client before it is uploaded
    #[serde(default)]
    pub require_client: bool,

    /// Write the payload to a local JSON file before submitting
    #[serde(default)]
    pub backup_before_submit: bool,
}

fn default_preview_fields() -> Vec<String> {
    vec!["file_path".to_string()]
}

impl WorkflowProfile {
    pub fn new(upload_path: &str) -> Self {
        Self {
            upload_path: upload_path.to_string(),
            success_statuses: Vec::new(),
            schema_template: None,
            required_fields: Vec::new(),
            preview_fields: default_preview_fields(),
            require_client: false,
            backup_before_submit: false,
        }
    }

    /// Whether an upload response with this status is a success.
    pub fn accepts(&self, status: u16) -> bool {
        if self.success_statuses.is_empty() {
            (200..300).contains(&status)
        } else {
            self.success_statuses.contains(&status)
        }
    }

    /// Starting point for a submission payload.
    pub fn payload_seed(&self) -> Value {
        match &self.schema_template {
            Some(template @ Value::Object(_)) => template.clone(),
            _ => Value::Object(Default::default()),
        }
    }
}

/// Fields the extraction backend is asked to produce for a work order.
pub fn work_order_template() -> Value {
    json!({
        "access_key": "",
        "email": "",
        "fault_detail": "",
        "instruction_notes": "",
        "paymentbillingname": "",
        "paymentcompanyname": "",
        "paymentponumber": "",
        "propertymanagerdetails": {
            "payment_buyer_name": "",
            "paymentbuyeremail": "",
            "paymentbyerphone": ""
        },
        "shippingcity": "",
        "shippingemail": "",
        "shippingname": "",
        "shippingphone": "",
        "shippingpostalcode": "",
        "shippingstreet": "",
        "type": "",
        "shippingcompanyname": ""
    })
}

fn work_order_required_fields() -> Vec<String> {
    [
        "paymentponumber",
        "shippingname",
        "shippingstreet",
        "shippingpostalcode",
        "propertymanagerdetails.paymentbuyeremail",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Profiles shipped with the binary, keyed by name.
pub fn builtin_profiles() -> BTreeMap<String, WorkflowProfile> {
    let mut profiles = BTreeMap::new();

    profiles.insert("mindee".to_string(), WorkflowProfile::new("/upload"));

    profiles.insert(
        "gpt".to_string(),
        WorkflowProfile {
            schema_template: Some(work_order_template()),
            required_fields: work_order_required_fields(),
            require_client: true,
            backup_before_submit: true,
            ..WorkflowProfile::new("/GPTUpload")
        },
    );

    profiles.insert(
        "light-gpt".to_string(),
        WorkflowProfile {
            schema_template: Some(work_order_template()),
            required_fields: work_order_required_fields(),
            ..WorkflowProfile::new("/LightGPTFileUpload")
        },
    );

    profiles
}
