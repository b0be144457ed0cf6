use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflow::error::IntakeError;

pub const ARRAY_DELIMITER: &str = ", ";

/// JSON type a leaf had before it was turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeafKind {
    /// Strings, and arrays joined into one string
    #[default]
    Text,
    Number,
    Bool,
    Null,
}

impl LeafKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => LeafKind::Number,
            Value::Bool(_) => LeafKind::Bool,
            Value::Null => LeafKind::Null,
            _ => LeafKind::Text,
        }
    }

    /// Turn edited text back into JSON. Text that no longer fits the
    /// original kind is kept as a string.
    pub fn restore(self, text: &str) -> Value {
        match self {
            LeafKind::Text => Value::String(text.to_string()),
            LeafKind::Number => match serde_json::from_str::<Value>(text.trim()) {
                Ok(number @ Value::Number(_)) => number,
                _ => Value::String(text.to_string()),
            },
            LeafKind::Bool => match text.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text.to_string()),
            },
            LeafKind::Null if text.is_empty() => Value::Null,
            LeafKind::Null => Value::String(text.to_string()),
        }
    }
}

/// One editable leaf of a result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Keys from the root to this leaf joined with `.`
    pub dotted_path: String,
    pub value: String,
    /// True when the leaf sits below at least one object
    pub is_nested: bool,
    #[serde(default)]
    pub kind: LeafKind,
}

impl FormField {
    /// A text field.
    pub fn new(dotted_path: &str, value: &str) -> Self {
        Self {
            dotted_path: dotted_path.to_string(),
            value: value.to_string(),
            is_nested: dotted_path.contains('.'),
            kind: LeafKind::Text,
        }
    }

    pub fn with_kind(mut self, kind: LeafKind) -> Self {
        self.kind = kind;
        self
    }

    /// Value to place in the submission payload.
    pub fn to_json(&self) -> Value {
        self.kind.restore(&self.value)
    }

    /// Last path segment, used as the field label.
    pub fn label(&self) -> &str {
        self.dotted_path
            .rsplit('.')
            .next()
            .unwrap_or(&self.dotted_path)
    }
}

/// Bounds applied while walking an untrusted result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenLimits {
    /// Deepest object nesting accepted (root object is depth 1)
    pub max_depth: usize,
    /// Most leaves accepted
    pub max_fields: usize,
}

impl Default for FlattenLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_fields: 1000,
        }
    }
}

/// Flatten a result document into dotted-path fields, in key order.
///
/// The document must be a JSON object. Nested objects contribute path
/// segments only; every other value becomes one field.
pub fn flatten(document: &Value, limits: &FlattenLimits) -> Result<Vec<FormField>, IntakeError> {
    let root = document.as_object().ok_or_else(|| {
        IntakeError::ResponseShape(format!(
            "result document must be an object, got {}",
            json_kind(document)
        ))
    })?;

    let mut fields = Vec::new();
    walk(root, "", 1, limits, &mut fields)?;
    Ok(fields)
}

fn walk(
    object: &Map<String, Value>,
    prefix: &str,
    depth: usize,
    limits: &FlattenLimits,
    out: &mut Vec<FormField>,
) -> Result<(), IntakeError> {
    if depth > limits.max_depth {
        return Err(IntakeError::DepthExceeded {
            path: prefix.to_string(),
            limit: limits.max_depth,
        });
    }

    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(child) => walk(child, &path, depth + 1, limits, out)?,
            leaf => {
                if out.len() >= limits.max_fields {
                    return Err(IntakeError::TooManyFields {
                        limit: limits.max_fields,
                    });
                }
                out.push(FormField {
                    is_nested: !prefix.is_empty(),
                    dotted_path: path,
                    value: leaf_text(leaf),
                    kind: LeafKind::of(leaf),
                });
            }
        }
    }

    Ok(())
}

/// Display text of a non-object value.
pub fn leaf_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(ARRAY_DELIMITER),
        Value::Object(_) => value.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
