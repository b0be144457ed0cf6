use serde_json::{Map, Value};

use crate::review::flatten::FormField;

/// Rebuild a nested payload from flattened fields.
///
/// Starts from `seed` (a template or an empty object) and places every
/// field's value at its dotted path, creating objects along the way. A
/// non-object sitting where an intermediate object is needed is replaced.
/// Numbers, booleans and nulls come back as such while their text still
/// parses that way.
pub fn collect(fields: &[FormField], seed: Value) -> Value {
    let mut root = match seed {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for field in fields {
        insert_path(&mut root, &field.dotted_path, field.to_json());
    }

    Value::Object(root)
}

/// Same as `collect` from an empty object.
pub fn unflatten(fields: &[FormField]) -> Value {
    collect(fields, Value::Object(Map::new()))
}

fn insert_path(root: &mut Map<String, Value>, dotted_path: &str, value: Value) {
    let mut segments: Vec<&str> = dotted_path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        current = map;
    }

    current.insert(leaf.to_string(), value);
}

/// Look up a dotted path in a payload.
pub fn resolve_path<'a>(payload: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    dotted_path
        .split('.')
        .try_fold(payload, |node, segment| node.as_object()?.get(segment))
}
