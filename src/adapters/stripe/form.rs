//! Flattening of JSON payloads into Stripe's bracketed form encoding.
//!
//! `{"items": [{"price": "gold"}], "expand": ["latest_invoice"]}` becomes
//! `items[0][price]=gold` and `expand[]=latest_invoice`.

use serde_json::Value;

/// Flattens a JSON object into form pairs. Nulls are dropped.
///
/// On an update (`clear_empties`) an empty object or array becomes `key=`,
/// which clears the field remotely. A create has nothing to clear, so empties
/// are dropped like nulls.
pub fn encode(payload: &Value, clear_empties: bool) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            flatten(key.clone(), value, clear_empties, &mut pairs);
        }
    }
    pairs
}

fn flatten(prefix: String, value: &Value, clear_empties: bool, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix, b.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Object(map) if map.is_empty() => {
            if clear_empties {
                out.push((prefix, String::new()));
            }
        }
        Value::Array(items) if items.is_empty() => {
            if clear_empties {
                out.push((prefix, String::new()));
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(format!("{}[{}]", prefix, key), nested, clear_empties, out);
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            for item in items {
                flatten(format!("{}[]", prefix), item, clear_empties, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{}[{}]", prefix, index), item, clear_empties, out);
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// `expand[]` pairs for a retrieve or list call.
pub fn expand_params(expand: &[&str]) -> Vec<(String, String)> {
    expand
        .iter()
        .map(|path| ("expand[]".to_string(), (*path).to_string()))
        .collect()
}
