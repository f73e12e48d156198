//! Input merging
//!
//! Instance inputs are layered in this order, later layers winning:
//! file `inputs` -> `commandInputs.<operation>` -> `--inputs key=value` pairs.

use serde_json::{Map, Value};

/// Deep-merge `overlay` into `base`.
///
/// Mappings merge key by key; any other overlay value replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Parse `key=value` pairs given on the command line into an inputs mapping.
///
/// Values are typed: JSON literals are parsed as JSON, comma separated
/// values become sequences, everything else stays a string. Only the first
/// `=` splits key from value.
pub fn parse_input_pairs<S: AsRef<str>>(pairs: &[S]) -> anyhow::Result<Value> {
    let mut inputs = Map::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid input '{}': expected KEY=VALUE", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid input '{}': key must not be empty", pair);
        }
        inputs.insert(key.to_string(), typed_input_value(raw));
    }
    Ok(Value::Object(inputs))
}

fn typed_input_value(raw: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return value;
    }
    if raw.contains(',') {
        return Value::Array(raw.split(',').map(typed_input_value).collect());
    }
    Value::String(raw.to_string())
}
