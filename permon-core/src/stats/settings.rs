//! Per-stat settings: JSON objects merged over each stat's defaults

use serde_json::{Map, Number, Value};

use crate::PermonError;

/// Settings of one stat, keyed by setting name
pub type Settings = Map<String, Value>;

/// Merge `overrides` onto `defaults`.
///
/// Keys missing from the defaults are rejected, and every override is cast to
/// the JSON type of its default (`"3"` becomes `3` for a numeric default,
/// `1` becomes `"1"` for a string default).
pub fn merge_settings(
    tag: &str,
    defaults: &Settings,
    overrides: &Settings,
) -> Result<Settings, PermonError> {
    let mut merged = defaults.clone();

    for (key, value) in overrides {
        let Some(default) = defaults.get(key) else {
            let mut known: Vec<&str> = defaults.keys().map(String::as_str).collect();
            known.sort_unstable();
            return Err(invalid(
                tag,
                format!("unknown setting \"{key}\" (known: {})", known.join(", ")),
            ));
        };
        let cast = cast_like(default, value)
            .ok_or_else(|| invalid(tag, format!("setting \"{key}\" cannot be {value}")))?;
        merged.insert(key.clone(), cast);
    }

    Ok(merged)
}

fn invalid(tag: &str, reason: String) -> PermonError {
    PermonError::InvalidSettings {
        tag: tag.to_string(),
        reason,
    }
}

fn cast_like(default: &Value, value: &Value) -> Option<Value> {
    match default {
        Value::String(_) => Some(Value::String(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        Value::Bool(_) => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        Value::Number(n) => {
            let parsed = match value {
                Value::Number(v) => v.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            }?;
            if n.is_f64() {
                Number::from_f64(parsed).map(Value::Number)
            } else if parsed.is_finite() {
                Some(Value::Number(Number::from(parsed.trunc() as i64)))
            } else {
                None
            }
        }
        Value::Array(_) if value.is_array() => Some(value.clone()),
        Value::Object(_) if value.is_object() => Some(value.clone()),
        Value::Null => Some(value.clone()),
        _ => None,
    }
}

/// String setting, or `fallback` when missing
pub fn get_str<'a>(settings: &'a Settings, key: &str, fallback: &'a str) -> &'a str {
    settings.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// Non-negative integer setting, or `fallback` when missing
pub fn get_usize(settings: &Settings, key: &str, fallback: usize) -> usize {
    settings
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(fallback)
}
