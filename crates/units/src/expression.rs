//! Per-record parameter expressions.
//!
//! A string parameter starting with `=` is an expression: every `{{ $json.path }}` placeholder is
//! replaced by the named field of the current record. A value that is exactly one placeholder keeps
//! the field's JSON type; otherwise placeholders are interpolated as text.

use crate::host::JsonObject;
use flowunit_http_tools::HttpToolsError;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("valid regex"));
static WHOLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\s*([^{}]*?)\s*\}\}$").expect("valid regex"));

/// Evaluate `value` against `record`. Non-expression values are returned unchanged.
///
/// # Errors
///
/// Returns `InvalidArguments` for placeholders that do not reference `$json`.
pub fn evaluate(value: &Value, record: &JsonObject) -> Result<Value, HttpToolsError> {
    let Value::String(raw) = value else {
        return Ok(value.clone());
    };
    let Some(expr) = raw.strip_prefix('=') else {
        return Ok(value.clone());
    };

    if let Some(caps) = WHOLE.captures(expr.trim()) {
        return lookup(&caps[1], record);
    }

    let mut failure = None;
    let text = PLACEHOLDER.replace_all(expr, |caps: &Captures| match lookup(&caps[1], record) {
        Ok(Value::String(s)) => s,
        Ok(Value::Null) => String::new(),
        Ok(other) => other.to_string(),
        Err(e) => {
            failure.get_or_insert(e);
            String::new()
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(Value::String(text.into_owned())),
    }
}

fn lookup(expr: &str, record: &JsonObject) -> Result<Value, HttpToolsError> {
    let Some(path) = expr.strip_prefix("$json") else {
        return Err(HttpToolsError::invalid(format!(
            "unsupported expression '{expr}' (only $json.<field> is supported)"
        )));
    };

    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let Some(first) = segments.next() else {
        return Ok(Value::Object(record.clone()));
    };

    let mut current = record.get(first);
    for seg in segments {
        current = current.and_then(|v| match v {
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => v.get(seg),
        });
    }
    Ok(current.cloned().unwrap_or(Value::Null))
}
