//! Response shaping (config-driven).
//!
//! A small transform pipeline applied to successful payloads before they are merged into an
//! output record or rendered for an agent. Steps are best-effort: a step that does not apply to the
//! payload's shape leaves it untouched (except `pluckField`, which always yields a list).

use crate::config::ResponseTransform;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum CompiledTransform {
    DropNulls,
    PickFields { fields: HashSet<String> },
    RedactKeys { keys: HashSet<String>, replacement: String },
    TruncateStrings { max_chars: usize },
    LimitArrays { max_items: usize },
    PluckField { field: String, default: Value },
}

/// A compiled response pipeline. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct ResponsePipeline {
    steps: Vec<CompiledTransform>,
}

impl ResponsePipeline {
    /// Compile a pipeline from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a step is configured with an empty field list or field name.
    pub fn compile(transforms: &[ResponseTransform]) -> Result<Self, String> {
        let mut steps = Vec::with_capacity(transforms.len());
        for t in transforms {
            let step = match t {
                ResponseTransform::DropNulls => CompiledTransform::DropNulls,
                ResponseTransform::PickFields { fields } => {
                    if fields.is_empty() {
                        return Err("pickFields: at least one field is required".to_string());
                    }
                    CompiledTransform::PickFields {
                        fields: fields.iter().cloned().collect(),
                    }
                }
                ResponseTransform::RedactKeys { keys, replacement } => {
                    CompiledTransform::RedactKeys {
                        keys: keys.iter().cloned().collect(),
                        replacement: replacement
                            .clone()
                            .unwrap_or_else(|| "***REDACTED***".to_string()),
                    }
                }
                ResponseTransform::TruncateStrings { max_chars } => {
                    CompiledTransform::TruncateStrings {
                        max_chars: *max_chars,
                    }
                }
                ResponseTransform::LimitArrays { max_items } => CompiledTransform::LimitArrays {
                    max_items: *max_items,
                },
                ResponseTransform::PluckField { field, default } => {
                    if field.is_empty() {
                        return Err("pluckField: field must not be empty".to_string());
                    }
                    CompiledTransform::PluckField {
                        field: field.clone(),
                        default: default.clone().unwrap_or(Value::Null),
                    }
                }
            };
            steps.push(step);
        }
        Ok(Self { steps })
    }

    /// Shorthand for a single `pluckField` step.
    #[must_use]
    pub fn pluck(field: impl Into<String>, default: Value) -> Self {
        Self {
            steps: vec![CompiledTransform::PluckField {
                field: field.into(),
                default,
            }],
        }
    }

    /// Apply the pipeline to a payload (in-place).
    pub fn apply(&self, v: &mut Value) {
        for step in &self.steps {
            match step {
                CompiledTransform::DropNulls => drop_nulls_in_place(v),
                CompiledTransform::PickFields { fields } => pick_top_level_fields(v, fields),
                CompiledTransform::RedactKeys { keys, replacement } => {
                    redact_keys_in_place(v, keys, replacement);
                }
                CompiledTransform::TruncateStrings { max_chars } => {
                    truncate_strings_in_place(v, *max_chars);
                }
                CompiledTransform::LimitArrays { max_items } => {
                    limit_arrays_in_place(v, *max_items);
                }
                CompiledTransform::PluckField { field, default } => {
                    pluck_field(v, field, default);
                }
            }
        }
    }
}

fn drop_nulls_in_place(v: &mut Value) {
    match v {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                drop_nulls_in_place(v);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                drop_nulls_in_place(v);
            }
        }
        _ => {}
    }
}

fn pick_top_level_fields(v: &mut Value, fields: &HashSet<String>) {
    let Value::Object(map) = v else {
        return;
    };
    map.retain(|k, _| fields.contains(k));
}

fn redact_keys_in_place(v: &mut Value, keys: &HashSet<String>, replacement: &str) {
    match v {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if keys.contains(k) {
                    *v = Value::String(replacement.to_string());
                    continue;
                }
                redact_keys_in_place(v, keys, replacement);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                redact_keys_in_place(v, keys, replacement);
            }
        }
        _ => {}
    }
}

fn truncate_strings_in_place(v: &mut Value, max_chars: usize) {
    match v {
        Value::String(s) => {
            if s.chars().count() > max_chars {
                *s = s.chars().take(max_chars).collect();
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                truncate_strings_in_place(v, max_chars);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                truncate_strings_in_place(v, max_chars);
            }
        }
        _ => {}
    }
}

fn limit_arrays_in_place(v: &mut Value, max_items: usize) {
    match v {
        Value::Array(arr) => {
            arr.truncate(max_items);
            for v in arr {
                limit_arrays_in_place(v, max_items);
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                limit_arrays_in_place(v, max_items);
            }
        }
        _ => {}
    }
}

fn pluck_field(v: &mut Value, field: &str, default: &Value) {
    let plucked = match v {
        Value::Array(rows) => rows
            .iter()
            .map(|row| match row.get(field) {
                Some(x) if !x.is_null() => x.clone(),
                _ => default.clone(),
            })
            .collect(),
        _ => Vec::new(),
    };
    *v = Value::Array(plucked);
}
