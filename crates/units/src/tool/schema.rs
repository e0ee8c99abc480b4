//! Tool argument contracts.
//!
//! A [`ToolArgumentSchema`] is both what the agent is shown (as JSON Schema) and what the tool
//! enforces at call time: defaults are filled in, clamp-policy bounds are applied, and everything
//! else is validated with `jsonschema`. Violations are reported in one shape:
//!
//! ```json
//! { "type": "validation-errors", "violations": [ { "type": "invalid-parameter", ... } ] }
//! ```

use crate::host::JsonObject;
use flowunit_http_tools::HttpToolsError;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// What happens to a numeric value outside its declared bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundPolicy {
    #[default]
    Reject,
    Clamp,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    ty: FieldType,
    description: Option<String>,
    required: bool,
    default: Option<Value>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    policy: BoundPolicy,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            required: false,
            default: None,
            minimum: None,
            maximum: None,
            policy: BoundPolicy::Reject,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn bounds(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: BoundPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.ty.as_str()));
        if let Some(d) = &self.description {
            prop.insert("description".into(), json!(d));
        }
        if let Some(d) = &self.default {
            prop.insert("default".into(), d.clone());
        }
        // Clamped bounds are not advertised as hard limits: out-of-range input is accepted.
        if self.policy == BoundPolicy::Reject {
            if let Some(min) = self.minimum {
                prop.insert("minimum".into(), bound_json(min));
            }
            if let Some(max) = self.maximum {
                prop.insert("maximum".into(), bound_json(max));
            }
        }
        Value::Object(prop)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn clamp(&self, value: &mut Value) {
        if self.policy != BoundPolicy::Clamp {
            return;
        }
        let Some(n) = value.as_f64() else {
            return;
        };
        let mut clamped = n;
        if let Some(max) = self.maximum {
            clamped = clamped.min(max);
        }
        if let Some(min) = self.minimum {
            clamped = clamped.max(min);
        }
        if clamped != n {
            *value = if self.ty == FieldType::Integer {
                json!(clamped.trunc() as i64)
            } else {
                json!(clamped)
            };
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn bound_json(v: f64) -> Value {
    if v.fract() == 0.0 {
        json!(v as i64)
    } else {
        json!(v)
    }
}

/// Declared argument contract of one tool. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct ToolArgumentSchema {
    fields: Vec<FieldSpec>,
}

impl ToolArgumentSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// JSON Schema (`type: object`) describing the arguments.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for f in &self.fields {
            properties.insert(f.name.clone(), f.to_json_schema());
            if f.required {
                required.push(Value::String(f.name.clone()));
            }
        }
        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    /// Validate agent arguments and return them with defaults substituted and clamp-policy bounds
    /// applied.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` carrying `{type: "validation-errors", violations}` details.
    pub fn normalize(&self, args: &Value) -> Result<JsonObject, HttpToolsError> {
        let Some(obj) = args.as_object() else {
            return Err(HttpToolsError::InvalidArguments {
                message: "Invalid params: arguments must be a JSON object".to_string(),
                details: json!({
                    "type": "validation-errors",
                    "violations": [{ "type": "constraint-violation", "message": format!("{args} is not an object"), "instancePath": "" }],
                }),
            });
        };

        let mut violations: Vec<Value> = Vec::new();
        let valid_params: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        for k in obj.keys() {
            if self.field(k).is_some() {
                continue;
            }
            violations.push(json!({
                "type": "invalid-parameter",
                "parameter": k,
                "suggestions": find_similar_strings(k, &valid_params),
                "validParameters": valid_params,
            }));
        }

        let mut normalized = JsonObject::new();
        for f in &self.fields {
            match obj.get(&f.name).filter(|v| !v.is_null()) {
                Some(v) => {
                    let mut v = v.clone();
                    f.clamp(&mut v);
                    normalized.insert(f.name.clone(), v);
                }
                None => {
                    if let Some(d) = &f.default {
                        normalized.insert(f.name.clone(), d.clone());
                    } else if f.required {
                        violations.push(json!({
                            "type": "missing-required-parameter",
                            "parameter": f.name,
                        }));
                    }
                }
            }
        }

        let schema = self.to_json_schema();
        let instance = Value::Object(normalized.clone());
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                for e in validator.iter_errors(&instance) {
                    if matches!(
                        e.kind(),
                        jsonschema::error::ValidationErrorKind::Required { .. }
                    ) {
                        continue;
                    }
                    violations.push(json!({
                        "type": "constraint-violation",
                        "message": e.to_string(),
                        "instancePath": e.instance_path().to_string(),
                    }));
                }
            }
            Err(e) => {
                return Err(HttpToolsError::config(format!(
                    "tool argument schema does not compile: {e}"
                )));
            }
        }

        if violations.is_empty() {
            return Ok(normalized);
        }
        Err(HttpToolsError::InvalidArguments {
            message: violation_message(&violations),
            details: json!({
                "type": "validation-errors",
                "violations": violations,
            }),
        })
    }
}

fn violation_message(violations: &[Value]) -> String {
    let unknown = violations
        .iter()
        .find(|v| v.get("type").and_then(Value::as_str) == Some("invalid-parameter"));
    if let Some(v) = unknown {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        let suggestion = v
            .get("suggestions")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str);
        return match suggestion {
            Some(s) => format!("Invalid params: unknown parameter '{p}' (did you mean '{s}'?)"),
            None => format!("Invalid params: unknown parameter '{p}'"),
        };
    }
    if let [only] = violations
        && only.get("type").and_then(Value::as_str) == Some("missing-required-parameter")
    {
        let p = only.get("parameter").and_then(Value::as_str).unwrap_or("?");
        return format!("Invalid params: missing required parameter '{p}'");
    }
    format!(
        "Invalid params: validation failed with {} error(s)",
        violations.len()
    )
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = known
        .iter()
        .map(|k| (strsim::jaro(unknown, k), (*k).to_string()))
        .filter(|(score, _)| *score > 0.7)
        .collect();
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}
