//! Declared unit parameters and their per-record resolution.

use crate::expression;
use crate::host::{JsonObject, ParameterSource};
use flowunit_http_tools::HttpToolsError;
use serde_json::{Number, Value, json};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Options(Vec<String>),
}

impl ParameterKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Options(_) => "options",
        }
    }
}

/// One declared parameter. Immutable once the unit is built.
#[derive(Debug, Clone)]
pub struct ParameterDecl {
    name: String,
    kind: ParameterKind,
    default: Value,
    required: bool,
    endpoint: bool,
    lenient: bool,
    shown_for: Option<Vec<String>>,
}

impl ParameterDecl {
    fn new(name: impl Into<String>, kind: ParameterKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            required: false,
            endpoint: false,
            lenient: false,
            shown_for: None,
        }
    }

    pub fn string(name: impl Into<String>, default: &str) -> Self {
        Self::new(name, ParameterKind::String, json!(default))
    }

    /// The endpoint URL. Resolving it to an empty value is a configuration error.
    pub fn endpoint(name: impl Into<String>, default: &str) -> Self {
        let mut decl = Self::string(name, default);
        decl.endpoint = true;
        decl.required = true;
        decl
    }

    /// A number; pass `Value::Null` (or `""`) as default for "unset".
    pub fn number(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self::new(name, ParameterKind::Number, default.into())
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ParameterKind::Boolean, json!(default))
    }

    pub fn options(name: impl Into<String>, options: &[&str], default: &str) -> Self {
        let options = options.iter().map(|o| (*o).to_string()).collect();
        Self::new(name, ParameterKind::Options(options), json!(default))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// A value that fails coercion resolves as unset instead of failing the record.
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Only applicable when the unit's `operation` is one of `operations`.
    #[must_use]
    pub fn shown_for(mut self, operations: &[&str]) -> Self {
        self.shown_for = Some(operations.iter().map(|o| (*o).to_string()).collect());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    fn applies_to(&self, operation: Option<&str>) -> bool {
        match (&self.shown_for, operation) {
            (None, _) => true,
            (Some(ops), Some(op)) => ops.iter().any(|o| o == op),
            (Some(_), None) => false,
        }
    }

    fn coerce(&self, value: Value) -> Result<Value, HttpToolsError> {
        let mismatch = |v: &Value| {
            HttpToolsError::invalid(format!(
                "parameter '{}' expects a {}, got {v}",
                self.name,
                self.kind.as_str()
            ))
        };

        match &self.kind {
            ParameterKind::String => match value {
                Value::Null => Ok(json!("")),
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(mismatch(&other)),
            },
            ParameterKind::Number => match value {
                Value::Null | Value::Number(_) => Ok(value),
                Value::String(ref s) if s.trim().is_empty() => Ok(Value::Null),
                Value::String(ref s) => parse_number(s.trim()).ok_or_else(|| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            ParameterKind::Boolean => match value {
                Value::Bool(_) => Ok(value),
                Value::String(ref s) if s == "true" => Ok(json!(true)),
                Value::String(ref s) if s == "false" => Ok(json!(false)),
                other => Err(mismatch(&other)),
            },
            ParameterKind::Options(options) => match value {
                Value::String(ref s) if options.iter().any(|o| o == s) => Ok(value),
                other => Err(HttpToolsError::invalid(format!(
                    "parameter '{}' must be one of [{}], got {other}",
                    self.name,
                    options.join(", ")
                ))),
            },
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// The ordered, read-only set of a unit's declared parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    decls: Vec<ParameterDecl>,
}

impl ParameterSet {
    #[must_use]
    pub fn new(decls: Vec<ParameterDecl>) -> Self {
        Self { decls }
    }

    #[must_use]
    pub fn decl(&self, name: &str) -> Option<&ParameterDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDecl> {
        self.decls.iter()
    }

    /// Names of the parameters that apply to `operation` (all unconditional ones plus those shown
    /// for it).
    #[must_use]
    pub fn select_applicable_fields(&self, operation: Option<&str>) -> BTreeSet<&str> {
        self.decls
            .iter()
            .filter(|d| d.applies_to(operation))
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Resolve one parameter for record `item_index`.
    ///
    /// Host value, else declared default; then expression evaluation against `record`; then
    /// coercion to the declared kind.
    ///
    /// # Errors
    ///
    /// - `Config` for undeclared names and empty endpoint parameters
    /// - `InvalidArguments` for coercion failures (unless the parameter is lenient) and empty
    ///   required parameters
    pub fn resolve(
        &self,
        name: &str,
        item_index: usize,
        source: &dyn ParameterSource,
        record: &JsonObject,
    ) -> Result<Value, HttpToolsError> {
        let decl = self
            .decl(name)
            .ok_or_else(|| HttpToolsError::config(format!("undeclared parameter '{name}'")))?;

        let raw = source
            .parameter(name, item_index)
            .unwrap_or_else(|| decl.default.clone());
        let value = match decl.coerce(expression::evaluate(&raw, record)?) {
            Ok(value) => value,
            Err(err) if decl.lenient => {
                tracing::debug!(
                    parameter = name,
                    index = item_index,
                    error = %err,
                    "unreadable value treated as unset"
                );
                Value::Null
            }
            Err(err) => return Err(err),
        };

        if decl.required && is_unset(&value) {
            if decl.endpoint {
                return Err(HttpToolsError::config("missing endpoint URL"));
            }
            return Err(HttpToolsError::invalid(format!(
                "parameter '{name}' is required"
            )));
        }
        Ok(value)
    }

    /// Declarations as JSON (name, type, default, required, options, shownFor).
    #[must_use]
    pub fn describe(&self) -> Value {
        let items: Vec<Value> = self
            .decls
            .iter()
            .map(|d| {
                let mut v = json!({
                    "name": d.name,
                    "type": d.kind.as_str(),
                    "default": d.default,
                    "required": d.required,
                });
                if let ParameterKind::Options(options) = &d.kind {
                    v["options"] = json!(options);
                }
                if let Some(ops) = &d.shown_for {
                    v["shownFor"] = json!(ops);
                }
                v
            })
            .collect();
        Value::Array(items)
    }
}

/// Parameter access bound to one record (or to index 0 with an empty record when supplying a
/// tool).
#[derive(Clone, Copy)]
pub struct ItemParameters<'a> {
    set: &'a ParameterSet,
    source: &'a dyn ParameterSource,
    index: usize,
    record: &'a JsonObject,
}

impl<'a> ItemParameters<'a> {
    #[must_use]
    pub fn new(
        set: &'a ParameterSet,
        source: &'a dyn ParameterSource,
        index: usize,
        record: &'a JsonObject,
    ) -> Self {
        Self {
            set,
            source,
            index,
            record,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn record(&self) -> &'a JsonObject {
        self.record
    }

    /// # Errors
    ///
    /// See [`ParameterSet::resolve`].
    pub fn get(&self, name: &str) -> Result<Value, HttpToolsError> {
        self.set.resolve(name, self.index, self.source, self.record)
    }

    /// # Errors
    ///
    /// See [`ParameterSet::resolve`].
    pub fn string(&self, name: &str) -> Result<String, HttpToolsError> {
        Ok(match self.get(name)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    /// `None` when the resolved value is null or an empty string.
    ///
    /// # Errors
    ///
    /// See [`ParameterSet::resolve`].
    pub fn optional(&self, name: &str) -> Result<Option<Value>, HttpToolsError> {
        let value = self.get(name)?;
        Ok((!is_unset(&value)).then_some(value))
    }

    /// # Errors
    ///
    /// See [`ParameterSet::resolve`]; also `InvalidArguments` if the value is not an integer.
    #[allow(clippy::cast_possible_truncation)]
    pub fn integer(&self, name: &str) -> Result<i64, HttpToolsError> {
        let value = self.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| HttpToolsError::invalid(format!("parameter '{name}' is not a number")))
    }
}
