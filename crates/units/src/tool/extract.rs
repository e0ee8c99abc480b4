//! Defensive argument extraction for untyped tools.
//!
//! Agents may call an untyped tool with a bare value, a JSON document or free text. An
//! [`ExtractionChain`] tries its strategies in order and takes the first definite result.

use super::ToolInput;
use crate::host::JsonObject;
use flowunit_http_tools::HttpToolsError;
use regex::Regex;
use serde_json::{Value, json};
use std::fmt;
use std::sync::LazyLock;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// One way of reading a field value out of raw text.
pub trait ExtractionStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// `Some` on a definite match, `None` to let the next strategy try.
    fn extract(&self, field: &str, input: &str) -> Option<Value>;
}

/// The whole input is an unsigned integer literal.
#[derive(Debug)]
struct StrictInteger;

impl ExtractionStrategy for StrictInteger {
    fn name(&self) -> &'static str {
        "strict-integer"
    }

    fn extract(&self, _field: &str, input: &str) -> Option<Value> {
        let s = input.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<i64>().ok().map(Value::from)
    }
}

/// Strict JSON: a bare number, or an object carrying the field.
#[derive(Debug)]
struct JsonNumberField;

impl ExtractionStrategy for JsonNumberField {
    fn name(&self) -> &'static str {
        "json-field"
    }

    fn extract(&self, field: &str, input: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(input.trim()).ok()? {
            n @ Value::Number(_) => Some(n),
            Value::Object(map) => match map.get(field)? {
                n @ Value::Number(_) => Some(n.clone()),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            _ => None,
        }
    }
}

/// The first run of digits anywhere in the text.
#[derive(Debug)]
struct FirstInteger;

impl ExtractionStrategy for FirstInteger {
    fn name(&self) -> &'static str {
        "first-integer"
    }

    fn extract(&self, _field: &str, input: &str) -> Option<Value> {
        DIGITS
            .find(input)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(Value::from)
    }
}

/// Strict JSON object carrying the field as a string.
#[derive(Debug)]
struct JsonTextField;

impl ExtractionStrategy for JsonTextField {
    fn name(&self) -> &'static str {
        "json-field"
    }

    fn extract(&self, field: &str, input: &str) -> Option<Value> {
        let parsed: Value = serde_json::from_str(input.trim()).ok()?;
        match parsed.get(field)? {
            s @ Value::String(_) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Any non-blank text, verbatim.
#[derive(Debug)]
struct WholeText;

impl ExtractionStrategy for WholeText {
    fn name(&self) -> &'static str {
        "whole-text"
    }

    fn extract(&self, _field: &str, input: &str) -> Option<Value> {
        (!input.trim().is_empty()).then(|| Value::String(input.to_string()))
    }
}

/// Ordered strategies producing a single named field.
#[derive(Debug)]
pub struct ExtractionChain {
    field: String,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionChain {
    /// strict integer, then strict JSON (number or `{field: n}`), then first integer substring.
    pub fn integer_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            strategies: vec![
                Box::new(StrictInteger),
                Box::new(JsonNumberField),
                Box::new(FirstInteger),
            ],
        }
    }

    /// strict JSON `{field: "..."}`, then the whole text.
    pub fn text_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            strategies: vec![Box::new(JsonTextField), Box::new(WholeText)],
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Read `field` from the raw text.
    ///
    /// # Errors
    ///
    /// `ArgumentExtraction` when no strategy matches.
    pub fn extract_text(&self, input: &str) -> Result<Value, HttpToolsError> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.extract(&self.field, input) {
                tracing::debug!(field = %self.field, strategy = strategy.name(), "extracted argument");
                return Ok(value);
            }
        }
        Err(HttpToolsError::ArgumentExtraction(format!(
            "no {} found in the input",
            self.field
        )))
    }

    /// Turn a tool input into an argument object.
    ///
    /// Objects and text go through the strategies, so both forms of one payload yield the same
    /// arguments. Bare numbers become `{field: n}`.
    ///
    /// # Errors
    ///
    /// `ArgumentExtraction` when nothing usable is found.
    pub fn extract(&self, input: &ToolInput) -> Result<JsonObject, HttpToolsError> {
        let value = match input {
            ToolInput::Structured(object @ Value::Object(_)) => {
                self.extract_text(&object.to_string())?
            }
            ToolInput::Structured(n @ Value::Number(_)) => n.clone(),
            ToolInput::Structured(Value::String(s)) | ToolInput::Text(s) => self.extract_text(s)?,
            ToolInput::Structured(other) => {
                return Err(HttpToolsError::ArgumentExtraction(format!(
                    "unsupported input {other}; expected a {} value, text or an object",
                    self.field
                )));
            }
        };
        let mut args = JsonObject::new();
        args.insert(self.field.clone(), value);
        Ok(args)
    }
}

/// Wrap raw input for tracing when extraction fails.
#[must_use]
pub fn raw_input(input: &ToolInput) -> JsonObject {
    let raw = match input {
        ToolInput::Structured(v) => v.clone(),
        ToolInput::Text(s) => json!(s),
    };
    let mut out = JsonObject::new();
    out.insert("input".to_string(), raw);
    out
}
