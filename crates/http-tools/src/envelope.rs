//! The canonical result shape shared by tool output and tool traces.

use crate::error::HttpToolsError;
use serde::Serialize;
use serde_json::Value;

/// Outcome of one call. Exactly one of `response` / `error` is set; the constructors are the only
/// way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    success: bool,
    request: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    /// Upstream error body or validation violations.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn success(request: Value, response: Value) -> Self {
        Self {
            success: true,
            request,
            response: Some(response),
            error: None,
            error_kind: None,
            status_code: None,
            details: None,
        }
    }

    #[must_use]
    pub fn failure(request: Value, err: &HttpToolsError) -> Self {
        Self {
            success: false,
            request,
            response: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            status_code: err.status_code(),
            details: err.details().cloned(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn request(&self) -> &Value {
        &self.request
    }

    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Pretty-printed JSON, as handed back to an agent.
    #[must_use]
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_value().to_string())
    }
}
