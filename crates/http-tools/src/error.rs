//! Error types for `flowunit-http-tools`.

use crate::transport::TransportError;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while resolving or performing a unit's outbound call.
#[derive(Debug, Clone, Error)]
pub enum HttpToolsError {
    /// Static setup is unusable (e.g. empty endpoint URL). Never recoverable per record.
    #[error("configuration error: {0}")]
    Config(String),

    /// A body was supplied as a string that is not valid JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No usable argument could be recovered from free-form tool input.
    #[error("argument extraction failed: {0}")]
    ArgumentExtraction(String),

    /// Arguments or parameter values failed validation.
    #[error("{message}")]
    InvalidArguments { message: String, details: Value },

    /// The transport reported a network failure or a non-2xx response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HttpToolsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: msg.into(),
            details: Value::Null,
        }
    }

    /// Fatal errors abort a batch even when failures are otherwise contained.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::MalformedPayload(_) => "malformed-payload",
            Self::ArgumentExtraction(_) => "argument-extraction",
            Self::InvalidArguments { .. } => "invalid-arguments",
            Self::Transport(_) => "transport",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(t) => t.status_code,
            _ => None,
        }
    }

    /// Extra structured context: the upstream body for transport errors, violations for
    /// validation errors.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Transport(t) => t.response.as_ref(),
            Self::InvalidArguments { details, .. } if !details.is_null() => Some(details),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;
