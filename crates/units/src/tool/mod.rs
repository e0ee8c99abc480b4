//! The tool path: one agent call in, one string out.
//!
//! [`ToolAdapter::invoke`] never fails. Every error (unparseable input, schema violations, transport
//! failures) is folded into a [`ResponseEnvelope`] and returned as text; the trace log receives the
//! resolved input before the call and the envelope after it, at the same index.

pub mod extract;
pub mod schema;
pub mod trace;

use crate::batch::Step;
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::ParameterSet;
use extract::{ExtractionChain, raw_input};
use flowunit_http_tools::response_shaping::ResponsePipeline;
use flowunit_http_tools::semantics::MethodHints;
use flowunit_http_tools::{HttpToolsError, HttpTransport, ResponseEnvelope};
use schema::ToolArgumentSchema;
use serde_json::{Value, json};
use std::sync::Arc;
use trace::{TraceSink, TraceStream};

/// What the agent runtime hands a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    Structured(Value),
    Text(String),
}

impl ToolInput {
    /// A JSON object becomes structured input; anything else stays text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(v @ Value::Object(_)) => Self::Structured(v),
            _ => Self::Text(raw.to_string()),
        }
    }
}

/// Name, description and argument contract advertised to the agent.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// For untyped tools, the shape of the arguments after extraction.
    pub schema: ToolArgumentSchema,
    pub hints: MethodHints,
}

impl ToolDescriptor {
    #[must_use]
    pub fn input_schema(&self) -> Value {
        self.schema.to_json_schema()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
            "annotations": self.hints,
        })
    }
}

/// A configured tool, ready to be called.
pub trait ToolUnit: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Untyped tools read their argument out of raw input with this chain.
    fn extraction(&self) -> Option<&ExtractionChain> {
        None
    }

    /// Turn validated arguments into a step. Pure: no network.
    ///
    /// # Errors
    ///
    /// Any resolution failure; it is reported to the agent, not raised.
    fn prepare_call(&self, args: &JsonObject) -> Result<Step, HttpToolsError>;
}

/// Builds a tool from host configuration.
pub trait ToolProvider: Send + Sync {
    fn parameters(&self) -> &ParameterSet;

    /// # Errors
    ///
    /// `Config` when the configuration cannot produce a working tool (e.g. empty endpoint URL).
    fn supply_tool(&self, parameters: &dyn ParameterSource)
    -> Result<Arc<dyn ToolUnit>, HttpToolsError>;
}

/// Wraps a [`ToolUnit`] with argument handling, transport and tracing.
pub struct ToolAdapter {
    unit: Arc<dyn ToolUnit>,
    transport: Arc<dyn HttpTransport>,
    trace: Arc<dyn TraceSink>,
    shaping: ResponsePipeline,
}

impl ToolAdapter {
    pub fn new(
        unit: Arc<dyn ToolUnit>,
        transport: Arc<dyn HttpTransport>,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            unit,
            transport,
            trace,
            shaping: ResponsePipeline::default(),
        }
    }

    /// Extra shaping applied to successful payloads after the unit's own.
    #[must_use]
    pub fn with_shaping(mut self, pipeline: ResponsePipeline) -> Self {
        self.shaping = pipeline;
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        self.unit.descriptor()
    }

    /// Run one agent call and return the rendered envelope.
    pub async fn invoke(&self, input: ToolInput) -> String {
        self.invoke_envelope(input).await.render()
    }

    pub async fn invoke_envelope(&self, input: ToolInput) -> ResponseEnvelope {
        let tool = self.unit.descriptor().name.clone();
        tracing::info!(tool = %tool, "tool invoked");

        let resolved = self.resolve_arguments(&input);
        let traced = match &resolved {
            Ok(args) => args.clone(),
            Err(_) => raw_input(&input),
        };
        let index = self
            .trace
            .add_input_data(TraceStream::AiTool, vec![traced.clone()]);

        let envelope = match resolved {
            Ok(args) => self.call(&args).await,
            Err(e) => ResponseEnvelope::failure(Value::Object(traced), &e),
        };

        if let Some(error) = envelope.error() {
            tracing::warn!(tool = %tool, index, error, "tool call failed");
        }

        let output = match envelope.to_value() {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        self.trace
            .add_output_data(TraceStream::AiTool, index, vec![output]);
        envelope
    }

    fn resolve_arguments(&self, input: &ToolInput) -> Result<JsonObject, HttpToolsError> {
        let descriptor = self.unit.descriptor();

        let args = match (self.unit.extraction(), input) {
            (Some(chain), _) => Value::Object(chain.extract(input)?),
            (None, ToolInput::Structured(v)) => v.clone(),
            (None, ToolInput::Text(s)) => match serde_json::from_str::<Value>(s.trim()) {
                Ok(v @ Value::Object(_)) => v,
                _ => {
                    return Err(HttpToolsError::invalid(format!(
                        "Invalid params: tool '{}' expects a JSON object argument",
                        descriptor.name
                    )));
                }
            },
        };

        descriptor.schema.normalize(&args)
    }

    async fn call(&self, args: &JsonObject) -> ResponseEnvelope {
        let arguments = Value::Object(args.clone());
        let step = match self.unit.prepare_call(args) {
            Ok(step) => step,
            Err(e) => return ResponseEnvelope::failure(arguments, &e),
        };

        match step {
            Step::Http(step) => {
                let summary = step.summary().cloned().unwrap_or(arguments);
                match step.call(self.transport.as_ref()).await {
                    Ok(mut payload) => {
                        self.shaping.apply(&mut payload);
                        ResponseEnvelope::success(summary, payload)
                    }
                    Err(e) => ResponseEnvelope::failure(summary, &e),
                }
            }
            Step::Local(result) => ResponseEnvelope::success(arguments, Value::Object(result)),
        }
    }
}
