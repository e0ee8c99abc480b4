//! Batch execution: one output record per input record, in order.

use crate::error::UnitError;
use crate::host::{ExecutionContext, InputRecord, JsonObject, OutputRecord};
use crate::parameters::{ItemParameters, ParameterSet};
use flowunit_http_tools::response_shaping::ResponsePipeline;
use flowunit_http_tools::{HttpToolsError, HttpTransport, RequestSpec};
use serde_json::{Value, json};

/// One outbound call plus how its payload is shaped and where it lands in the output record.
#[derive(Debug, Clone)]
pub struct HttpStep {
    request: RequestSpec,
    summary: Option<Value>,
    pipeline: ResponsePipeline,
    response_key: String,
}

impl HttpStep {
    /// Defaults: summary = `request.summary()`, no shaping, payload stored under `response`.
    #[must_use]
    pub fn new(request: RequestSpec) -> Self {
        Self {
            summary: Some(request.summary()),
            request,
            pipeline: ResponsePipeline::default(),
            response_key: "response".to_string(),
        }
    }

    /// Replace the request summary (e.g. with the logical arguments instead of the wire request).
    #[must_use]
    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Do not add a `request` field to the output record.
    #[must_use]
    pub fn without_summary(mut self) -> Self {
        self.summary = None;
        self
    }

    #[must_use]
    pub fn shaped(mut self, pipeline: ResponsePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn store_as(mut self, key: impl Into<String>) -> Self {
        self.response_key = key.into();
        self
    }

    #[must_use]
    pub fn request(&self) -> &RequestSpec {
        &self.request
    }

    #[must_use]
    pub fn summary(&self) -> Option<&Value> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn response_key(&self) -> &str {
        &self.response_key
    }

    /// Issue the request and shape the payload.
    ///
    /// # Errors
    ///
    /// Returns the transport's failure.
    pub async fn call(&self, transport: &dyn HttpTransport) -> Result<Value, HttpToolsError> {
        let mut payload = transport.perform(&self.request).await?;
        self.pipeline.apply(&mut payload);
        Ok(payload)
    }
}

/// What a unit does for one record (or one tool call).
#[derive(Debug, Clone)]
pub enum Step {
    Http(HttpStep),
    /// Computed without a network call.
    Local(JsonObject),
}

impl Step {
    #[must_use]
    pub fn http(request: RequestSpec) -> Self {
        Self::Http(HttpStep::new(request))
    }

    #[must_use]
    pub fn local(result: Value) -> Self {
        match result {
            Value::Object(map) => Self::Local(map),
            other => {
                let mut map = JsonObject::new();
                map.insert("result".to_string(), other);
                Self::Local(map)
            }
        }
    }
}

/// A unit that runs as a pipeline step.
pub trait BatchUnit: Send + Sync {
    fn name(&self) -> &'static str;

    fn parameters(&self) -> &ParameterSet;

    /// Resolve this record's parameters into a step. Pure: no network.
    ///
    /// # Errors
    ///
    /// Any resolution failure; `Config` errors abort the batch even in continue-on-fail mode.
    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError>;
}

/// Run `unit` over `records` strictly in order, one call in flight at a time.
///
/// In continue-on-fail mode every record yields exactly one output (`{error, input}` for failed
/// ones). Otherwise the first failure aborts the run and nothing is returned but the failure.
///
/// # Errors
///
/// `UnitError::ItemFailed` naming the failing index.
pub async fn run_batch(
    unit: &dyn BatchUnit,
    records: &[InputRecord],
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<OutputRecord>, UnitError> {
    let mut out = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        tracing::debug!(unit = unit.name(), index, "processing record");

        match process_record(unit, index, record, ctx).await {
            Ok(json) => out.push(OutputRecord {
                json,
                paired_item: index,
            }),
            Err(source) if ctx.continue_on_fail && !source.is_fatal() => {
                tracing::warn!(
                    unit = unit.name(),
                    index,
                    kind = source.kind(),
                    error = %source,
                    "record failed; continuing"
                );
                out.push(failure_record(index, &source, record));
            }
            Err(source) => return Err(UnitError::ItemFailed { index, source }),
        }
    }

    Ok(out)
}

async fn process_record(
    unit: &dyn BatchUnit,
    index: usize,
    record: &InputRecord,
    ctx: &ExecutionContext<'_>,
) -> Result<JsonObject, HttpToolsError> {
    let params = ItemParameters::new(unit.parameters(), ctx.parameters, index, &record.json);
    let mut json = record.json.clone();

    match unit.prepare(&params)? {
        Step::Http(step) => {
            let mut payload = step.call(ctx.transport).await?;
            if let Some(shaping) = ctx.shaping {
                shaping.apply(&mut payload);
            }
            if let Some(summary) = step.summary {
                json.insert("request".to_string(), summary);
            }
            // Inserted last so the upstream payload wins on key collision.
            json.insert(step.response_key, payload);
        }
        Step::Local(result) => json.extend(result),
    }

    Ok(json)
}

fn failure_record(index: usize, err: &HttpToolsError, record: &InputRecord) -> OutputRecord {
    let json = json!({
        "error": err.to_string(),
        "input": record.json,
    });
    OutputRecord {
        json: json.as_object().cloned().unwrap_or_default(),
        paired_item: index,
    }
}
