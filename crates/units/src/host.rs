//! The host side of the boundary: records in, records out, parameter reads.
//!
//! Units never mutate host state; the only call back into the host is reading a parameter value
//! for a given record index.

use flowunit_http_tools::HttpTransport;
use flowunit_http_tools::response_shaping::ResponsePipeline;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// One record of a batch. Read-only for units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub json: JsonObject,
}

impl InputRecord {
    #[must_use]
    pub fn new(json: JsonObject) -> Self {
        Self { json }
    }
}

impl From<JsonObject> for InputRecord {
    fn from(json: JsonObject) -> Self {
        Self::new(json)
    }
}

/// One produced record, tagged with the index of the input it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub json: JsonObject,
    pub paired_item: usize,
}

impl OutputRecord {
    /// Whether this record is a contained failure marker.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.json.contains_key("error") && self.json.contains_key("input")
    }
}

/// Read access to host-declared parameter values.
pub trait ParameterSource: Send + Sync {
    /// The value configured for `name` when processing record `item_index`, if any.
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;
}

/// The same values for every record.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    values: JsonObject,
}

impl StaticParameters {
    #[must_use]
    pub fn new(values: JsonObject) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for StaticParameters {
    fn parameter(&self, name: &str, _item_index: usize) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Shared values with optional per-record overrides (index-aligned with the batch).
#[derive(Debug, Clone, Default)]
pub struct PerItemParameters {
    base: JsonObject,
    items: Vec<JsonObject>,
}

impl PerItemParameters {
    #[must_use]
    pub fn new(base: JsonObject, items: Vec<JsonObject>) -> Self {
        Self { base, items }
    }
}

impl ParameterSource for PerItemParameters {
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.items
            .get(item_index)
            .and_then(|item| item.get(name))
            .or_else(|| self.base.get(name))
            .cloned()
    }
}

/// Everything a batch run needs from its surroundings.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub parameters: &'a dyn ParameterSource,
    pub transport: &'a dyn HttpTransport,
    /// Contain per-record failures as error records instead of aborting.
    pub continue_on_fail: bool,
    /// Applied to every successful payload after the unit's own shaping.
    pub shaping: Option<&'a ResponsePipeline>,
}

impl<'a> ExecutionContext<'a> {
    #[must_use]
    pub fn new(parameters: &'a dyn ParameterSource, transport: &'a dyn HttpTransport) -> Self {
        Self {
            parameters,
            transport,
            continue_on_fail: false,
            shaping: None,
        }
    }

    #[must_use]
    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    #[must_use]
    pub fn shaped(mut self, pipeline: &'a ResponsePipeline) -> Self {
        self.shaping = Some(pipeline);
        self
    }
}
