//! Unit catalog.
//!
//! Every unit is a configuration record over the shared resolver: its declared parameters, how
//! they map onto a [`RequestTemplate`](flowunit_http_tools::RequestTemplate), and (for dual-mode
//! units) the tool it supplies.

mod document_search;
mod fetch;
mod json_body_request;
mod multi_mode;
mod posts;
mod query_request;
mod search;

pub use document_search::DocumentSearch;
pub use fetch::Fetch;
pub use json_body_request::JsonBodyRequest;
pub use multi_mode::MultiMode;
pub use posts::Posts;
pub use query_request::QueryRequest;
pub use search::Search;

use crate::batch::BatchUnit;
use crate::error::UnitError;
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ItemParameters, ParameterSet};
use crate::tool::ToolProvider;
use flowunit_http_tools::HttpToolsError;
use flowunit_http_tools::semantics::parse_method;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    DocumentSearch,
    JsonBodyRequest,
    Fetch,
    Search,
    QueryRequest,
    Posts,
    MultiMode,
}

impl UnitKind {
    pub const ALL: [UnitKind; 7] = [
        Self::DocumentSearch,
        Self::JsonBodyRequest,
        Self::Fetch,
        Self::Search,
        Self::QueryRequest,
        Self::Posts,
        Self::MultiMode,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentSearch => "documentSearch",
            Self::JsonBodyRequest => "jsonBodyRequest",
            Self::Fetch => "fetch",
            Self::Search => "search",
            Self::QueryRequest => "queryRequest",
            Self::Posts => "posts",
            Self::MultiMode => "multiMode",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnitError::UnknownUnit(s.to_string()))
    }
}

/// The batch side of a unit.
///
/// # Errors
///
/// `Unsupported` for tool-only units.
pub fn batch_unit(kind: UnitKind) -> Result<Box<dyn BatchUnit>, UnitError> {
    Ok(match kind {
        UnitKind::DocumentSearch => Box::new(DocumentSearch::new()),
        UnitKind::JsonBodyRequest => Box::new(JsonBodyRequest::new()),
        UnitKind::Fetch => Box::new(Fetch::new()),
        UnitKind::Search => Box::new(Search::new()),
        UnitKind::Posts => Box::new(Posts::new()),
        UnitKind::MultiMode => Box::new(MultiMode::new()),
        UnitKind::QueryRequest => {
            return Err(UnitError::Unsupported(format!(
                "{kind} has no batch mode"
            )));
        }
    })
}

/// The tool side of a unit.
///
/// # Errors
///
/// `Unsupported` for batch-only units.
pub fn tool_provider(kind: UnitKind) -> Result<Box<dyn ToolProvider>, UnitError> {
    Ok(match kind {
        UnitKind::DocumentSearch => Box::new(DocumentSearch::new()),
        UnitKind::Search => Box::new(Search::new()),
        UnitKind::QueryRequest => Box::new(QueryRequest::new()),
        UnitKind::Posts => Box::new(Posts::new()),
        UnitKind::MultiMode => Box::new(MultiMode::new()),
        UnitKind::JsonBodyRequest | UnitKind::Fetch => {
            return Err(UnitError::Unsupported(format!("{kind} has no tool mode")));
        }
    })
}

/// Declared parameters of a unit, whichever modes it has.
#[must_use]
pub fn parameters(kind: UnitKind) -> ParameterSet {
    match batch_unit(kind) {
        Ok(unit) => unit.parameters().clone(),
        Err(_) => tool_provider(kind)
            .map(|p| p.parameters().clone())
            .unwrap_or_default(),
    }
}

/// Parameter access for supplying a tool: record index 0, no record fields.
fn with_tool_parameters<T>(
    set: &ParameterSet,
    source: &dyn ParameterSource,
    f: impl FnOnce(&ItemParameters<'_>) -> Result<T, HttpToolsError>,
) -> Result<T, HttpToolsError> {
    let record = JsonObject::new();
    f(&ItemParameters::new(set, source, 0, &record))
}

fn method_param(item: &ItemParameters<'_>, name: &str) -> Result<Method, HttpToolsError> {
    parse_method(&item.string(name)?)
        .map_err(|m| HttpToolsError::config(format!("invalid HTTP method '{m}'")))
}
