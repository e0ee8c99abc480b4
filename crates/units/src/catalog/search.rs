//! Vector search endpoint (`GET url?query=..&k=..`) plus a local `process` operation.
//!
//! The tool form validates `limit` against `[1, maxLimit]` under the configured policy first, then
//! clamps it once more with the unit's own bounds before the request is built.

use super::with_tool_parameters;
use crate::batch::{BatchUnit, HttpStep, Step};
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use crate::tool::schema::{BoundPolicy, FieldSpec, ToolArgumentSchema};
use crate::tool::{ToolDescriptor, ToolProvider, ToolUnit};
use flowunit_http_tools::response_shaping::ResponsePipeline;
use flowunit_http_tools::semantics::hints_for_method;
use flowunit_http_tools::{ArgumentBinding, CountBounds, HttpToolsError, RequestTemplate};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;

fn template(url: &str) -> RequestTemplate {
    RequestTemplate::new(Method::GET, url)
        .header("accept", "application/json")
        .bind(ArgumentBinding::filter("query"))
        .bind(ArgumentBinding::filter("limit").query_as("k"))
}

fn page_contents() -> ResponsePipeline {
    ResponsePipeline::pluck("page_content", json!(""))
}

pub struct Search {
    params: ParameterSet,
}

impl Search {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::options("operation", &["search", "process"], "search"),
                ParameterDecl::endpoint("apiUrl", "").shown_for(&["search"]),
                ParameterDecl::string("query", "").shown_for(&["search"]),
                ParameterDecl::number("limit", 5)
                    .lenient()
                    .shown_for(&["search"]),
                ParameterDecl::number("maxLimit", 100),
                ParameterDecl::string("inputData", "").shown_for(&["process"]),
                ParameterDecl::number("defaultLimit", 4),
                ParameterDecl::options("limitPolicy", &["clamp", "reject"], "clamp"),
                ParameterDecl::string("description", "Searches the document index"),
                ParameterDecl::string("queryDescription", "Search query text"),
                ParameterDecl::string("limitDescription", "Max number of results to return"),
            ]),
        }
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for Search {
    fn name(&self) -> &'static str {
        "search"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        match item.string("operation")?.as_str() {
            "process" => {
                let input = item.string("inputData")?;
                Ok(Step::local(json!({
                    "operation": "process",
                    "result": format!("Processed: {input}"),
                })))
            }
            _ => {
                let url = item.string("apiUrl")?;
                // an unreadable limit falls back to a single result
                let bounds = CountBounds::new(1, item.integer("maxLimit")?);
                let limit = bounds.clamp(item.optional("limit")?.as_ref());

                let mut args = JsonObject::new();
                args.insert("query".into(), Value::String(item.string("query")?));
                args.insert("limit".into(), json!(limit));

                let request = template(&url).resolve(&args)?;
                Ok(Step::Http(
                    HttpStep::new(request)
                        .with_summary(Value::Object(args))
                        .shaped(page_contents())
                        .store_as("results"),
                ))
            }
        }
    }
}

impl ToolProvider for Search {
    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    #[allow(clippy::cast_precision_loss)]
    fn supply_tool(
        &self,
        parameters: &dyn ParameterSource,
    ) -> Result<Arc<dyn ToolUnit>, HttpToolsError> {
        with_tool_parameters(&self.params, parameters, |item| {
            let url = item.string("apiUrl")?;
            let max_limit = item.integer("maxLimit")?.max(1);
            let default_limit = item.integer("defaultLimit")?.clamp(1, max_limit);
            let policy = match item.string("limitPolicy")?.as_str() {
                "reject" => BoundPolicy::Reject,
                _ => BoundPolicy::Clamp,
            };

            let schema = ToolArgumentSchema::new(vec![
                FieldSpec::string("query")
                    .describe(item.string("queryDescription")?)
                    .required(),
                FieldSpec::integer("limit")
                    .describe(item.string("limitDescription")?)
                    .default_value(default_limit)
                    .bounds(Some(1.0), Some(max_limit as f64))
                    .policy(policy),
            ]);

            Ok(Arc::new(SearchTool {
                descriptor: ToolDescriptor {
                    name: "search".into(),
                    description: item.string("description")?,
                    schema,
                    hints: hints_for_method(&Method::GET),
                },
                template: template(&url),
                bounds: CountBounds::new(default_limit, max_limit),
            }) as Arc<dyn ToolUnit>)
        })
    }
}

struct SearchTool {
    descriptor: ToolDescriptor,
    template: RequestTemplate,
    bounds: CountBounds,
}

impl ToolUnit for SearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn prepare_call(&self, args: &JsonObject) -> Result<Step, HttpToolsError> {
        let mut args = args.clone();
        let limit = self.bounds.clamp(args.get("limit"));
        args.insert("limit".into(), json!(limit));

        let request = self.template.resolve(&args)?;
        Ok(Step::Http(HttpStep::new(request).shaped(page_contents())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticParameters;

    fn prepare(src: &StaticParameters) -> Result<Step, HttpToolsError> {
        let unit = Search::new();
        let record = JsonObject::new();
        unit.prepare(&ItemParameters::new(&unit.params, src, 0, &record))
    }

    #[test]
    fn search_clamps_limit_to_max() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://search.example.com/query")
            .with("query", "reports")
            .with("limit", 500)
            .with("maxLimit", 100);
        let Step::Http(step) = prepare(&src).unwrap() else {
            panic!("expected http step")
        };
        assert_eq!(step.request().query_value("query"), Some("reports"));
        assert_eq!(step.request().query_value("k"), Some("100"));
        assert_eq!(step.summary(), Some(&json!({ "query": "reports", "limit": 100 })));
        assert_eq!(step.response_key(), "results");
    }

    #[test]
    fn search_raises_non_positive_limit_to_one() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://search.example.com/query")
            .with("query", "reports")
            .with("limit", 0);
        let Step::Http(step) = prepare(&src).unwrap() else {
            panic!("expected http step")
        };
        assert_eq!(step.request().query_value("k"), Some("1"));
    }

    #[test]
    fn unreadable_limit_falls_back_to_one() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://search.example.com/query")
            .with("query", "reports")
            .with("limit", "many");
        let Step::Http(step) = prepare(&src).unwrap() else {
            panic!("expected http step")
        };
        assert_eq!(step.request().query_value("k"), Some("1"));

        let src = StaticParameters::default()
            .with("apiUrl", "https://search.example.com/query")
            .with("query", "reports");
        let Step::Http(step) = prepare(&src).unwrap() else {
            panic!("expected http step")
        };
        assert_eq!(step.request().query_value("k"), Some("5"));
    }

    #[test]
    fn process_is_local() {
        let src = StaticParameters::default()
            .with("operation", "process")
            .with("inputData", "abc");
        let Step::Local(result) = prepare(&src).unwrap() else {
            panic!("expected local step")
        };
        assert_eq!(result["result"], "Processed: abc");
    }

    #[test]
    fn applicable_fields_per_operation() {
        let unit = Search::new();
        let process = unit.params.select_applicable_fields(Some("process"));
        assert!(process.contains("inputData"));
        assert!(!process.contains("query"));
        let search = unit.params.select_applicable_fields(Some("search"));
        assert!(search.contains("apiUrl"));
        assert!(!search.contains("inputData"));
    }

    #[test]
    fn tool_schema_uses_configured_descriptions_and_bounds() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://search.example.com/query")
            .with("maxLimit", 10)
            .with("limitPolicy", "reject")
            .with("queryDescription", "What to look for");
        let tool = Search::new().supply_tool(&src).unwrap();
        let schema = tool.descriptor().input_schema();
        assert_eq!(schema["properties"]["query"]["description"], "What to look for");
        assert_eq!(schema["properties"]["limit"]["maximum"], 10);
        assert_eq!(schema["properties"]["limit"]["default"], 4);
    }
}
