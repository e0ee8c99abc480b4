//! Document search by name, as a pipeline step or as the `document_search` tool.

use super::{method_param, with_tool_parameters};
use crate::batch::{BatchUnit, HttpStep, Step};
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use crate::tool::schema::{FieldSpec, ToolArgumentSchema};
use crate::tool::{ToolDescriptor, ToolProvider, ToolUnit};
use flowunit_http_tools::semantics::hints_for_method;
use flowunit_http_tools::{ArgumentBinding, HttpToolsError, RequestTemplate};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;

const DEFAULT_DESCRIPTION: &str = "Searches for documents by name, keywords, or identifiers";

const DOCUMENT_NAME_HINT: &str = "EXACT user query. MUST include ALL original words in the exact \
    same order. DO NOT modify, summarize or extract keywords. Example: for 'find 15 documents \
    about CRM deals' return 'find 15 documents about CRM deals'";

const RESPONSE_COUNT_HINT: &str = "Number of results to return. Extract it from the query, \
    e.g. 'find 15 documents' -> 15, 'show 3 contracts' -> 3";

fn template(method: Method, url: &str) -> RequestTemplate {
    RequestTemplate::new(method, url)
        .header("content-type", "application/json")
        .bind(ArgumentBinding::filter("documentName"))
        .bind(ArgumentBinding::filter("responseCount").omit_when_falsy())
}

pub struct DocumentSearch {
    params: ParameterSet,
}

impl DocumentSearch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::endpoint("apiUrl", ""),
                ParameterDecl::options("httpMethod", &["GET", "POST"], "POST"),
                ParameterDecl::string("documentName", "").required(),
                ParameterDecl::number("responseCount", ""),
                ParameterDecl::string("description", DEFAULT_DESCRIPTION),
            ]),
        }
    }
}

impl Default for DocumentSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for DocumentSearch {
    fn name(&self) -> &'static str {
        "documentSearch"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        let url = item.string("apiUrl")?;
        let method = method_param(item, "httpMethod")?;

        let mut args = JsonObject::new();
        args.insert("documentName".into(), item.get("documentName")?);
        if let Some(count) = item.optional("responseCount")? {
            args.insert("responseCount".into(), count);
        }

        let request = template(method, &url).resolve(&args)?;
        let summary = logical_request(&args);
        Ok(Step::Http(HttpStep::new(request).with_summary(summary)))
    }
}

/// `{documentName, responseCount?}` with falsy counts dropped, as sent.
fn logical_request(args: &JsonObject) -> Value {
    let mut out = json!({ "documentName": args.get("documentName").cloned().unwrap_or(Value::Null) });
    if let Some(count) = args.get("responseCount")
        && count.as_f64().is_some_and(|n| n != 0.0)
    {
        out["responseCount"] = count.clone();
    }
    out
}

impl ToolProvider for DocumentSearch {
    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn supply_tool(
        &self,
        parameters: &dyn ParameterSource,
    ) -> Result<Arc<dyn ToolUnit>, HttpToolsError> {
        with_tool_parameters(&self.params, parameters, |item| {
            let url = item.string("apiUrl")?;
            let method = method_param(item, "httpMethod")?;
            let description = item.string("description")?;

            let descriptor = ToolDescriptor {
                name: "document_search".into(),
                description,
                schema: ToolArgumentSchema::new(vec![
                    FieldSpec::string("documentName")
                        .describe(DOCUMENT_NAME_HINT)
                        .required(),
                    FieldSpec::integer("responseCount").describe(RESPONSE_COUNT_HINT),
                ]),
                hints: hints_for_method(&method),
            };
            Ok(Arc::new(DocumentSearchTool {
                descriptor,
                template: template(method, &url),
            }) as Arc<dyn ToolUnit>)
        })
    }
}

struct DocumentSearchTool {
    descriptor: ToolDescriptor,
    template: RequestTemplate,
}

impl ToolUnit for DocumentSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn prepare_call(&self, args: &JsonObject) -> Result<Step, HttpToolsError> {
        let request = self.template.resolve(args)?;
        Ok(Step::Http(
            HttpStep::new(request).with_summary(logical_request(args)),
        ))
    }
}
