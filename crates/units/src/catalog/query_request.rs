//! Untyped tool that forwards the agent's text as `{query}`.

use super::{method_param, with_tool_parameters};
use crate::batch::{HttpStep, Step};
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ParameterDecl, ParameterSet};
use crate::tool::extract::ExtractionChain;
use crate::tool::schema::{FieldSpec, ToolArgumentSchema};
use crate::tool::{ToolDescriptor, ToolProvider, ToolUnit};
use flowunit_http_tools::semantics::hints_for_method;
use flowunit_http_tools::{ArgumentBinding, HttpToolsError, RequestTemplate};
use serde_json::Value;
use std::sync::Arc;

pub struct QueryRequest {
    params: ParameterSet,
}

impl QueryRequest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::endpoint("apiUrl", ""),
                ParameterDecl::options("httpMethod", &["GET", "POST"], "POST"),
                ParameterDecl::string(
                    "description",
                    "Makes an HTTP request with the provided query string",
                ),
            ]),
        }
    }
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolProvider for QueryRequest {
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

            Ok(Arc::new(QueryRequestTool {
                descriptor: ToolDescriptor {
                    name: "query_request".into(),
                    description: item.string("description")?,
                    schema: ToolArgumentSchema::new(vec![
                        FieldSpec::string("query").describe("Query text").required(),
                    ]),
                    hints: hints_for_method(&method),
                },
                chain: ExtractionChain::text_field("query"),
                template: RequestTemplate::new(method, url).bind(ArgumentBinding::filter("query")),
            }) as Arc<dyn ToolUnit>)
        })
    }
}

struct QueryRequestTool {
    descriptor: ToolDescriptor,
    chain: ExtractionChain,
    template: RequestTemplate,
}

impl ToolUnit for QueryRequestTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn extraction(&self) -> Option<&ExtractionChain> {
        Some(&self.chain)
    }

    fn prepare_call(&self, args: &JsonObject) -> Result<Step, HttpToolsError> {
        let request = self.template.resolve(args)?;
        Ok(Step::Http(
            HttpStep::new(request).with_summary(Value::Object(args.clone())),
        ))
    }
}
