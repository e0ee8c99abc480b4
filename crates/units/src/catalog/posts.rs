//! Posts API (`{baseUrl}/posts[/{postId}]`), batch operations and the untyped `fetch_post` tool.

use super::with_tool_parameters;
use crate::batch::{BatchUnit, HttpStep, Step};
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use crate::tool::extract::ExtractionChain;
use crate::tool::schema::{FieldSpec, ToolArgumentSchema};
use crate::tool::{ToolDescriptor, ToolProvider, ToolUnit};
use flowunit_http_tools::semantics::hints_for_method;
use flowunit_http_tools::{ArgumentBinding, HttpToolsError, RequestTemplate};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
const DEFAULT_DESCRIPTION: &str =
    r#"Fetches a post by post ID. Example: "Show me post number 1" or {"postId":1}"#;

fn post_template(base_url: &str) -> RequestTemplate {
    let base = base_url.trim().trim_end_matches('/');
    let url = if base.is_empty() {
        String::new()
    } else {
        format!("{base}/posts/{{postId}}")
    };
    RequestTemplate::new(Method::GET, url).bind(ArgumentBinding::path("postId"))
}

pub struct Posts {
    params: ParameterSet,
}

impl Posts {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::options("operation", &["getPost", "getAllPosts"], "getPost"),
                ParameterDecl::endpoint("baseUrl", DEFAULT_BASE_URL),
                ParameterDecl::number("postId", 1).shown_for(&["getPost"]),
                ParameterDecl::string("description", DEFAULT_DESCRIPTION),
            ]),
        }
    }
}

impl Default for Posts {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for Posts {
    fn name(&self) -> &'static str {
        "posts"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        let base_url = item.string("baseUrl")?;

        let request = match item.string("operation")?.as_str() {
            "getAllPosts" => {
                let url = format!("{}/posts", base_url.trim().trim_end_matches('/'));
                RequestTemplate::new(Method::GET, url).resolve(&JsonObject::new())?
            }
            _ => {
                let mut args = JsonObject::new();
                args.insert("postId".into(), json!(item.integer("postId")?));
                post_template(&base_url).resolve(&args)?
            }
        };
        Ok(Step::http(request))
    }
}

impl ToolProvider for Posts {
    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn supply_tool(
        &self,
        parameters: &dyn ParameterSource,
    ) -> Result<Arc<dyn ToolUnit>, HttpToolsError> {
        with_tool_parameters(&self.params, parameters, |item| {
            let base_url = item.string("baseUrl")?;
            let description = match item.string("description")? {
                d if d.trim().is_empty() => DEFAULT_DESCRIPTION.to_string(),
                d => d,
            };

            Ok(Arc::new(FetchPostTool {
                descriptor: ToolDescriptor {
                    name: "fetch_post".into(),
                    description,
                    schema: ToolArgumentSchema::new(vec![
                        FieldSpec::integer("postId")
                            .describe("ID of the post to fetch")
                            .required()
                            .bounds(Some(1.0), None),
                    ]),
                    hints: hints_for_method(&Method::GET),
                },
                chain: ExtractionChain::integer_field("postId"),
                template: post_template(&base_url),
            }) as Arc<dyn ToolUnit>)
        })
    }
}

struct FetchPostTool {
    descriptor: ToolDescriptor,
    chain: ExtractionChain,
    template: RequestTemplate,
}

impl ToolUnit for FetchPostTool {
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
