//! Local greet/calculate unit; the tool it supplies depends on the configured operation.

use super::with_tool_parameters;
use crate::batch::{BatchUnit, Step};
use crate::host::{JsonObject, ParameterSource};
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use crate::tool::schema::{FieldSpec, ToolArgumentSchema};
use crate::tool::{ToolDescriptor, ToolProvider, ToolUnit};
use flowunit_http_tools::HttpToolsError;
use flowunit_http_tools::semantics::MethodHints;
use serde_json::{Value, json};
use std::sync::Arc;

fn greet(name: &str) -> Value {
    json!({ "result": format!("Hello, {name}!") })
}

fn double(number: &Value) -> Result<Value, HttpToolsError> {
    if let Some(n) = number.as_i64()
        && let Some(doubled) = n.checked_mul(2)
    {
        return Ok(json!({ "result": doubled }));
    }
    number
        .as_f64()
        .map(|n| json!({ "result": n * 2.0 }))
        .ok_or_else(|| HttpToolsError::invalid(format!("'{number}' is not a number")))
}

pub struct MultiMode {
    params: ParameterSet,
}

impl MultiMode {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::options("operation", &["greet", "calculate"], "greet").required(),
                ParameterDecl::string("name", "").shown_for(&["greet"]),
                ParameterDecl::number("number", 0).shown_for(&["calculate"]),
            ]),
        }
    }
}

impl Default for MultiMode {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for MultiMode {
    fn name(&self) -> &'static str {
        "multiMode"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        match item.string("operation")?.as_str() {
            "calculate" => Ok(Step::local(double(&item.get("number")?)?)),
            _ => Ok(Step::local(greet(&item.string("name")?))),
        }
    }
}

impl ToolProvider for MultiMode {
    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn supply_tool(
        &self,
        parameters: &dyn ParameterSource,
    ) -> Result<Arc<dyn ToolUnit>, HttpToolsError> {
        let operation = with_tool_parameters(&self.params, parameters, |item| {
            item.string("operation")
        })?;

        let (op, name, description, field) = match operation.as_str() {
            "greet" => (
                Operation::Greet,
                "greet_tool",
                "Generates a greeting message",
                FieldSpec::string("name").describe("Person name to greet"),
            ),
            "calculate" => (
                Operation::Calculate,
                "calculate_tool",
                "Doubles the input number",
                FieldSpec::number("number").describe("Number to double"),
            ),
            other => {
                return Err(HttpToolsError::config(format!(
                    "unsupported operation for a tool: {other}"
                )));
            }
        };

        Ok(Arc::new(MultiModeTool {
            operation: op,
            descriptor: ToolDescriptor {
                name: name.into(),
                description: description.into(),
                schema: ToolArgumentSchema::new(vec![field.required()]),
                hints: MethodHints::local(),
            },
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Greet,
    Calculate,
}

struct MultiModeTool {
    operation: Operation,
    descriptor: ToolDescriptor,
}

impl ToolUnit for MultiModeTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn prepare_call(&self, args: &JsonObject) -> Result<Step, HttpToolsError> {
        let result = match self.operation {
            Operation::Greet => greet(args.get("name").and_then(Value::as_str).unwrap_or_default()),
            Operation::Calculate => double(args.get("number").unwrap_or(&Value::Null))?,
        };
        Ok(Step::local(result))
    }
}
