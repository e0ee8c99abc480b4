//! Generic request with a JSON body typed in as text.

use super::method_param;
use crate::batch::{BatchUnit, Step};
use crate::host::JsonObject;
use crate::parameters::{ItemParameters, ParameterDecl, ParameterSet};
use flowunit_http_tools::{ArgumentBinding, HttpToolsError, RequestTemplate};

pub struct JsonBodyRequest {
    params: ParameterSet,
}

impl JsonBodyRequest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(vec![
                ParameterDecl::endpoint("apiUrl", ""),
                ParameterDecl::options(
                    "httpMethod",
                    &["GET", "POST", "PUT", "PATCH", "DELETE"],
                    "POST",
                ),
                ParameterDecl::string("requestBody", "{}"),
            ]),
        }
    }
}

impl Default for JsonBodyRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchUnit for JsonBodyRequest {
    fn name(&self) -> &'static str {
        "jsonBodyRequest"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&self, item: &ItemParameters<'_>) -> Result<Step, HttpToolsError> {
        let url = item.string("apiUrl")?;
        let method = method_param(item, "httpMethod")?;

        let mut args = JsonObject::new();
        args.insert("requestBody".into(), item.get("requestBody")?);

        let request = RequestTemplate::new(method, url)
            .header("content-type", "application/json")
            .bind(ArgumentBinding::raw_body("requestBody"))
            .resolve(&args)?;
        Ok(Step::http(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticParameters;
    use serde_json::json;

    fn prepare(src: &StaticParameters) -> Result<Step, HttpToolsError> {
        let unit = JsonBodyRequest::new();
        let record = JsonObject::new();
        unit.prepare(&ItemParameters::new(&unit.params, src, 0, &record))
    }

    #[test]
    fn body_string_is_parsed() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://api.example.com/items")
            .with("requestBody", r#"{"name": "widget", "qty": 2}"#);
        let Step::Http(step) = prepare(&src).unwrap() else {
            panic!("expected http step")
        };
        assert_eq!(
            step.request().body,
            Some(json!({ "name": "widget", "qty": 2 }))
        );
        assert_eq!(step.summary().unwrap()["method"], "POST");
    }

    #[test]
    fn malformed_body_is_not_sent_as_text() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://api.example.com/items")
            .with("requestBody", "{name: widget}");
        let err = prepare(&src).unwrap_err();
        assert!(matches!(err, HttpToolsError::MalformedPayload(_)));
    }

    #[test]
    fn unknown_method_is_rejected_as_an_option() {
        let src = StaticParameters::default()
            .with("apiUrl", "https://api.example.com/items")
            .with("httpMethod", "TRACE");
        let err = prepare(&src).unwrap_err();
        assert!(matches!(err, HttpToolsError::InvalidArguments { .. }));
    }
}
