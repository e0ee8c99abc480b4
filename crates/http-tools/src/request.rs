//! Request resolution: static endpoint configuration + untrusted argument values -> `RequestSpec`.
//!
//! Resolution is pure. It never touches the network, so configuration problems (an empty URL, a
//! body that is not JSON) surface before any transport is involved.

use crate::error::{HttpToolsError, Result};
use crate::semantics::carries_body;
use reqwest::Method;
use serde_json::{Map, Value, json};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPair {
    pub key: String,
    pub value: String,
}

/// A fully resolved outbound call. Built fresh for every record / tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub query: Vec<QueryPair>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    /// Compact JSON description (method, url, query, body) for records and logs.
    #[must_use]
    pub fn summary(&self) -> Value {
        let mut out = json!({
            "method": self.method.as_str(),
            "url": self.url,
        });
        if !self.query.is_empty() {
            let query: Vec<Value> = self
                .query
                .iter()
                .map(|p| json!([p.key, p.value]))
                .collect();
            out["query"] = Value::Array(query);
        }
        if let Some(body) = &self.body {
            out["body"] = body.clone();
        }
        out
    }

    /// First query value for `key`, if any.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    /// Query parameter for read-style methods, body field for write-style methods.
    Filter { query: String, body: String },
    Query(String),
    Body(String),
    /// Substituted into a `{name}` placeholder of the URL.
    Path,
    Header(String),
    /// A whole JSON body, possibly supplied as a string that must parse strictly.
    RawBody,
}

/// Maps one argument name onto its place in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentBinding {
    name: String,
    placement: Placement,
    omit_when_falsy: bool,
}

impl ArgumentBinding {
    fn with(name: impl Into<String>, placement: Placement) -> Self {
        Self {
            name: name.into(),
            placement,
            omit_when_falsy: false,
        }
    }

    /// Search/filter argument: query parameter on reads, body field on writes.
    ///
    /// Both wire names default to the argument name.
    pub fn filter(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with(
            name.clone(),
            Placement::Filter {
                query: name.clone(),
                body: name,
            },
        )
    }

    pub fn query(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with(name.clone(), Placement::Query(name))
    }

    pub fn body(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with(name.clone(), Placement::Body(name))
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::with(name, Placement::Path)
    }

    pub fn header(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::with(name, Placement::Header(header.into()))
    }

    pub fn raw_body(name: impl Into<String>) -> Self {
        Self::with(name, Placement::RawBody)
    }

    /// Rename the query parameter this argument is sent as.
    #[must_use]
    pub fn query_as(mut self, wire: impl Into<String>) -> Self {
        match &mut self.placement {
            Placement::Filter { query, .. } | Placement::Query(query) => *query = wire.into(),
            _ => {}
        }
        self
    }

    /// Rename the body field this argument is sent as.
    #[must_use]
    pub fn body_as(mut self, wire: impl Into<String>) -> Self {
        match &mut self.placement {
            Placement::Filter { body, .. } | Placement::Body(body) => *body = wire.into(),
            _ => {}
        }
        self
    }

    /// Treat `0`, `false` and `""` like an absent argument.
    #[must_use]
    pub fn omit_when_falsy(mut self) -> Self {
        self.omit_when_falsy = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn value_in<'a>(&self, args: &'a Map<String, Value>) -> Option<&'a Value> {
        let value = args.get(&self.name)?;
        if value.is_null() || (self.omit_when_falsy && is_falsy(value)) {
            return None;
        }
        Some(value)
    }
}

/// Static description of one endpoint: method, URL (with optional `{name}` placeholders), static
/// headers and the argument bindings.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    bindings: Vec<ArgumentBinding>,
}

impl RequestTemplate {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            bindings: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn bind(mut self, binding: ArgumentBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Resolve argument values into a request.
    ///
    /// # Errors
    ///
    /// - `Config` if the URL is empty or does not parse
    /// - `MalformedPayload` if a raw body string is not valid JSON on a body-bearing method
    /// - `InvalidArguments` if a path argument is missing
    pub fn resolve(&self, args: &Map<String, Value>) -> Result<RequestSpec> {
        let base = self.url.trim();
        if base.is_empty() {
            return Err(HttpToolsError::config("missing endpoint URL"));
        }

        let body_bearing = carries_body(&self.method);
        let mut url = base.to_string();
        let mut query: Vec<QueryPair> = Vec::new();
        let mut headers = self.headers.clone();
        let mut body_fields: Map<String, Value> = Map::new();
        let mut raw_body: Option<Value> = None;

        for binding in &self.bindings {
            let Some(value) = binding.value_in(args) else {
                if binding.placement == Placement::Path {
                    return Err(HttpToolsError::invalid(format!(
                        "missing required argument '{}'",
                        binding.name
                    )));
                }
                continue;
            };

            match &binding.placement {
                Placement::Filter { query: q, body: b } => {
                    if body_bearing {
                        body_fields.insert(b.clone(), value.clone());
                    } else {
                        query.extend(serialize_query_param(q, value));
                    }
                }
                Placement::Query(q) => query.extend(serialize_query_param(q, value)),
                Placement::Body(b) => {
                    body_fields.insert(b.clone(), value.clone());
                }
                Placement::Path => {
                    let placeholder = format!("{{{}}}", binding.name);
                    let segment = encode_component(&value_to_string(value));
                    url = url.replace(&placeholder, &segment);
                }
                Placement::Header(h) => headers.push((h.clone(), value_to_string(value))),
                Placement::RawBody => {
                    if body_bearing {
                        raw_body = parse_raw_body(&binding.name, value)?;
                    }
                }
            }
        }

        Url::parse(&url)
            .map_err(|e| HttpToolsError::config(format!("invalid endpoint URL '{url}': {e}")))?;

        let body = match raw_body {
            Some(Value::Object(mut obj)) => {
                obj.extend(body_fields);
                Some(Value::Object(obj))
            }
            Some(other) => Some(other),
            None if body_fields.is_empty() => None,
            None => Some(Value::Object(body_fields)),
        };

        Ok(RequestSpec {
            method: self.method.clone(),
            url,
            query,
            body,
            headers,
        })
    }
}

/// Bounds for result-count style arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountBounds {
    pub default: i64,
    pub max: i64,
}

impl CountBounds {
    #[must_use]
    pub fn new(default: i64, max: i64) -> Self {
        Self { default, max }
    }

    /// Clamp a requested count into `[1, max]`, substituting the default when the value is absent
    /// or not numeric.
    #[must_use]
    pub fn clamp(&self, requested: Option<&Value>) -> i64 {
        let n = requested.and_then(as_count).unwrap_or(self.default);
        n.clamp(1, self.max.max(1))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_raw_body(name: &str, value: &Value) -> Result<Option<Value>> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => serde_json::from_str(s).map(Some).map_err(|e| {
            HttpToolsError::MalformedPayload(format!("argument '{name}' is not valid JSON: {e}"))
        }),
        other => Ok(Some(other.clone())),
    }
}

fn serialize_query_param(name: &str, value: &Value) -> Vec<QueryPair> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| QueryPair {
                key: name.to_string(),
                value: value_to_string(v),
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| QueryPair {
                key: format!("{name}[{k}]"),
                value: value_to_string(v),
            })
            .collect(),
        _ => vec![QueryPair {
            key: name.to_string(),
            value: value_to_string(value),
        }],
    }
}

fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    fn search_template(method: Method) -> RequestTemplate {
        RequestTemplate::new(method, "https://api.example.com/search")
            .bind(ArgumentBinding::filter("query"))
            .bind(ArgumentBinding::filter("limit").query_as("k"))
    }

    #[test]
    fn empty_url_is_a_configuration_error() {
        let err = RequestTemplate::new(Method::GET, "   ")
            .resolve(&Map::new())
            .unwrap_err();
        assert!(matches!(err, HttpToolsError::Config(ref m) if m == "missing endpoint URL"));
        assert!(err.is_fatal());
    }

    #[test]
    fn unparseable_url_is_a_configuration_error() {
        let err = RequestTemplate::new(Method::GET, "not a url")
            .resolve(&Map::new())
            .unwrap_err();
        assert!(matches!(err, HttpToolsError::Config(_)));
    }

    #[test]
    fn filter_arguments_go_to_query_on_reads() {
        let spec = search_template(Method::GET)
            .resolve(&args(json!({ "query": "reports", "limit": 3 })))
            .expect("resolve");
        assert_eq!(spec.query_value("query"), Some("reports"));
        assert_eq!(spec.query_value("k"), Some("3"));
        assert!(spec.body.is_none());
    }

    #[test]
    fn filter_arguments_go_to_body_on_writes() {
        let spec = search_template(Method::POST)
            .resolve(&args(json!({ "query": "reports", "limit": 3 })))
            .expect("resolve");
        assert!(spec.query.is_empty());
        assert_eq!(spec.body, Some(json!({ "query": "reports", "limit": 3 })));
    }

    #[test]
    fn falsy_optional_arguments_are_omitted() {
        let template = RequestTemplate::new(Method::POST, "https://api.example.com/docs")
            .bind(ArgumentBinding::filter("documentName"))
            .bind(ArgumentBinding::filter("responseCount").omit_when_falsy());
        let spec = template
            .resolve(&args(json!({ "documentName": "Q3", "responseCount": 0 })))
            .expect("resolve");
        assert_eq!(spec.body, Some(json!({ "documentName": "Q3" })));
    }

    #[test]
    fn raw_body_string_is_parsed_strictly() {
        let template = RequestTemplate::new(Method::POST, "https://api.example.com/x")
            .bind(ArgumentBinding::raw_body("requestBody"));

        let spec = template
            .resolve(&args(json!({ "requestBody": "{\"a\": 1}" })))
            .expect("resolve");
        assert_eq!(spec.body, Some(json!({ "a": 1 })));

        let err = template
            .resolve(&args(json!({ "requestBody": "{a: 1" })))
            .unwrap_err();
        assert!(matches!(err, HttpToolsError::MalformedPayload(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn raw_body_is_not_sent_on_reads() {
        let spec = RequestTemplate::new(Method::GET, "https://api.example.com/x")
            .bind(ArgumentBinding::raw_body("requestBody"))
            .resolve(&args(json!({ "requestBody": "not json" })))
            .expect("resolve");
        assert!(spec.body.is_none());
    }

    #[test]
    fn path_arguments_are_substituted_and_encoded() {
        let template = RequestTemplate::new(Method::GET, "https://api.example.com/posts/{postId}")
            .bind(ArgumentBinding::path("postId"));
        let spec = template
            .resolve(&args(json!({ "postId": 7 })))
            .expect("resolve");
        assert_eq!(spec.url, "https://api.example.com/posts/7");

        let spec = template
            .resolve(&args(json!({ "postId": "a b/c" })))
            .expect("resolve");
        assert_eq!(spec.url, "https://api.example.com/posts/a%20b%2Fc");

        let err = template.resolve(&Map::new()).unwrap_err();
        assert!(matches!(err, HttpToolsError::InvalidArguments { .. }));
    }

    #[test]
    fn static_and_bound_headers_are_kept_in_order() {
        let spec = RequestTemplate::new(Method::GET, "https://api.example.com")
            .header("accept", "application/json")
            .bind(ArgumentBinding::header("trace", "x-trace"))
            .resolve(&args(json!({ "trace": "t-1" })))
            .expect("resolve");
        assert_eq!(
            spec.headers,
            vec![
                ("accept".to_string(), "application/json".to_string()),
                ("x-trace".to_string(), "t-1".to_string()),
            ]
        );
    }

    #[test]
    fn array_and_object_query_values_expand() {
        let spec = RequestTemplate::new(Method::GET, "https://api.example.com")
            .bind(ArgumentBinding::query("tags"))
            .bind(ArgumentBinding::query("filter"))
            .resolve(&args(json!({ "tags": ["a", "b"], "filter": { "year": 2023 } })))
            .expect("resolve");
        let pairs: Vec<(&str, &str)> = spec
            .query
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("tags", "a"), ("tags", "b"), ("filter[year]", "2023")]
        );
    }

    #[test]
    fn count_is_clamped_into_range() {
        let bounds = CountBounds::new(5, 100);
        assert_eq!(bounds.clamp(Some(&json!(500))), 100);
        assert_eq!(bounds.clamp(Some(&json!(0))), 1);
        assert_eq!(bounds.clamp(Some(&json!(-4))), 1);
        assert_eq!(bounds.clamp(Some(&json!(42))), 42);
        assert_eq!(bounds.clamp(Some(&json!("7"))), 7);
        assert_eq!(bounds.clamp(None), 5);
        assert_eq!(bounds.clamp(Some(&json!("many"))), 5);
    }

    #[test]
    fn default_above_max_is_clamped_too() {
        assert_eq!(CountBounds::new(50, 10).clamp(None), 10);
        assert_eq!(CountBounds::new(5, 0).clamp(Some(&json!(9))), 1);
    }
}
