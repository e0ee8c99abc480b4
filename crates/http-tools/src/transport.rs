//! The outbound HTTP capability consumed by units.
//!
//! Units only see [`HttpTransport`]; tests substitute a scripted implementation and production
//! uses [`ReqwestTransport`].

use crate::config::HttpClientConfig;
use crate::error::HttpToolsError;
use crate::request::RequestSpec;
use crate::safety::{OutboundPolicy, redact_url, sanitize_reqwest_error};
use async_trait::async_trait;
use base64::Engine as _;
use mime::Mime;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// A failed call: network error, policy rejection or non-2xx status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub status_code: Option<u16>,
    /// Parsed upstream body, when the server answered.
    pub response: Option<Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            response: None,
        }
    }

    #[must_use]
    pub fn with_response(mut self, status_code: u16, response: Value) -> Self {
        self.status_code = Some(status_code);
        self.response = Some(response);
        self
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self {
            message: sanitize_reqwest_error(&value),
            status_code: value.status().map(|s| s.as_u16()),
            response: None,
        }
    }
}

/// Perform one JSON request and return the parsed body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn perform(&self, request: &RequestSpec) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
    policy: OutboundPolicy,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(cfg: &HttpClientConfig) -> Result<Self, HttpToolsError> {
        let policy = OutboundPolicy::from_config(cfg);
        let redirect = if policy.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = Client::builder().redirect(redirect).build().map_err(|e| {
            HttpToolsError::config(format!(
                "failed to build HTTP client: {}",
                sanitize_reqwest_error(&e)
            ))
        })?;

        Ok(Self {
            client,
            timeout: cfg.timeout(),
            policy,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(&self, request: &RequestSpec) -> Result<Value, TransportError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| TransportError::new(format!("Invalid URL: {e}")))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for p in &request.query {
                pairs.append_pair(&p.key, &p.value);
            }
        }
        self.policy.check_url(&url)?;

        debug!(method = %request.method, url = %redact_url(&url), "performing request");

        let mut builder = self.client.request(request.method.clone(), url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes =
            read_response_body_limited_bytes(response, self.policy.max_response_bytes).await?;
        let body = decode_body(&bytes, content_type.as_deref());

        if status.is_success() {
            return Ok(body);
        }

        let code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("Unknown");
        Err(TransportError::new(format!("API returned {code} {reason}")).with_response(code, body))
    }
}

async fn read_response_body_limited_bytes(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>, TransportError> {
    let Some(max) = max_bytes else {
        let bytes = response.bytes().await?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(TransportError::new(format!(
            "Response too large: {len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(TransportError::new(format!(
                "Response too large: exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

/// JSON bodies are parsed, other text is kept as a string, binary is wrapped as base64.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    let Ok(text) = std::str::from_utf8(bytes) else {
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        return json!({
            "encoding": "base64",
            "mimeType": content_type,
            "data": b64
        });
    };

    let mime = content_type.and_then(|ct| ct.parse::<Mime>().ok());
    let try_json = match &mime {
        None => true,
        Some(m) => m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON),
    };

    if try_json && let Ok(v) = serde_json::from_str::<Value>(text) {
        return v;
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ArgumentBinding, RequestTemplate};
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::routing::{any, get};
    use serde_json::Map;
    use std::collections::HashSet;
    use tokio::net::TcpListener;

    async fn echo_handler(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> axum::Json<Value> {
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        axum::Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query().unwrap_or(""),
            "accept": headers.get("accept").and_then(|v| v.to_str().ok()),
            "body": body,
        }))
    }

    async fn spawn_server() -> (String, tokio::sync::oneshot::Sender<()>) {
        let app = Router::new()
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, axum::Json(json!({ "detail": "nope" }))) }),
            )
            .route("/text", get(|| async { "plain words" }))
            .route("/{*path}", any(echo_handler));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move { server.await });
        (format!("http://{addr}"), shutdown_tx)
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn get_sends_query_and_headers() {
        let (base, shutdown) = spawn_server().await;
        let transport = ReqwestTransport::new(&HttpClientConfig::default()).expect("transport");

        let spec = RequestTemplate::new(reqwest::Method::GET, format!("{base}/search"))
            .header("accept", "application/json")
            .bind(ArgumentBinding::filter("query"))
            .bind(ArgumentBinding::filter("limit").query_as("k"))
            .resolve(&args(json!({ "query": "q 1", "limit": 3 })))
            .expect("resolve");

        let echoed = transport.perform(&spec).await.expect("perform");
        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["path"], "/search");
        assert_eq!(echoed["accept"], "application/json");
        let query: Vec<(String, String)> =
            url::form_urlencoded::parse(echoed["query"].as_str().unwrap_or("").as_bytes())
                .into_owned()
                .collect();
        assert_eq!(
            query,
            vec![
                ("query".to_string(), "q 1".to_string()),
                ("k".to_string(), "3".to_string())
            ]
        );

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let (base, shutdown) = spawn_server().await;
        let transport = ReqwestTransport::new(&HttpClientConfig::default()).expect("transport");

        let spec = RequestTemplate::new(reqwest::Method::POST, format!("{base}/docs"))
            .bind(ArgumentBinding::filter("documentName"))
            .resolve(&args(json!({ "documentName": "Report 2023" })))
            .expect("resolve");

        let echoed = transport.perform(&spec).await.expect("perform");
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["body"], json!({ "documentName": "Report 2023" }));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn non_success_status_carries_code_and_body() {
        let (base, shutdown) = spawn_server().await;
        let transport = ReqwestTransport::new(&HttpClientConfig::default()).expect("transport");

        let spec = RequestTemplate::new(reqwest::Method::GET, format!("{base}/missing"))
            .resolve(&Map::new())
            .expect("resolve");
        let err = transport.perform(&spec).await.unwrap_err();
        assert_eq!(err.status_code, Some(404));
        assert_eq!(err.response, Some(json!({ "detail": "nope" })));
        assert!(err.message.contains("404"));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn plain_text_body_is_kept_as_string() {
        let (base, shutdown) = spawn_server().await;
        let transport = ReqwestTransport::new(&HttpClientConfig::default()).expect("transport");

        let spec = RequestTemplate::new(reqwest::Method::GET, format!("{base}/text"))
            .resolve(&Map::new())
            .expect("resolve");
        let body = transport.perform(&spec).await.expect("perform");
        assert_eq!(body, json!("plain words"));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn response_limit_is_enforced() {
        let (base, shutdown) = spawn_server().await;
        let cfg = HttpClientConfig {
            max_response_bytes: Some(8),
            ..HttpClientConfig::default()
        };
        let transport = ReqwestTransport::new(&cfg).expect("transport");

        let spec = RequestTemplate::new(reqwest::Method::GET, format!("{base}/anything"))
            .resolve(&Map::new())
            .expect("resolve");
        let err = transport.perform(&spec).await.unwrap_err();
        assert!(err.message.contains("Response too large"));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn disallowed_host_is_rejected_before_sending() {
        let cfg = HttpClientConfig {
            allowed_hosts: Some(HashSet::from(["api.example.com".to_string()])),
            ..HttpClientConfig::default()
        };
        let transport = ReqwestTransport::new(&cfg).expect("transport");
        let spec = RequestTemplate::new(reqwest::Method::GET, "http://127.0.0.1:9/x")
            .resolve(&Map::new())
            .expect("resolve");
        let err = transport.perform(&spec).await.unwrap_err();
        assert!(err.message.contains("not in allowlist"));
        assert_eq!(err.status_code, None);
    }

    #[test]
    fn decode_body_handles_binary_and_empty() {
        assert_eq!(decode_body(b"", None), Value::Null);
        let v = decode_body(&[0xff, 0xfe], Some("application/octet-stream"));
        assert_eq!(v["encoding"], "base64");
        assert_eq!(decode_body(b"{\"a\":1}", Some("application/json; charset=utf-8")), json!({ "a": 1 }));
        assert_eq!(decode_body(b"<p>1</p>", Some("text/html")), json!("<p>1</p>"));
    }
}
