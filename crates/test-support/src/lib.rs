//! Test doubles shared by the flowunit crates.

use anyhow::Context as _;
use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use flowunit_http_tools::{HttpTransport, RequestSpec, TransportError};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Transport stub: answers from a script, records every request.
///
/// Once the script is exhausted every call gets the fallback answer (an error unless set with
/// [`ScriptedTransport::otherwise`]).
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    fallback: Result<Value, TransportError>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(TransportError::new("unscripted request")),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with `payload`.
    #[must_use]
    pub fn always(payload: Value) -> Self {
        Self::new().otherwise(Ok(payload))
    }

    #[must_use]
    pub fn then_ok(self, payload: Value) -> Self {
        self.script.lock().push_back(Ok(payload));
        self
    }

    #[must_use]
    pub fn then_err(self, err: TransportError) -> Self {
        self.script.lock().push_back(Err(err));
        self
    }

    #[must_use]
    pub fn otherwise(mut self, result: Result<Value, TransportError>) -> Self {
        self.fallback = result;
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn perform(&self, request: &RequestSpec) -> Result<Value, TransportError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Local HTTP server for transport-level tests. Stops when dropped.
///
/// - `/status/{code}`: responds with that status and `{"status": code}`
/// - `/documents?query=..&k=..`: `k` rows of `{"page_content": .., "score": ..}`
/// - anything else: echoes `{method, path, query, accept, body}`
pub struct EchoServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl EchoServer {
    /// # Errors
    ///
    /// Returns an error if no localhost port can be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let app = Router::new()
            .route("/status/{code}", any(status_handler))
            .route("/documents", get(documents_handler))
            .fallback(echo_handler);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind ephemeral port")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = rx.await;
        });
        tokio::spawn(async move { server.await });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(tx),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn echo_handler(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> axum::Json<Value> {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let query: Vec<Value> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .map(|(k, v)| json!([k, v]))
        .collect();
    axum::Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": query,
        "accept": headers.get("accept").and_then(|v| v.to_str().ok()),
        "body": body,
    }))
}

async fn status_handler(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, axum::Json(json!({ "status": code })))
}

async fn documents_handler(Query(params): Query<HashMap<String, String>>) -> axum::Json<Value> {
    let query = params.get("query").cloned().unwrap_or_default();
    let k = params
        .get("k")
        .and_then(|k| k.parse::<usize>().ok())
        .unwrap_or(3);
    let rows: Vec<Value> = (1..=k)
        .map(|i| json!({ "page_content": format!("{query} #{i}"), "score": 1.0 / i as f64 }))
        .collect();
    axum::Json(Value::Array(rows))
}
