use flowunit_http_tools::{HttpToolsError, ReqwestTransport, TransportError};
use flowunit_http_tools::config::HttpClientConfig;
use flowunit_test_support::{EchoServer, ScriptedTransport};
use flowunit_units::catalog::{self, UnitKind};
use flowunit_units::{
    ExecutionContext, InputRecord, JsonObject, PerItemParameters, StaticParameters, UnitError,
    run_batch,
};
use serde_json::{Value, json};

fn obj(v: Value) -> JsonObject {
    v.as_object().cloned().expect("object")
}

fn records(values: &[Value]) -> Vec<InputRecord> {
    values.iter().cloned().map(|v| InputRecord::new(obj(v))).collect()
}

fn document_params(url: &str) -> StaticParameters {
    StaticParameters::default()
        .with("apiUrl", url)
        .with("documentName", "={{ $json.doc }}")
}

#[tokio::test]
async fn continue_on_fail_keeps_one_output_per_record() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new()
        .then_ok(json!({ "hits": 1 }))
        .then_err(
            TransportError::new("API returned 502 Bad Gateway").with_response(502, json!({})),
        )
        .then_ok(json!({ "hits": 3 }));
    let params = document_params("https://docs.example.com/search");
    let input = records(&[
        json!({ "doc": "a" }),
        json!({ "doc": "b" }),
        json!({ "doc": "c" }),
    ]);

    let unit = catalog::batch_unit(UnitKind::DocumentSearch)?;
    let ctx = ExecutionContext::new(&params, &transport).continue_on_fail(true);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert_eq!(out.len(), 3);
    for (i, record) in out.iter().enumerate() {
        assert_eq!(record.paired_item, i);
    }
    assert_eq!(out[0].json["response"], json!({ "hits": 1 }));
    assert_eq!(out[2].json["response"], json!({ "hits": 3 }));
    assert!(out[1].is_error());
    assert_eq!(out[1].json["error"], "API returned 502 Bad Gateway");
    assert_eq!(out[1].json["input"], json!({ "doc": "b" }));
    assert!(out[1].json.get("response").is_none());
    assert_eq!(transport.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_batch_yields_empty_output() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let params = document_params("https://docs.example.com/search");
    let unit = catalog::batch_unit(UnitKind::DocumentSearch)?;
    let ctx = ExecutionContext::new(&params, &transport);
    let out = run_batch(unit.as_ref(), &[], &ctx).await?;
    assert!(out.is_empty());
    assert_eq!(transport.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn abort_mode_reports_failing_index_and_no_partial_output() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new()
        .then_ok(json!({}))
        .then_ok(json!({}))
        .then_err(TransportError::new("connection refused"));
    let params = document_params("https://docs.example.com/search");
    let input = records(&[
        json!({ "doc": "a" }),
        json!({ "doc": "b" }),
        json!({ "doc": "c" }),
        json!({ "doc": "d" }),
    ]);

    let unit = catalog::batch_unit(UnitKind::DocumentSearch)?;
    let ctx = ExecutionContext::new(&params, &transport);
    let err = run_batch(unit.as_ref(), &input, &ctx)
        .await
        .expect_err("third record fails");

    assert_eq!(err.item_index(), Some(2));
    assert_eq!(err.to_string(), "item 2 failed: connection refused");
    assert_eq!(transport.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_endpoint_fails_before_any_call() -> anyhow::Result<()> {
    let transport = ScriptedTransport::always(json!({}));
    let params = document_params("");
    let input = records(&[json!({ "doc": "a" })]);

    for kind in [
        UnitKind::DocumentSearch,
        UnitKind::JsonBodyRequest,
        UnitKind::Fetch,
        UnitKind::Search,
    ] {
        let unit = catalog::batch_unit(kind)?;
        let ctx = ExecutionContext::new(&params, &transport).continue_on_fail(true);
        let err = run_batch(unit.as_ref(), &input, &ctx)
            .await
            .expect_err("configuration error");
        assert!(
            matches!(
                err,
                UnitError::ItemFailed {
                    index: 0,
                    source: HttpToolsError::Config(_)
                }
            ),
            "{kind}: {err}"
        );
    }
    assert_eq!(transport.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_contained_per_record() -> anyhow::Result<()> {
    let transport = ScriptedTransport::always(json!({ "created": true }));
    let params = PerItemParameters::new(
        obj(json!({ "apiUrl": "https://api.example.com/items", "requestBody": "{\"a\": 1}" })),
        vec![JsonObject::new(), obj(json!({ "requestBody": "{oops" }))],
    );
    let input = records(&[json!({ "n": 0 }), json!({ "n": 1 })]);

    let unit = catalog::batch_unit(UnitKind::JsonBodyRequest)?;
    let ctx = ExecutionContext::new(&params, &transport).continue_on_fail(true);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert_eq!(out[0].json["response"], json!({ "created": true }));
    assert!(out[1].is_error());
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.requests()[0].body, Some(json!({ "a": 1 })));
    Ok(())
}

#[tokio::test]
async fn response_wins_over_existing_record_field() -> anyhow::Result<()> {
    let transport = ScriptedTransport::always(json!({ "id": 1 }));
    let params = StaticParameters::default()
        .with("apiUrl", "https://api.example.com/posts/1")
        .with("responseProperty", "data");
    let input = records(&[json!({ "data": "stale", "keep": true })]);

    let unit = catalog::batch_unit(UnitKind::Fetch)?;
    let ctx = ExecutionContext::new(&params, &transport);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert_eq!(out[0].json["data"], json!({ "id": 1 }));
    assert_eq!(out[0].json["keep"], true);
    Ok(())
}

#[tokio::test]
async fn search_over_http_plucks_page_content() -> anyhow::Result<()> {
    let server = EchoServer::start().await?;
    let transport = ReqwestTransport::new(&HttpClientConfig::default())?;
    let params = StaticParameters::default()
        .with("apiUrl", server.url("/documents"))
        .with("query", "={{ $json.q }}")
        .with("limit", 50)
        .with("maxLimit", 2);
    let input = records(&[json!({ "q": "contracts" })]);

    let unit = catalog::batch_unit(UnitKind::Search)?;
    let ctx = ExecutionContext::new(&params, &transport);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert_eq!(out[0].json["results"], json!(["contracts #1", "contracts #2"]));
    assert_eq!(out[0].json["request"], json!({ "query": "contracts", "limit": 2 }));
    Ok(())
}

#[tokio::test]
async fn unreadable_search_limit_falls_back_to_one() -> anyhow::Result<()> {
    let transport = ScriptedTransport::always(json!([{ "page_content": "only" }]));
    let params = StaticParameters::default()
        .with("apiUrl", "https://search.example.com/query")
        .with("query", "reports")
        .with("limit", "many");
    let input = records(&[json!({ "n": 1 })]);

    let unit = catalog::batch_unit(UnitKind::Search)?;
    let ctx = ExecutionContext::new(&params, &transport);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert!(!out[0].is_error());
    assert_eq!(out[0].json["results"], json!(["only"]));
    assert_eq!(out[0].json["request"], json!({ "query": "reports", "limit": 1 }));
    assert_eq!(transport.requests()[0].query_value("k"), Some("1"));
    Ok(())
}

#[tokio::test]
async fn upstream_status_is_a_recoverable_failure() -> anyhow::Result<()> {
    let server = EchoServer::start().await?;
    let transport = ReqwestTransport::new(&HttpClientConfig::default())?;
    let params = StaticParameters::default().with("apiUrl", server.url("/status/503"));
    let input = records(&[json!({ "n": 1 })]);

    let unit = catalog::batch_unit(UnitKind::Fetch)?;
    let ctx = ExecutionContext::new(&params, &transport).continue_on_fail(true);
    let out = run_batch(unit.as_ref(), &input, &ctx).await?;

    assert!(out[0].is_error());
    assert!(out[0].json["error"].as_str().unwrap_or("").contains("503"));
    Ok(())
}
