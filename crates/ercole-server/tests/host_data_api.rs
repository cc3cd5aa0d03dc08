mod common;

use axum::http::StatusCode;
use common::{build_test_context, hostdata, request_json, request_no_body, request_raw};
use ercole_common::alert::{AlertCode, AlertDetails, AlertSeverity};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn health_reports_ok_store() {
    let ctx = build_test_context().await.expect("test context should build");

    let (status, body, trace_id) = request_no_body(&ctx.app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["storage_status"], "ok");
    assert_eq!(body["trace_id"].as_str(), trace_id.as_deref());
}

#[tokio::test]
async fn first_hostdata_is_stored_and_alerted() {
    let ctx = build_test_context().await.expect("test context should build");

    let (status, body, _) = request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["id"].as_str().is_some_and(|id| !id.is_empty()));

    let codes: Vec<AlertCode> = ctx.sink.alerts().iter().map(|a| a.code()).collect();
    assert_eq!(
        codes,
        vec![AlertCode::NewServer, AlertCode::NewDatabase, AlertCode::NewLicense]
    );

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/hosts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!(["db01"]));
}

#[tokio::test]
async fn reingesting_the_same_hostdata_raises_nothing_new() {
    let ctx = build_test_context().await.expect("test context should build");
    request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;
    let before = ctx.sink.alerts().len();

    let (status, _, _) = request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.sink.alerts().len(), before);
}

#[tokio::test]
async fn malformed_json_is_rejected_without_alert() {
    let ctx = build_test_context().await.expect("test context should build");

    let (status, body, _) = request_raw(&ctx.app, "POST", "/hosts", "{not json".into()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["err_code"], 1201);
    assert!(ctx.sink.alerts().is_empty());
}

#[tokio::test]
async fn undecodable_hostdata_is_rejected_with_agent_error() {
    let ctx = build_test_context().await.expect("test context should build");
    let mut payload = hostdata("db01");
    payload["info"]["cpuCores"] = serde_json::json!("eight");

    let (status, body, _) = request_json(&ctx.app, "POST", "/hosts", payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["err_code"], 1202);
    let alerts = ctx.sink.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    match &alerts[0].details {
        AlertDetails::AgentError { hostname, errors } => {
            assert_eq!(hostname, "db01");
            assert_eq!(errors[0].class, "InvalidHostdata");
        }
        other => panic!("unexpected alert {other:?}"),
    }
}

#[tokio::test]
async fn business_rule_violation_is_422_and_not_stored() {
    let ctx = build_test_context().await.expect("test context should build");
    let mut payload = hostdata("db01");
    let db = payload["features"]["oracle"]["database"]["databases"][0].clone();
    payload["features"]["oracle"]["database"]["databases"] = serde_json::json!([db.clone(), db]);

    let (status, body, _) = request_json(&ctx.app, "POST", "/hosts", payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["err_code"], 1202);
    let (_, hosts, _) = request_no_body(&ctx.app, "GET", "/hosts").await;
    assert_eq!(hosts["data"], serde_json::json!([]));
    assert_eq!(ctx.sink.alerts()[0].code(), AlertCode::AgentError);
}

#[tokio::test]
async fn new_server_delivery_failure_is_500() {
    let ctx = build_test_context().await.expect("test context should build");
    ctx.sink.fail.store(true, Ordering::SeqCst);

    let (status, body, _) = request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["err_code"], 1500);
    let (_, hosts, _) = request_no_body(&ctx.app, "GET", "/hosts").await;
    assert_eq!(hosts["data"], serde_json::json!([]));
}

#[tokio::test]
async fn dismissed_host_disappears_and_comes_back_as_new() {
    let ctx = build_test_context().await.expect("test context should build");
    request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;

    let (status, _, _) = request_no_body(&ctx.app, "DELETE", "/hosts/db01").await;
    assert_eq!(status, StatusCode::OK);
    let (_, hosts, _) = request_no_body(&ctx.app, "GET", "/hosts").await;
    assert_eq!(hosts["data"], serde_json::json!([]));

    let (status, _, _) = request_no_body(&ctx.app, "DELETE", "/hosts/db01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request_json(&ctx.app, "POST", "/hosts", hostdata("db01")).await;
    let new_server = ctx
        .sink
        .alerts()
        .iter()
        .filter(|a| a.code() == AlertCode::NewServer)
        .count();
    assert_eq!(new_server, 2);
}

#[tokio::test]
async fn concurrent_ingestions_of_one_host_keep_a_single_current_snapshot() {
    let ctx = build_test_context().await.expect("test context should build");

    let requests = (0..4).map(|_| {
        let app = ctx.app.clone();
        tokio::spawn(async move { request_json(&app, "POST", "/hosts", hostdata("db01")).await })
    });
    for handle in requests {
        let (status, _, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, hosts, _) = request_no_body(&ctx.app, "GET", "/hosts").await;
    assert_eq!(hosts["data"], serde_json::json!(["db01"]));
    let new_server = ctx
        .sink
        .alerts()
        .iter()
        .filter(|a| a.code() == AlertCode::NewServer)
        .count();
    assert_eq!(new_server, 1);
}

#[tokio::test]
async fn openapi_document_lists_host_routes() {
    let ctx = build_test_context().await.expect("test context should build");

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/hosts"]["post"].is_object());
    assert!(body["paths"]["/hosts"]["get"].is_object());
    assert!(body["paths"]["/hosts/{hostname}"]["delete"].is_object());
}
