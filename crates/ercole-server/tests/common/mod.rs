#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use ercole_common::alert::{Alert, AlertsFilter};
use ercole_common::types::{LicenseType, OracleDatabase};
use ercole_engine::ports::{AlertSink, ApiClient};
use ercole_engine::{system_clock, HostDataService};
use ercole_server::app;
use ercole_server::config::ServerConfig;
use ercole_server::state::AppState;
use ercole_storage::HostDataStore;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

#[derive(Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<Alert>>,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn throw_new_alert(&self, alert: Alert) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("alert-service unreachable");
        }
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }

    async fn delete_no_data_alerts(&self, _hostname: Option<&str>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// api-service double with a fixed Oracle catalog and no fleet data.
#[derive(Default)]
pub struct StaticApi {
    pub oracle_license_types: Vec<LicenseType>,
}

#[async_trait]
impl ApiClient for StaticApi {
    async fn get_oracle_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.oracle_license_types.clone())
    }

    async fn get_sqlserver_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(Vec::new())
    }

    async fn get_mysql_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(Vec::new())
    }

    async fn get_oracle_databases(&self) -> anyhow::Result<Vec<OracleDatabase>> {
        Ok(Vec::new())
    }

    async fn get_alerts_by_filter(&self, _filter: &AlertsFilter) -> anyhow::Result<Vec<Alert>> {
        Ok(Vec::new())
    }

    async fn ack_alerts(&self, _filter: &AlertsFilter) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct TestContext {
    pub temp_dir: TempDir,
    pub sink: Arc<RecordingSink>,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let mut config = ServerConfig::default();
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();

    let store = Arc::new(
        HostDataStore::new(&config.database.connection_url(), temp_dir.path()).await?,
    );
    let sink = Arc::new(RecordingSink::default());
    let api = Arc::new(StaticApi {
        oracle_license_types: vec![LicenseType {
            id: "A90611".into(),
            item_description: "Oracle Database Enterprise Edition".into(),
            metric: "Processor Perpetual".into(),
            aliases: vec!["Oracle ENT".into()],
            ..Default::default()
        }],
    });

    let service = Arc::new(HostDataService::new(
        store,
        sink.clone(),
        api,
        config.engine_config(),
        system_clock(),
    ));
    let state = AppState::new(service, config);
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        sink,
        state,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (StatusCode, Value, Option<String>) {
    request_raw(app, method, uri, body.to_string()).await
}

pub async fn request_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: String,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

pub fn hostdata(hostname: &str) -> Value {
    serde_json::json!({
        "hostname": hostname,
        "environment": "PRD",
        "location": "Italy",
        "agentVersion": "latest",
        "info": {
            "hostname": hostname,
            "cpuCores": 8,
            "cpuSockets": 2,
            "cpuThreads": 16,
            "hardwareAbstraction": "VIRT",
            "hardwareAbstractionTechnology": "VMWARE"
        },
        "features": {
            "oracle": {
                "database": {
                    "databases": [{
                        "name": "ERP",
                        "dbID": 42,
                        "role": "PRIMARY",
                        "status": "OPEN",
                        "version": "19.0.0.0.0 Enterprise Edition",
                        "licenses": [{ "licenseTypeID": "A90611", "name": "Oracle ENT", "count": 4.0 }]
                    }]
                }
            }
        },
        "clusters": [],
        "errors": []
    })
}
