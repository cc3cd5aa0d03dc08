use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ercole_common::alert::{Alert, AlertCode, AlertsFilter};
use ercole_common::types::{
    HostData, License, LicenseType, OracleDatabase, OracleDatabaseFeature, OracleFeature,
};

use crate::ports::{AlertSink, ApiClient, HostStore};
use crate::{Clock, EngineConfig, HostDataService};

/// Clock advancing one minute per reading, starting at `start`.
pub fn stepping_clock(start: DateTime<Utc>) -> Clock {
    let ticks = Arc::new(AtomicI64::new(0));
    Arc::new(move || start + Duration::minutes(ticks.fetch_add(1, Ordering::SeqCst)))
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

#[derive(Default)]
pub struct MemoryStore {
    pub snapshots: Mutex<Vec<HostData>>,
    pub calls: Mutex<Vec<String>>,
    pub veritas_licenses: Mutex<Vec<License>>,
    pub license_history: Mutex<HashMap<String, HashSet<String>>>,
    pub fail_insert: AtomicBool,
    pub fail_history: AtomicBool,
}

impl MemoryStore {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn current(&self, hostname: &str) -> Option<HostData> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.hostname == hostname && !h.archived)
            .cloned()
    }

    /// Dismisses a host the way a user would, outside any ingestion.
    pub fn dismiss_host_now(&self, hostname: &str) {
        for h in self
            .snapshots
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|h| h.hostname == hostname && !h.archived)
        {
            h.archived = true;
            h.dismissed_at = Some(Utc::now());
        }
    }

    pub fn seed(&self, hostdata: HostData) {
        self.snapshots.lock().unwrap().push(hostdata);
    }
}

#[async_trait]
impl HostStore for MemoryStore {
    async fn find_most_recent_host_data_older_than(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Option<HostData>> {
        self.record(format!("find_previous:{hostname}"));
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.hostname == hostname && h.created_at < before)
            .max_by_key(|h| h.created_at)
            .cloned())
    }

    async fn insert_host_data(&self, hostdata: &HostData) -> anyhow::Result<()> {
        self.record(format!("insert:{}", hostdata.hostname));
        if self.fail_insert.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.license_history
            .lock()
            .unwrap()
            .entry(hostdata.hostname.clone())
            .or_default()
            .extend(
                hostdata
                    .all_licenses()
                    .filter(|l| l.count > 0.0 && !l.license_type_id.is_empty())
                    .map(|l| l.license_type_id.clone()),
            );
        self.snapshots.lock().unwrap().push(hostdata.clone());
        Ok(())
    }

    async fn dismiss_host(&self, hostname: &str) -> anyhow::Result<()> {
        self.record(format!("dismiss:{hostname}"));
        for h in self
            .snapshots
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|h| h.hostname == hostname && !h.archived)
        {
            h.archived = true;
            h.dismissed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_hostnames(&self) -> anyhow::Result<Vec<String>> {
        self.record("get_hostnames".into());
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|h| !h.archived)
            .map(|h| h.hostname.clone())
            .collect())
    }

    async fn get_current_hostnames(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|h| !h.archived && !h.is_dr)
            .map(|h| h.hostname.clone())
            .collect())
    }

    async fn exists_dr(&self, hostname: &str) -> anyhow::Result<bool> {
        self.record(format!("exists_dr:{hostname}"));
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .any(|h| h.hostname == hostname && h.is_dr && !h.archived))
    }

    async fn get_cluster_veritas_license_by_hostnames(
        &self,
        hostnames: &[String],
    ) -> anyhow::Result<Vec<License>> {
        self.record(format!("veritas_licenses:{}", hostnames.join(",")));
        Ok(self.veritas_licenses.lock().unwrap().clone())
    }

    async fn find_enabled_license_type_ids(
        &self,
        hostname: &str,
    ) -> anyhow::Result<HashSet<String>> {
        if self.fail_history.load(Ordering::SeqCst) {
            anyhow::bail!("history unavailable");
        }
        Ok(self
            .license_history
            .lock()
            .unwrap()
            .get(hostname)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_old_current_hosts(&self, before: DateTime<Utc>) -> anyhow::Result<Vec<HostData>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|h| !h.archived && !h.is_dr && h.created_at < before)
            .cloned()
            .collect())
    }

    async fn delete_archived_host_data_older_than(
        &self,
        before: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let len = snapshots.len();
        snapshots.retain(|h| !(h.archived && h.created_at < before));
        Ok((len - snapshots.len()) as u64)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<Alert>>,
    pub no_data_deletes: Mutex<Vec<Option<String>>>,
    pub fail: AtomicBool,
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

    async fn delete_no_data_alerts(&self, hostname: Option<&str>) -> anyhow::Result<()> {
        self.no_data_deletes
            .lock()
            .unwrap()
            .push(hostname.map(str::to_string));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub oracle_license_types: Vec<LicenseType>,
    pub sqlserver_license_types: Vec<LicenseType>,
    pub mysql_license_types: Vec<LicenseType>,
    pub oracle_databases: Vec<OracleDatabase>,
    pub existing_alerts: Mutex<Vec<Alert>>,
    pub acked: Mutex<Vec<AlertsFilter>>,
    pub fail_catalog: bool,
}

impl FakeApi {
    pub fn acked(&self) -> Vec<AlertsFilter> {
        self.acked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn get_oracle_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        if self.fail_catalog {
            anyhow::bail!("api-service unreachable");
        }
        Ok(self.oracle_license_types.clone())
    }

    async fn get_sqlserver_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.sqlserver_license_types.clone())
    }

    async fn get_mysql_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.mysql_license_types.clone())
    }

    async fn get_oracle_databases(&self) -> anyhow::Result<Vec<OracleDatabase>> {
        Ok(self.oracle_databases.clone())
    }

    async fn get_alerts_by_filter(&self, filter: &AlertsFilter) -> anyhow::Result<Vec<Alert>> {
        Ok(self
            .existing_alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn ack_alerts(&self, filter: &AlertsFilter) -> anyhow::Result<()> {
        self.acked.lock().unwrap().push(filter.clone());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub api: Arc<FakeApi>,
    pub service: HostDataService,
}

impl Harness {
    pub fn new(api: FakeApi) -> Self {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let api = Arc::new(api);
        let config = EngineConfig {
            server_version: "test".into(),
            ..Default::default()
        };
        let service = HostDataService::new(
            store.clone(),
            sink.clone(),
            api.clone(),
            config,
            stepping_clock(t0()),
        );
        Self {
            store,
            sink,
            api,
            service,
        }
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.sink.alerts.lock().unwrap().clone()
    }

    pub fn alerts_with_code(&self, code: AlertCode) -> Vec<Alert> {
        self.alerts().into_iter().filter(|a| a.code() == code).collect()
    }

    pub fn clear_alerts(&self) {
        self.sink.alerts.lock().unwrap().clear();
    }
}

pub fn oracle_catalog() -> Vec<LicenseType> {
    vec![
        LicenseType {
            id: "A90611".into(),
            item_description: "Oracle Database Enterprise Edition".into(),
            metric: "Processor Perpetual".into(),
            aliases: vec!["Oracle ENT".into()],
            ..Default::default()
        },
        LicenseType {
            id: "A90619".into(),
            item_description: "Partitioning".into(),
            metric: "Processor Perpetual".into(),
            aliases: vec!["Partitioning".into()],
            option: true,
            ..Default::default()
        },
        LicenseType {
            id: "A90620".into(),
            item_description: "Real Application Clusters".into(),
            metric: "Processor Perpetual".into(),
            aliases: vec!["Real Application Clusters".into()],
            option: true,
            ..Default::default()
        },
    ]
}

pub fn host(hostname: &str) -> HostData {
    serde_json::from_value(serde_json::json!({
        "hostname": hostname,
        "environment": "PRD",
        "info": {
            "hostname": hostname,
            "cpuCores": 8,
            "cpuSockets": 2,
            "cpuThreads": 16,
            "hardwareAbstraction": "VIRT",
            "hardwareAbstractionTechnology": "VMWARE"
        }
    }))
    .unwrap()
}

pub fn license(id: &str, name: &str, count: f64) -> License {
    License {
        license_type_id: id.into(),
        name: name.into(),
        count,
        ..Default::default()
    }
}

pub fn oracle_db(name: &str, licenses: Vec<License>) -> OracleDatabase {
    OracleDatabase {
        name: name.into(),
        db_id: 1000,
        role: "PRIMARY".into(),
        status: "OPEN".into(),
        version: "19.0.0.0.0 Enterprise Edition".into(),
        licenses,
        ..Default::default()
    }
}

pub fn with_oracle(mut hostdata: HostData, databases: Vec<OracleDatabase>) -> HostData {
    hostdata.features.oracle = Some(OracleFeature {
        database: Some(OracleDatabaseFeature {
            databases,
            unlisted_running_databases: Vec::new(),
        }),
        ..Default::default()
    });
    hostdata
}
