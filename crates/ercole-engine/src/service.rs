use std::collections::HashSet;
use std::sync::Arc;

use ercole_common::id;
use ercole_common::types::{AgentError, HostData, SERVER_SCHEMA_VERSION};
use serde_json::Value;

use crate::alerts::{self, AlertThrower};
use crate::checkers::{self, CheckContext, TechnologyChecker};
use crate::error::{EngineError, IngestError};
use crate::ports::{AlertSink, ApiClient, HostStore};
use crate::{cluster, dr, Clock, EngineConfig, LicenseHistory};

/// Ingests hostdata snapshots.
///
/// Each call to [`HostDataService::insert_host_data`] compares the new
/// snapshot with the previous one of the same host, throws the resulting
/// alerts and replaces the current snapshot in the store. Callers must not
/// run two ingestions for the same hostname concurrently unless the store
/// makes dismiss + insert atomic.
pub struct HostDataService {
    store: Arc<dyn HostStore>,
    api: Arc<dyn ApiClient>,
    thrower: AlertThrower,
    checkers: Vec<Box<dyn TechnologyChecker>>,
    config: EngineConfig,
    clock: Clock,
}

impl HostDataService {
    pub fn new(
        store: Arc<dyn HostStore>,
        alert_sink: Arc<dyn AlertSink>,
        api: Arc<dyn ApiClient>,
        config: EngineConfig,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            api,
            thrower: AlertThrower::new(alert_sink, clock.clone()),
            checkers: checkers::default_checkers(),
            config,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn HostStore> {
        &self.store
    }

    /// Runs the whole ingestion of one snapshot and returns the id it was
    /// stored under.
    pub async fn insert_host_data(&self, mut hostdata: HostData) -> Result<String, IngestError> {
        validate(&hostdata)?;

        hostdata.server_version = self.config.server_version.clone();
        hostdata.server_schema_version = SERVER_SCHEMA_VERSION;
        hostdata.archived = false;
        hostdata.dismissed_at = None;
        hostdata.created_at = (self.clock)();
        hostdata.id = id::next_id();

        let previous = self
            .store
            .find_most_recent_host_data_older_than(&hostdata.hostname, hostdata.created_at)
            .await
            .map_err(|e| IngestError::infrastructure("find previous hostdata", e))?
            .filter(|p| !p.archived);

        if previous.is_none() {
            self.thrower
                .throw(alerts::new_server_alert(&hostdata.hostname))
                .await
                .map_err(|e| IngestError::infrastructure("throw NEW_SERVER alert", e))?;
        }

        let history = self.license_history(&hostdata.hostname, previous.as_ref()).await;
        let ctx = CheckContext {
            api: self.api.as_ref(),
            thrower: &self.thrower,
            config: &self.config,
            history: &history,
        };
        for checker in &self.checkers {
            let result = if checker.applies_to(&hostdata) {
                checker.check(&ctx, previous.as_ref(), &mut hostdata).await
            } else {
                match previous.as_ref().filter(|p| checker.applies_to(p)) {
                    Some(prev) => checker.check_removed(&ctx, prev, &hostdata).await,
                    None => continue,
                }
            };
            if let Err(e) = result {
                tracing::error!(
                    error = %e,
                    hostname = %hostdata.hostname,
                    technology = ?checker.technology(),
                    "Technology check failed"
                );
            }
        }

        self.check_clusters(&mut hostdata).await;

        self.store
            .dismiss_host(&hostdata.hostname)
            .await
            .map_err(|e| IngestError::infrastructure("dismiss previous hostdata", e))?;

        if self.config.log_inserting_hostdata {
            match serde_json::to_string(&hostdata) {
                Ok(json) => tracing::info!(hostname = %hostdata.hostname, hostdata = %json, "Inserting hostdata"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode hostdata for logging"),
            }
        }
        self.store
            .insert_host_data(&hostdata)
            .await
            .map_err(|e| IngestError::infrastructure("insert hostdata", e))?;

        if let Err(e) = self
            .thrower
            .sink()
            .delete_no_data_alerts(Some(&hostdata.hostname))
            .await
        {
            tracing::error!(
                error = %e,
                hostname = %hostdata.hostname,
                "Failed to clear NO_DATA alerts"
            );
        }

        if !hostdata.errors.is_empty() {
            self.thrower
                .throw_best_effort(alerts::agent_error_alert(
                    &hostdata.hostname,
                    hostdata.errors.clone(),
                ))
                .await;
        }

        dr::create_dr(self.store.as_ref(), &hostdata)
            .await
            .map_err(|e| IngestError::infrastructure("create DR", e))?;

        tracing::info!(hostname = %hostdata.hostname, id = %hostdata.id, "Hostdata inserted");
        Ok(hostdata.id)
    }

    /// Reports a payload the boundary rejected before ingestion. The
    /// hostname and agent errors are read from whatever part of `raw` can
    /// still be understood.
    pub async fn alert_invalid_host_data(
        &self,
        validation_error: &str,
        raw: &Value,
    ) -> Result<(), EngineError> {
        let hostname = raw
            .get("hostname")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .unwrap_or("unknown");

        let mut errors = vec![AgentError {
            message: validation_error.to_string(),
            class: "InvalidHostdata".to_string(),
        }];
        if let Some(reported) = raw.get("errors").and_then(Value::as_array) {
            errors.extend(
                reported
                    .iter()
                    .filter_map(|e| serde_json::from_value::<AgentError>(e.clone()).ok()),
            );
        }

        self.thrower
            .throw(alerts::agent_error_alert(hostname, errors))
            .await
            .map_err(EngineError::AlertDelivery)
    }

    /// Full license history of the host, falling back to the previous
    /// snapshot alone when the store cannot provide it.
    async fn license_history(&self, hostname: &str, previous: Option<&HostData>) -> LicenseHistory {
        match self.store.find_enabled_license_type_ids(hostname).await {
            Ok(ids) => LicenseHistory::new(ids),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    hostname = %hostname,
                    "Failed to read license history, using the previous snapshot only"
                );
                previous.map(LicenseHistory::from_snapshot).unwrap_or_default()
            }
        }
    }

    async fn check_clusters(&self, hostdata: &mut HostData) {
        if !hostdata.clusters.is_empty() {
            match self.store.get_hostnames().await {
                Ok(hostnames) => cluster::reconcile_cluster_hostnames(&mut hostdata.clusters, &hostnames),
                Err(e) => tracing::error!(
                    error = %e,
                    hostname = %hostdata.hostname,
                    "Failed to read hostnames, cluster VMs not reconciled"
                ),
            }
        }
        cluster::qualify_veritas_hostnames(hostdata);
    }
}

fn validate(hostdata: &HostData) -> Result<(), IngestError> {
    if hostdata.hostname.trim().is_empty() {
        return Err(IngestError::Validation("hostname is empty".into()));
    }

    ensure_unique(
        "oracle database",
        hostdata.oracle_databases().iter().map(|db| db.name.as_str()),
    )?;
    ensure_unique(
        "sql server instance",
        hostdata.sqlserver_instances().iter().map(|i| i.name.as_str()),
    )?;
    ensure_unique(
        "mysql instance",
        hostdata.mysql_instances().iter().map(|i| i.name.as_str()),
    )
}

fn ensure_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), IngestError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(IngestError::Validation(format!("duplicate {kind} name: {name}")));
        }
    }
    Ok(())
}
