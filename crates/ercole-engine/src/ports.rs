//! Collaborators the engine drives but does not own.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ercole_common::alert::{Alert, AlertsFilter};
use ercole_common::types::{HostData, License, LicenseType, OracleDatabase};

/// Snapshot persistence.
///
/// Implementations must keep at most one current (non-archived) snapshot
/// per hostname. `dismiss_host` followed by `insert_host_data` for the
/// same hostname is only safe when callers admit one ingestion per
/// hostname at a time, or when the store makes the pair atomic.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Most recent snapshot of `hostname` created strictly before `before`,
    /// archived or not.
    async fn find_most_recent_host_data_older_than(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Option<HostData>>;

    async fn insert_host_data(&self, hostdata: &HostData) -> anyhow::Result<()>;

    /// Archives the current snapshot of `hostname`, stamping the dismissal
    /// time. A host without a current snapshot is not an error.
    async fn dismiss_host(&self, hostname: &str) -> anyhow::Result<()>;

    /// Hostnames with a current snapshot, DR clones included.
    async fn get_hostnames(&self) -> anyhow::Result<Vec<String>>;

    /// Hostnames with a current snapshot, DR clones excluded.
    async fn get_current_hostnames(&self) -> anyhow::Result<Vec<String>>;

    /// Whether a current DR clone named `hostname` exists.
    async fn exists_dr(&self, hostname: &str) -> anyhow::Result<bool>;

    /// Distinct licenses of the current hosts whose Veritas peer list shares
    /// at least one name with `hostnames`.
    async fn get_cluster_veritas_license_by_hostnames(
        &self,
        hostnames: &[String],
    ) -> anyhow::Result<Vec<License>>;

    /// License-type ids enabled on `hostname` in any snapshot ever inserted.
    /// Deleting archived snapshots must not shrink this set.
    async fn find_enabled_license_type_ids(&self, hostname: &str)
        -> anyhow::Result<HashSet<String>>;

    /// Current, non-DR snapshots created before `before`.
    async fn find_old_current_hosts(&self, before: DateTime<Utc>) -> anyhow::Result<Vec<HostData>>;

    /// Deletes archived snapshots created before `before`, returning how
    /// many were removed. License history is kept.
    async fn delete_archived_host_data_older_than(&self, before: DateTime<Utc>)
        -> anyhow::Result<u64>;
}

/// Destination of every alert decided by the engine.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn throw_new_alert(&self, alert: Alert) -> anyhow::Result<()>;

    /// Removes NO_DATA alerts, for one host or for every host when
    /// `hostname` is `None`.
    async fn delete_no_data_alerts(&self, hostname: Option<&str>) -> anyhow::Result<()>;
}

/// Read-through access to the api-service: license-type catalogs, the
/// fleet-wide database list and existing alerts.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get_oracle_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>>;

    async fn get_sqlserver_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>>;

    async fn get_mysql_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>>;

    /// Every Oracle database of the fleet, with full details.
    async fn get_oracle_databases(&self) -> anyhow::Result<Vec<OracleDatabase>>;

    async fn get_alerts_by_filter(&self, filter: &AlertsFilter) -> anyhow::Result<Vec<Alert>>;

    async fn ack_alerts(&self, filter: &AlertsFilter) -> anyhow::Result<()>;
}
