use std::collections::BTreeSet;

use ercole_common::alert::{
    AlertCategory, AlertCode, AlertDetails, AlertSeverity, AlertStatus, AlertsFilter, Technology,
};
use ercole_common::types::HostData;

use crate::alerts::{self, AlertThrower};
use crate::ports::ApiClient;

/// Compares the Oracle database names of two snapshots of a host.
///
/// Open MISSING_DATABASE alerts whose databases are all back are acked
/// first, then a single alert is thrown for the databases that
/// disappeared: Critical when none of the previous databases survived,
/// Warning otherwise.
pub async fn check_missing_databases(
    api: &dyn ApiClient,
    thrower: &AlertThrower,
    previous: Option<&HostData>,
    hostdata: &HostData,
) {
    let Some(previous) = previous.filter(|p| {
        p.features
            .oracle
            .as_ref()
            .is_some_and(|o| o.database.is_some())
    }) else {
        return;
    };

    let current_names: BTreeSet<&str> = hostdata
        .oracle_databases()
        .iter()
        .map(|db| db.name.as_str())
        .collect();
    let previous_names: BTreeSet<&str> = previous
        .oracle_databases()
        .iter()
        .map(|db| db.name.as_str())
        .collect();

    if let Err(e) = ack_recovered_missing_database_alerts(api, &hostdata.hostname, &current_names).await {
        tracing::error!(
            error = %e,
            hostname = %hostdata.hostname,
            "Failed to ack old missing database alerts"
        );
    }

    let missing: Vec<String> = previous_names
        .difference(&current_names)
        .map(|name| (*name).to_string())
        .collect();
    if missing.is_empty() {
        return;
    }

    let severity = if missing.len() == previous_names.len() {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    };
    thrower
        .throw_best_effort(alerts::missing_databases_alert(&hostdata.hostname, missing, severity))
        .await;
}

async fn ack_recovered_missing_database_alerts(
    api: &dyn ApiClient,
    hostname: &str,
    current_names: &BTreeSet<&str>,
) -> anyhow::Result<()> {
    let filter = AlertsFilter {
        category: Some(AlertCategory::License),
        affected_technology: Some(Technology::OracleDatabase),
        code: Some(AlertCode::MissingDatabase),
        status: Some(AlertStatus::New),
        ..Default::default()
    }
    .with_other_info("hostname", hostname);

    let recovered: Vec<String> = api
        .get_alerts_by_filter(&filter)
        .await?
        .into_iter()
        .filter(|alert| match &alert.details {
            AlertDetails::MissingDatabase { db_names, .. } => db_names
                .iter()
                .all(|name| current_names.contains(name.as_str())),
            _ => false,
        })
        .map(|alert| alert.id)
        .collect();

    if recovered.is_empty() {
        return Ok(());
    }
    api.ack_alerts(&AlertsFilter::by_ids(recovered)).await
}
