//! License propagation from primary databases to their standbys.
//!
//! A mounted standby reports no usage of its own; it is licensed like the
//! primary it replicates, scaled by the standby host's cores.

use ercole_common::alert::{AlertCategory, AlertCode, AlertStatus, AlertsFilter};
use ercole_common::types::{HostData, HostInfo, License, OracleDatabase};

use crate::alerts::{self, AlertThrower};
use crate::checkers::CheckContext;
use crate::ports::ApiClient;

/// Propagates licenses to every mounted secondary database of `hostdata`.
///
/// The fleet-wide database list is only fetched when the host has a
/// secondary; a failed fetch is logged and leaves the secondaries as
/// reported.
pub async fn check_secondary_dbs(ctx: &CheckContext<'_>, hostdata: &mut HostData) {
    if !hostdata
        .oracle_databases()
        .iter()
        .any(OracleDatabase::is_mounted_secondary)
    {
        return;
    }

    let primaries: Vec<OracleDatabase> = match ctx.api.get_oracle_databases().await {
        Ok(dbs) => dbs.into_iter().filter(OracleDatabase::is_primary_open).collect(),
        Err(e) => {
            tracing::error!(
                error = %e,
                hostname = %hostdata.hostname,
                "Failed to fetch oracle databases, secondary licenses not propagated"
            );
            return;
        }
    };

    let hostname = hostdata.hostname.clone();
    let info = hostdata.info.clone();
    let host_core_factor = hostdata.core_factor();
    let Some(databases) = hostdata.oracle_databases_mut() else {
        return;
    };

    for db in databases.iter_mut().filter(|db| db.is_mounted_secondary()) {
        add_licenses_to_secondary_db(
            ctx.api,
            ctx.thrower,
            &hostname,
            &info,
            host_core_factor,
            &primaries,
            db,
        )
        .await;
    }
}

/// Licenses one secondary from its primary, matched by db id and name.
/// Without a primary the secondary is left untouched and a
/// MISSING_PRIMARY_DATABASE alert replaces any older one.
pub async fn add_licenses_to_secondary_db(
    api: &dyn ApiClient,
    thrower: &AlertThrower,
    hostname: &str,
    info: &HostInfo,
    host_core_factor: f64,
    primaries: &[OracleDatabase],
    secondary: &mut OracleDatabase,
) {
    let Some(primary) = primaries
        .iter()
        .find(|p| p.db_id == secondary.db_id && p.name == secondary.name)
    else {
        let filter = AlertsFilter {
            category: Some(AlertCategory::Engine),
            code: Some(AlertCode::MissingPrimaryDatabase),
            status: Some(AlertStatus::New),
            ..Default::default()
        }
        .with_other_info("hostname", hostname)
        .with_other_info("dbname", secondary.name.as_str());
        if let Err(e) = api.ack_alerts(&filter).await {
            tracing::error!(
                error = %e,
                hostname = %hostname,
                dbname = %secondary.name,
                "Failed to ack old missing primary database alerts"
            );
        }
        thrower
            .throw_best_effort(alerts::missing_primary_database_alert(hostname, &secondary.name))
            .await;
        return;
    };

    let Some(core_factor) = secondary.core_factor(info, host_core_factor) else {
        tracing::warn!(
            hostname = %hostname,
            dbname = %secondary.name,
            hardware = %info.hardware_abstraction_technology,
            "Cannot compute core factor, secondary licenses not propagated"
        );
        return;
    };

    let count = f64::from(info.cpu_cores) * core_factor;
    propagate_primary_licenses(primary, secondary, count);
}

/// Sets `count` on every license the primary actually uses, matching the
/// secondary's licenses by name and appending the missing ones.
pub fn propagate_primary_licenses(primary: &OracleDatabase, secondary: &mut OracleDatabase, count: f64) {
    for primary_license in primary.licenses.iter().filter(|l| l.count > 0.0) {
        match secondary
            .licenses
            .iter_mut()
            .find(|l| l.name == primary_license.name)
        {
            Some(license) => license.count = count,
            None => secondary.licenses.push(License {
                license_type_id: primary_license.license_type_id.clone(),
                name: primary_license.name.clone(),
                count,
                ignored: primary_license.ignored,
                ignored_comment: primary_license.ignored_comment.clone(),
            }),
        }
    }
}
