use std::collections::HashSet;

use ercole_common::id;
use ercole_common::types::{
    HostData, License, OracleDatabase, OracleDatabaseFeature, OracleFeature,
};

use crate::ports::HostStore;

pub const DR_SUFFIX: &str = "_DR";

/// Name of the database created on a DR clone that has none, to carry the
/// Veritas cluster licenses.
pub const DR_PLACEHOLDER_DATABASE: &str = "ERCOLE_DR";

pub fn dr_hostname(hostname: &str) -> String {
    format!("{hostname}{DR_SUFFIX}")
}

/// Refreshes the `<hostname>_DR` clone of `hostdata`, if one was created.
///
/// Nothing but the existence check touches the store when there is no
/// clone. No alert is thrown for the clone.
pub async fn create_dr(store: &dyn HostStore, hostdata: &HostData) -> anyhow::Result<()> {
    if hostdata.is_dr {
        return Ok(());
    }
    let dr_name = dr_hostname(&hostdata.hostname);
    if !store.exists_dr(&dr_name).await? {
        return Ok(());
    }

    store.dismiss_host(&dr_name).await?;

    let mut clone = hostdata.clone();
    clone.id = id::next_id();
    clone.hostname = dr_name;
    clone.is_dr = true;

    if clone.cluster_membership_status.veritas_cluster_server {
        for peer in clone
            .cluster_membership_status
            .veritas_cluster_hostnames
            .iter_mut()
        {
            *peer = dr_hostname(peer);
        }
        let veritas_licenses = store
            .get_cluster_veritas_license_by_hostnames(
                &clone.cluster_membership_status.veritas_cluster_hostnames,
            )
            .await?;
        apply_veritas_licenses(&mut clone, veritas_licenses);
    }

    tracing::info!(hostname = %clone.hostname, "Refreshing disaster recovery host");
    store.insert_host_data(&clone).await
}

/// Puts the cluster-wide licenses on the clone: all of them on a
/// placeholder database when the clone has none, otherwise only those not
/// already counted on a real database, appended to the first one.
pub fn apply_veritas_licenses(clone: &mut HostData, veritas_licenses: Vec<License>) {
    let databases = &mut clone
        .features
        .oracle
        .get_or_insert_with(OracleFeature::default)
        .database
        .get_or_insert_with(OracleDatabaseFeature::default)
        .databases;

    if databases.is_empty() {
        databases.push(OracleDatabase {
            name: DR_PLACEHOLDER_DATABASE.to_string(),
            licenses: veritas_licenses,
            ..Default::default()
        });
        return;
    }

    let counted: HashSet<&str> = databases
        .iter()
        .flat_map(|db| db.licenses.iter())
        .filter(|l| l.count > 0.0)
        .map(|l| l.license_type_id.as_str())
        .collect();
    let difference: Vec<License> = veritas_licenses
        .into_iter()
        .filter(|l| !counted.contains(l.license_type_id.as_str()))
        .collect();

    databases[0].licenses.extend(difference);
}
