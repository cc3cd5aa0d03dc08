use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ercole_common::alert::{AlertCategory, AlertCode, AlertSeverity, AlertsFilter, Technology};
use ercole_common::types::{HostData, LicenseType, OracleDatabase, OracleEdition};

use super::{
    carry_forward_ignored, catalog_or_empty, throw_license_alerts, CheckContext, LicenseTypeCatalog,
    LicensedEntry, TechnologyChecker,
};
use crate::{alerts, missing, secondary};

pub const RAC_IGNORED_COMMENT: &str = "RAC license ignored by Ercole";

pub struct OracleChecker;

#[async_trait]
impl TechnologyChecker for OracleChecker {
    fn technology(&self) -> Technology {
        Technology::OracleDatabase
    }

    fn applies_to(&self, hostdata: &HostData) -> bool {
        hostdata
            .features
            .oracle
            .as_ref()
            .is_some_and(|o| o.database.is_some())
    }

    async fn check(
        &self,
        ctx: &CheckContext<'_>,
        previous: Option<&HostData>,
        hostdata: &mut HostData,
    ) -> anyhow::Result<()> {
        secondary::check_secondary_dbs(ctx, hostdata).await;

        let mut license_types = catalog_or_empty(
            self.technology(),
            ctx.api.get_oracle_database_license_types().await,
        );
        sort_license_types(
            &mut license_types,
            ctx.config.license_type_metrics(&hostdata.environment),
        );
        let catalog = LicenseTypeCatalog::new(&license_types);

        let previous_dbs: HashMap<&str, &OracleDatabase> = previous
            .map(|p| p.oracle_databases().iter().map(|db| (db.name.as_str(), db)).collect())
            .unwrap_or_default();

        if let Some(databases) = hostdata.oracle_databases_mut() {
            for db in databases.iter_mut() {
                assign_license_type_ids(db, &license_types);
                if let Some(prev) = previous_dbs.get(db.name.as_str()) {
                    carry_forward_ignored(&prev.licenses, &mut db.licenses);
                }
                ignore_standard_edition_rac(db);
            }
        }

        let hostname = hostdata.hostname.clone();
        let entries: Vec<LicensedEntry<'_>> = hostdata
            .oracle_databases()
            .iter()
            .map(|db| LicensedEntry {
                name: &db.name,
                previous: previous_dbs.get(db.name.as_str()).map(|p| p.licenses.as_slice()),
                current: &db.licenses,
            })
            .collect();
        throw_license_alerts(ctx, self.technology(), &hostname, &entries, &catalog).await;

        throw_unlisted_running_databases(ctx, hostdata).await;

        if let Some(prev) = previous {
            if prev.info.cpu_cores < hostdata.info.cpu_cores {
                ctx.thrower
                    .throw_best_effort(alerts::increased_cpu_cores_alert(
                        &hostname,
                        prev.info.cpu_cores,
                        hostdata.info.cpu_cores,
                    ))
                    .await;
            }
        }

        missing::check_missing_databases(ctx.api, ctx.thrower, previous, hostdata).await;
        Ok(())
    }

    async fn check_removed(
        &self,
        ctx: &CheckContext<'_>,
        previous: &HostData,
        hostdata: &HostData,
    ) -> anyhow::Result<()> {
        missing::check_missing_databases(ctx.api, ctx.thrower, Some(previous), hostdata).await;
        Ok(())
    }
}

/// Orders the catalog by the configured metric priority, then by item
/// description. Unlisted metrics sort last.
pub(crate) fn sort_license_types(license_types: &mut [LicenseType], metrics: &[String]) {
    license_types.sort_by(|a, b| {
        let rank = |lt: &LicenseType| {
            metrics
                .iter()
                .position(|m| *m == lt.metric)
                .unwrap_or(metrics.len())
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.item_description.cmp(&b.item_description))
    });
}

/// Gives a license-type id to every license the agent reported by name
/// only, matching the name against catalog aliases. Each license type is
/// used at most once per database; higher counts pick first.
pub(crate) fn assign_license_type_ids(db: &mut OracleDatabase, license_types: &[LicenseType]) {
    let mut used: HashSet<String> = db
        .licenses
        .iter()
        .filter(|l| !l.license_type_id.is_empty())
        .map(|l| l.license_type_id.clone())
        .collect();

    let mut pending: Vec<usize> = (0..db.licenses.len())
        .filter(|&i| db.licenses[i].license_type_id.is_empty())
        .collect();
    pending.sort_by(|&a, &b| {
        let (la, lb) = (&db.licenses[a], &db.licenses[b]);
        lb.count
            .total_cmp(&la.count)
            .then_with(|| la.name.cmp(&lb.name))
    });

    for i in pending {
        let name = db.licenses[i].name.clone();
        let found = license_types.iter().find(|lt| {
            !used.contains(&lt.id) && lt.aliases.iter().any(|alias| *alias == name)
        });
        if let Some(license_type) = found {
            db.licenses[i].license_type_id = license_type.id.clone();
            used.insert(license_type.id.clone());
        }
    }
}

/// RAC is not billable on Standard Edition.
pub(crate) fn ignore_standard_edition_rac(db: &mut OracleDatabase) {
    if !db.is_rac || db.edition() != OracleEdition::Standard {
        return;
    }
    for license in db
        .licenses
        .iter_mut()
        .filter(|l| l.name.to_lowercase().contains("real application clusters"))
    {
        license.ignored = true;
        license.ignored_comment = Some(RAC_IGNORED_COMMENT.to_string());
    }
}

async fn throw_unlisted_running_databases(ctx: &CheckContext<'_>, hostdata: &HostData) {
    let Some(unlisted) = hostdata
        .features
        .oracle
        .as_ref()
        .and_then(|o| o.database.as_ref())
        .map(|d| &d.unlisted_running_databases)
    else {
        return;
    };

    for dbname in unlisted {
        let filter = AlertsFilter {
            category: Some(AlertCategory::Engine),
            affected_technology: Some(Technology::OracleDatabase),
            code: Some(AlertCode::UnlistedRunningDatabase),
            severity: Some(AlertSeverity::Warning),
            ..Default::default()
        }
        .with_other_info("hostname", hostdata.hostname.as_str())
        .with_other_info("dbname", dbname.as_str());
        if let Err(e) = ctx.api.ack_alerts(&filter).await {
            tracing::error!(
                error = %e,
                hostname = %hostdata.hostname,
                dbname = %dbname,
                "Failed to ack old unlisted running database alerts"
            );
        }

        ctx.thrower
            .throw_best_effort(alerts::unlisted_running_database_alert(&hostdata.hostname, dbname))
            .await;
    }
}
