//! Per-technology checks run on every ingested snapshot.

pub mod mysql;
pub mod oracle;
pub mod sqlserver;

use std::collections::HashMap;

use async_trait::async_trait;
use ercole_common::alert::Technology;
use ercole_common::types::{HostData, License, LicenseType};

use crate::alerts::{self, AlertThrower};
use crate::diff::{self, ActivationKind, DiffFeature};
use crate::ports::ApiClient;
use crate::{EngineConfig, LicenseHistory};

pub use mysql::MySqlChecker;
pub use oracle::OracleChecker;
pub use sqlserver::SqlServerChecker;

/// Everything a checker needs besides the two snapshots.
pub struct CheckContext<'a> {
    pub api: &'a dyn ApiClient,
    pub thrower: &'a AlertThrower,
    pub config: &'a EngineConfig,
    /// License types enabled on this host in earlier snapshots.
    pub history: &'a LicenseHistory,
}

/// Checks one technology block of a snapshot, normalizing its license data
/// in place and throwing the alerts derived from the previous snapshot.
#[async_trait]
pub trait TechnologyChecker: Send + Sync {
    fn technology(&self) -> Technology;

    /// Whether the technology block is present on `hostdata`.
    fn applies_to(&self, hostdata: &HostData) -> bool;

    async fn check(
        &self,
        ctx: &CheckContext<'_>,
        previous: Option<&HostData>,
        hostdata: &mut HostData,
    ) -> anyhow::Result<()>;

    /// Called instead of `check` when the previous snapshot carried the
    /// technology block and `hostdata` no longer does.
    async fn check_removed(
        &self,
        _ctx: &CheckContext<'_>,
        _previous: &HostData,
        _hostdata: &HostData,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn default_checkers() -> Vec<Box<dyn TechnologyChecker>> {
    vec![
        Box::new(OracleChecker),
        Box::new(SqlServerChecker),
        Box::new(MySqlChecker),
    ]
}

/// License-type catalog of one technology, indexed by id.
#[derive(Debug, Default)]
pub struct LicenseTypeCatalog {
    by_id: HashMap<String, LicenseType>,
}

impl LicenseTypeCatalog {
    pub fn new(license_types: &[LicenseType]) -> Self {
        Self {
            by_id: license_types
                .iter()
                .map(|lt| (lt.id.clone(), lt.clone()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&LicenseType> {
        self.by_id.get(id)
    }
}

/// Falls back to an empty catalog when the api-service cannot be read:
/// activation alerts degrade, ingestion goes on.
pub(crate) fn catalog_or_empty(
    technology: Technology,
    fetched: anyhow::Result<Vec<LicenseType>>,
) -> Vec<LicenseType> {
    fetched.unwrap_or_else(|e| {
        tracing::error!(
            error = %e,
            technology = ?technology,
            "Failed to fetch license types, continuing with an empty catalog"
        );
        Vec::new()
    })
}

/// Copies the ignore decision of the previous snapshot onto the matching
/// licenses (same license-type id) of the current one. A license is never
/// un-ignored here.
pub(crate) fn carry_forward_ignored(previous: &[License], current: &mut [License]) {
    let previous_by_id: HashMap<&str, &License> = previous
        .iter()
        .filter(|l| !l.license_type_id.is_empty())
        .map(|l| (l.license_type_id.as_str(), l))
        .collect();

    for license in current.iter_mut() {
        let Some(prev) = previous_by_id.get(license.license_type_id.as_str()) else {
            continue;
        };
        if prev.ignored {
            license.ignored = true;
            if license.ignored_comment.is_none() {
                license.ignored_comment = prev.ignored_comment.clone();
            }
        }
    }
}

/// A database or instance to compare against its previous state.
pub(crate) struct LicensedEntry<'a> {
    pub name: &'a str,
    /// `None` when the entry did not exist in the previous snapshot.
    pub previous: Option<&'a [License]>,
    pub current: &'a [License],
}

/// Throws NEW_DATABASE for entries absent from the previous snapshot and
/// NEW_LICENSE / NEW_OPTION for every activated license type known to the
/// catalog.
pub(crate) async fn throw_license_alerts(
    ctx: &CheckContext<'_>,
    technology: Technology,
    hostname: &str,
    entries: &[LicensedEntry<'_>],
    catalog: &LicenseTypeCatalog,
) {
    for entry in entries {
        if entry.previous.is_none() {
            ctx.thrower
                .throw_best_effort(alerts::new_database_alert(technology, hostname, entry.name))
                .await;
        }

        let diffs = diff::diff_licenses(entry.previous.unwrap_or_default(), entry.current);
        for (license_type_id, feature) in &diffs {
            if *feature != DiffFeature::Activated {
                continue;
            }
            let Some(license_type) = catalog.get(license_type_id) else {
                tracing::warn!(
                    hostname = %hostname,
                    dbname = %entry.name,
                    license_type_id = %license_type_id,
                    "License type not found in catalog, skipping alert"
                );
                continue;
            };

            let already_enabled_before = ctx.history.was_enabled(license_type_id);
            let alert = match diff::activation_kind(license_type) {
                ActivationKind::License => alerts::new_license_alert(
                    technology,
                    hostname,
                    entry.name,
                    license_type,
                    already_enabled_before,
                ),
                ActivationKind::Option => alerts::new_option_alert(
                    technology,
                    hostname,
                    entry.name,
                    license_type,
                    already_enabled_before,
                ),
            };
            ctx.thrower.throw_best_effort(alert).await;
        }
    }
}
