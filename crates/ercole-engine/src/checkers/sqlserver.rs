use std::collections::HashMap;

use async_trait::async_trait;
use ercole_common::alert::Technology;
use ercole_common::types::{
    HostData, HostInfo, LicenseType, SqlServerInstance, HARDWARE_ABSTRACTION_PHYSICAL,
    HARDWARE_ABSTRACTION_VIRTUAL, SQLSERVER_EDITION_ENTERPRISE, SQLSERVER_EDITION_STANDARD,
};

use super::{
    carry_forward_ignored, catalog_or_empty, throw_license_alerts, CheckContext, LicenseTypeCatalog,
    LicensedEntry, TechnologyChecker,
};

/// Marketing names of SQL Server releases, keyed by `major.minor`.
const VERSION_NAMES: [(&str, &str); 12] = [
    ("15.0", "2019"),
    ("14.0", "2017"),
    ("13.0", "2016"),
    ("12.0", "2014"),
    ("11.0", "2012"),
    ("10.50", "2008 R2"),
    ("10.0", "2008"),
    ("9.0", "2005"),
    ("8.0", "2000"),
    ("7.0", "7.0"),
    ("6.50", "6.5"),
    ("6.00", "6.0"),
];

pub struct SqlServerChecker;

#[async_trait]
impl TechnologyChecker for SqlServerChecker {
    fn technology(&self) -> Technology {
        Technology::MicrosoftSqlServer
    }

    fn applies_to(&self, hostdata: &HostData) -> bool {
        hostdata
            .features
            .microsoft
            .as_ref()
            .is_some_and(|m| m.sql_server.is_some())
    }

    async fn check(
        &self,
        ctx: &CheckContext<'_>,
        previous: Option<&HostData>,
        hostdata: &mut HostData,
    ) -> anyhow::Result<()> {
        let license_types = catalog_or_empty(
            self.technology(),
            ctx.api.get_sqlserver_database_license_types().await,
        );
        let catalog = LicenseTypeCatalog::new(&license_types);

        let previous_instances: HashMap<&str, &SqlServerInstance> = previous
            .map(|p| p.sqlserver_instances().iter().map(|i| (i.name.as_str(), i)).collect())
            .unwrap_or_default();

        let info = hostdata.info.clone();
        if let Some(instances) = hostdata
            .features
            .microsoft
            .as_mut()
            .and_then(|m| m.sql_server.as_mut())
            .map(|s| &mut s.instances)
        {
            for instance in instances.iter_mut() {
                if let Some(name) = marketing_version(&instance.version) {
                    instance.version = name.to_string();
                }
            }
            set_license_types(instances, &info, &license_types);
            promote_standard_to_enterprise(instances);
            for instance in instances.iter_mut() {
                if let Some(prev) = previous_instances.get(instance.name.as_str()) {
                    carry_forward_ignored(
                        std::slice::from_ref(&prev.license),
                        std::slice::from_mut(&mut instance.license),
                    );
                }
            }
        }

        let entries: Vec<LicensedEntry<'_>> = hostdata
            .sqlserver_instances()
            .iter()
            .map(|i| LicensedEntry {
                name: &i.name,
                previous: previous_instances
                    .get(i.name.as_str())
                    .map(|p| std::slice::from_ref(&p.license)),
                current: std::slice::from_ref(&i.license),
            })
            .collect();
        throw_license_alerts(ctx, self.technology(), &hostdata.hostname, &entries, &catalog).await;
        Ok(())
    }
}

/// `15.0.2000.5` becomes `2019`. Unknown releases yield `None`.
pub(crate) fn marketing_version(version: &str) -> Option<&'static str> {
    let mut parts = version.split('.');
    let major_rel = match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => return None,
    };
    VERSION_NAMES
        .iter()
        .find(|(key, _)| *key == major_rel)
        .map(|(_, name)| *name)
}

/// Licensed cores for the host: four per socket at minimum on physical
/// hardware, four at minimum on virtual machines.
pub(crate) fn license_count(info: &HostInfo) -> Option<u32> {
    match info.hardware_abstraction.as_str() {
        HARDWARE_ABSTRACTION_PHYSICAL => {
            if info.cpu_sockets > 0 && info.cpu_cores / info.cpu_sockets < 4 {
                Some(info.cpu_sockets * 4)
            } else {
                Some(info.cpu_cores)
            }
        }
        HARDWARE_ABSTRACTION_VIRTUAL => Some(info.cpu_threads.max(4)),
        _ => None,
    }
}

fn is_licensed_edition(edition: &str) -> bool {
    edition == SQLSERVER_EDITION_ENTERPRISE || edition == SQLSERVER_EDITION_STANDARD
}

fn set_license_types(instances: &mut [SqlServerInstance], info: &HostInfo, license_types: &[LicenseType]) {
    let count = license_count(info);
    for instance in instances.iter_mut() {
        if let Some(license_type) = license_types.iter().find(|lt| {
            lt.edition.eq_ignore_ascii_case(&instance.edition) && lt.version == instance.version
        }) {
            instance.license.license_type_id = license_type.id.clone();
            instance.license.name = license_type.item_description.clone();
        }

        if !is_licensed_edition(&instance.edition) {
            instance.license.count = 0.0;
        } else if let Some(count) = count {
            instance.license.count = f64::from(count);
        }
    }
}

/// When any instance on the host runs Enterprise, Standard instances are
/// promoted to Enterprise, taking the highest Enterprise license type.
pub(crate) fn promote_standard_to_enterprise(instances: &mut [SqlServerInstance]) {
    let Some((license_type_id, name)) = instances
        .iter()
        .filter(|i| i.edition == SQLSERVER_EDITION_ENTERPRISE && !i.license.license_type_id.is_empty())
        .map(|i| (i.license.license_type_id.clone(), i.license.name.clone()))
        .max_by(|a, b| a.0.cmp(&b.0))
    else {
        return;
    };

    for instance in instances
        .iter_mut()
        .filter(|i| i.edition == SQLSERVER_EDITION_STANDARD)
    {
        instance.edition = SQLSERVER_EDITION_ENTERPRISE.to_string();
        instance.license.license_type_id = license_type_id.clone();
        instance.license.name = name.clone();
    }
}
