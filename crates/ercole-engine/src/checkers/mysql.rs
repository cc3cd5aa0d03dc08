use std::collections::HashMap;

use async_trait::async_trait;
use ercole_common::alert::Technology;
use ercole_common::types::{HostData, LicenseType, MySqlInstance, MYSQL_EDITION_ENTERPRISE};

use super::{
    carry_forward_ignored, catalog_or_empty, throw_license_alerts, CheckContext, LicenseTypeCatalog,
    LicensedEntry, TechnologyChecker,
};

pub struct MySqlChecker;

#[async_trait]
impl TechnologyChecker for MySqlChecker {
    fn technology(&self) -> Technology {
        Technology::OracleMySql
    }

    fn applies_to(&self, hostdata: &HostData) -> bool {
        hostdata.features.mysql.is_some()
    }

    async fn check(
        &self,
        ctx: &CheckContext<'_>,
        previous: Option<&HostData>,
        hostdata: &mut HostData,
    ) -> anyhow::Result<()> {
        let license_types = catalog_or_empty(
            self.technology(),
            ctx.api.get_mysql_database_license_types().await,
        );
        let catalog = LicenseTypeCatalog::new(&license_types);

        let previous_instances: HashMap<&str, &MySqlInstance> = previous
            .map(|p| p.mysql_instances().iter().map(|i| (i.name.as_str(), i)).collect())
            .unwrap_or_default();

        if let Some(feature) = hostdata.features.mysql.as_mut() {
            set_license_types(&mut feature.instances, &license_types);
            for instance in feature.instances.iter_mut() {
                if let Some(prev) = previous_instances.get(instance.name.as_str()) {
                    carry_forward_ignored(
                        std::slice::from_ref(&prev.license),
                        std::slice::from_mut(&mut instance.license),
                    );
                }
            }
        }

        let entries: Vec<LicensedEntry<'_>> = hostdata
            .mysql_instances()
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

/// Enterprise instances take one license of the Enterprise catalog entry;
/// community editions are unlicensed.
pub(crate) fn set_license_types(instances: &mut [MySqlInstance], license_types: &[LicenseType]) {
    let enterprise = license_types
        .iter()
        .find(|lt| lt.edition.eq_ignore_ascii_case(MYSQL_EDITION_ENTERPRISE))
        .or_else(|| license_types.iter().find(|lt| !lt.option));

    for instance in instances.iter_mut() {
        if !instance.edition.eq_ignore_ascii_case(MYSQL_EDITION_ENTERPRISE) {
            instance.license.count = 0.0;
            continue;
        }
        instance.license.count = 1.0;
        if let Some(license_type) = enterprise {
            instance.license.license_type_id = license_type.id.clone();
            instance.license.name = license_type.item_description.clone();
        }
    }
}
