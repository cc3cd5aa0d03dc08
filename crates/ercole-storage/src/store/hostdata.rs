use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ercole_common::types::{HostData, License};
use ercole_engine::ports::HostStore;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use crate::entities::host_license_history::{
    self, Column as HistoryCol, Entity as HistoryEntity,
};
use crate::entities::hostdata::{self, Column as HostCol, Entity as HostEntity};
use crate::error::{Result, StorageError};
use crate::store::HostDataStore;

/// Rebuilds the document from a row. The indexed columns win over the
/// payload, since dismissal only updates the columns.
fn model_to_hostdata(m: hostdata::Model) -> Result<HostData> {
    let mut hostdata: HostData =
        serde_json::from_str(&m.payload).map_err(|source| StorageError::CorruptPayload {
            id: m.id.clone(),
            source,
        })?;
    hostdata.id = m.id;
    hostdata.hostname = m.hostname;
    hostdata.archived = m.archived;
    hostdata.is_dr = m.is_dr;
    hostdata.created_at = m.created_at.with_timezone(&Utc);
    hostdata.dismissed_at = m.dismissed_at.map(|d| d.with_timezone(&Utc));
    Ok(hostdata)
}

fn models_to_hostdata(models: Vec<hostdata::Model>) -> Result<Vec<HostData>> {
    models.into_iter().map(model_to_hostdata).collect()
}

impl HostDataStore {
    async fn current_hosts(&self) -> Result<Vec<HostData>> {
        let rows = HostEntity::find()
            .filter(HostCol::Archived.eq(false))
            .order_by(HostCol::Hostname, Order::Asc)
            .all(self.db())
            .await?;
        models_to_hostdata(rows)
    }

    async fn current_hostnames(&self, include_dr: bool) -> Result<Vec<String>> {
        let mut q = HostEntity::find()
            .select_only()
            .column(HostCol::Hostname)
            .filter(HostCol::Archived.eq(false));
        if !include_dr {
            q = q.filter(HostCol::IsDr.eq(false));
        }
        Ok(q
            .order_by(HostCol::Hostname, Order::Asc)
            .into_tuple::<String>()
            .all(self.db())
            .await?)
    }
}

#[async_trait]
impl HostStore for HostDataStore {
    async fn find_most_recent_host_data_older_than(
        &self,
        hostname: &str,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Option<HostData>> {
        let row = HostEntity::find()
            .filter(HostCol::Hostname.eq(hostname))
            .filter(HostCol::CreatedAt.lt(before.fixed_offset()))
            .order_by(HostCol::CreatedAt, Order::Desc)
            .one(self.db())
            .await?;
        Ok(row.map(model_to_hostdata).transpose()?)
    }

    /// Stores the snapshot and records its enabled license types in the
    /// host's license history, in one transaction.
    async fn insert_host_data(&self, hostdata: &HostData) -> anyhow::Result<()> {
        let payload = serde_json::to_string(hostdata).map_err(StorageError::from)?;
        let am = hostdata::ActiveModel {
            id: Set(hostdata.id.clone()),
            hostname: Set(hostdata.hostname.clone()),
            archived: Set(hostdata.archived),
            is_dr: Set(hostdata.is_dr),
            created_at: Set(hostdata.created_at.fixed_offset()),
            dismissed_at: Set(hostdata.dismissed_at.map(|d| d.fixed_offset())),
            payload: Set(payload),
        };

        let enabled: HashSet<&str> = hostdata
            .all_licenses()
            .filter(|l| l.count > 0.0 && !l.license_type_id.is_empty())
            .map(|l| l.license_type_id.as_str())
            .collect();
        let history: Vec<host_license_history::ActiveModel> = enabled
            .into_iter()
            .map(|id| host_license_history::ActiveModel {
                hostname: Set(hostdata.hostname.clone()),
                license_type_id: Set(id.to_string()),
                first_enabled_at: Set(hostdata.created_at.fixed_offset()),
            })
            .collect();

        let txn = self.db().begin().await.map_err(StorageError::from)?;
        am.insert(&txn).await.map_err(StorageError::from)?;
        if !history.is_empty() {
            HistoryEntity::insert_many(history)
                .on_conflict(
                    OnConflict::columns([HistoryCol::Hostname, HistoryCol::LicenseTypeId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(StorageError::from)?;
        }
        txn.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn dismiss_host(&self, hostname: &str) -> anyhow::Result<()> {
        let res = HostEntity::update_many()
            .col_expr(HostCol::Archived, Expr::value(true))
            .col_expr(HostCol::DismissedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(HostCol::Hostname.eq(hostname))
            .filter(HostCol::Archived.eq(false))
            .exec(self.db())
            .await
            .map_err(StorageError::from)?;
        tracing::debug!(hostname, rows = res.rows_affected, "Dismissed hostdata");
        Ok(())
    }

    async fn get_hostnames(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.current_hostnames(true).await?)
    }

    async fn get_current_hostnames(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.current_hostnames(false).await?)
    }

    async fn exists_dr(&self, hostname: &str) -> anyhow::Result<bool> {
        let count = HostEntity::find()
            .filter(HostCol::Hostname.eq(hostname))
            .filter(HostCol::IsDr.eq(true))
            .filter(HostCol::Archived.eq(false))
            .count(self.db())
            .await
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    async fn get_cluster_veritas_license_by_hostnames(
        &self,
        hostnames: &[String],
    ) -> anyhow::Result<Vec<License>> {
        let wanted: HashSet<&str> = hostnames.iter().map(String::as_str).collect();
        let mut licenses: Vec<License> = Vec::new();
        for host in self.current_hosts().await? {
            let in_cluster = host
                .cluster_membership_status
                .veritas_cluster_hostnames
                .iter()
                .any(|peer| wanted.contains(peer.as_str()));
            if !in_cluster {
                continue;
            }
            for license in host
                .oracle_databases()
                .iter()
                .flat_map(|db| db.licenses.iter())
            {
                if !license.license_type_id.is_empty() && !licenses.contains(license) {
                    licenses.push(license.clone());
                }
            }
        }
        Ok(licenses)
    }

    async fn find_enabled_license_type_ids(
        &self,
        hostname: &str,
    ) -> anyhow::Result<HashSet<String>> {
        let ids = HistoryEntity::find()
            .select_only()
            .column(HistoryCol::LicenseTypeId)
            .filter(HistoryCol::Hostname.eq(hostname))
            .into_tuple::<String>()
            .all(self.db())
            .await
            .map_err(StorageError::from)?;
        Ok(ids.into_iter().collect())
    }

    async fn find_old_current_hosts(&self, before: DateTime<Utc>) -> anyhow::Result<Vec<HostData>> {
        let rows = HostEntity::find()
            .filter(HostCol::Archived.eq(false))
            .filter(HostCol::IsDr.eq(false))
            .filter(HostCol::CreatedAt.lt(before.fixed_offset()))
            .order_by(HostCol::Hostname, Order::Asc)
            .all(self.db())
            .await
            .map_err(StorageError::from)?;
        Ok(models_to_hostdata(rows)?)
    }

    async fn delete_archived_host_data_older_than(
        &self,
        before: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let res = HostEntity::delete_many()
            .filter(HostCol::Archived.eq(true))
            .filter(HostCol::CreatedAt.lt(before.fixed_offset()))
            .exec(self.db())
            .await
            .map_err(StorageError::from)?;
        Ok(res.rows_affected)
    }
}
