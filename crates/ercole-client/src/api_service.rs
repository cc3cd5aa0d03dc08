use async_trait::async_trait;
use ercole_common::alert::{Alert, AlertsFilter};
use ercole_common::types::{LicenseType, OracleDatabase};
use ercole_engine::ports::ApiClient;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::{check_status, RemoteService};

const SERVICE: &str = "api-service";

pub const ORACLE_LICENSE_TYPES_PATH: &str = "/settings/oracle/database/license-types";
pub const SQLSERVER_LICENSE_TYPES_PATH: &str = "/settings/microsoft/sqlserver/license-types";
pub const MYSQL_LICENSE_TYPES_PATH: &str = "/settings/mysql/database/license-types";
pub const ORACLE_DATABASES_PATH: &str = "/hosts/technologies/oracle/databases";

pub struct ApiServiceClient {
    config: RemoteService,
    client: reqwest::Client,
}

impl ApiServiceClient {
    pub fn new(config: RemoteService) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(self.config.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(query)
            .send()
            .await?;
        Ok(check_status(SERVICE, resp).await?.json().await?)
    }

    async fn post_filter(&self, path: &str, filter: &AlertsFilter) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.config.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(filter)
            .send()
            .await?;
        check_status(SERVICE, resp).await
    }
}

#[async_trait]
impl ApiClient for ApiServiceClient {
    async fn get_oracle_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.get_json(ORACLE_LICENSE_TYPES_PATH, &[]).await?)
    }

    async fn get_sqlserver_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.get_json(SQLSERVER_LICENSE_TYPES_PATH, &[]).await?)
    }

    async fn get_mysql_database_license_types(&self) -> anyhow::Result<Vec<LicenseType>> {
        Ok(self.get_json(MYSQL_LICENSE_TYPES_PATH, &[]).await?)
    }

    async fn get_oracle_databases(&self) -> anyhow::Result<Vec<OracleDatabase>> {
        Ok(self
            .get_json(ORACLE_DATABASES_PATH, &[("full", "true")])
            .await?)
    }

    async fn get_alerts_by_filter(&self, filter: &AlertsFilter) -> anyhow::Result<Vec<Alert>> {
        let resp = self.post_filter("/alerts/search", filter).await?;
        Ok(resp.json().await?)
    }

    async fn ack_alerts(&self, filter: &AlertsFilter) -> anyhow::Result<()> {
        self.post_filter("/alerts/ack", filter).await?;
        Ok(())
    }
}
