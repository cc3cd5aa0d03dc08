use async_trait::async_trait;
use ercole_common::alert::Alert;
use ercole_engine::ports::AlertSink;

use crate::error::Result;
use crate::{check_status, RemoteService};

const SERVICE: &str = "alert-service";

pub struct AlertServiceClient {
    config: RemoteService,
    client: reqwest::Client,
}

impl AlertServiceClient {
    pub fn new(config: RemoteService) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn post_alert(&self, alert: &Alert) -> Result<()> {
        let resp = self
            .client
            .post(self.config.url("/alerts"))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(alert)
            .send()
            .await?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    async fn delete_no_data(&self, hostname: Option<&str>) -> Result<()> {
        let mut req = self
            .client
            .delete(self.config.url("/alerts/no-data"))
            .basic_auth(&self.config.username, Some(&self.config.password));
        if let Some(hostname) = hostname {
            req = req.query(&[("hostname", hostname)]);
        }
        check_status(SERVICE, req.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl AlertSink for AlertServiceClient {
    async fn throw_new_alert(&self, alert: Alert) -> anyhow::Result<()> {
        tracing::debug!(code = ?alert.code(), description = %alert.description, "Sending alert");
        Ok(self.post_alert(&alert).await?)
    }

    async fn delete_no_data_alerts(&self, hostname: Option<&str>) -> anyhow::Result<()> {
        Ok(self.delete_no_data(hostname).await?)
    }
}
