//! HTTP clients for the services the data-service talks to.
//!
//! [`AlertServiceClient`] is the engine's [`AlertSink`](ercole_engine::ports::AlertSink)
//! and [`ApiServiceClient`] its [`ApiClient`](ercole_engine::ports::ApiClient).
//! Both authenticate with HTTP basic auth and never retry: a failed call is
//! reported to the caller, which decides whether it is fatal.

pub mod alert_service;
pub mod api_service;
pub mod error;


use serde::Deserialize;

pub use alert_service::AlertServiceClient;
pub use api_service::ApiServiceClient;

use crate::error::{ClientError, Result};

/// Location and credentials of a remote Ercole service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteService {
    #[serde(default)]
    pub remote_endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl RemoteService {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.remote_endpoint.trim_end_matches('/'), path)
    }
}

/// Turns a non-2xx response into [`ClientError::Api`].
pub(crate) async fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("[Failed to read response body: {e}]"));
    Err(ClientError::Api {
        service,
        status: status.as_u16(),
        body,
    })
}
