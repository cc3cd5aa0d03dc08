//! Hostdata diffing and alert-generation engine.
//!
//! [`service::HostDataService`] ingests one inventory snapshot at a time,
//! compares it against the previous snapshot of the same host and throws
//! domain alerts through the [`ports::AlertSink`]. Per-technology logic
//! lives behind the [`checkers::TechnologyChecker`] trait so that a
//! failure in one technology never blocks the others.

pub mod alerts;
pub mod checkers;
pub mod cluster;
pub mod diff;
pub mod dr;
pub mod error;
pub mod jobs;
pub mod missing;
pub mod ports;
pub mod secondary;
pub mod service;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use error::{EngineError, IngestError};
pub use service::HostDataService;

/// Source of the current time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Settings the engine reads while checking a snapshot.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Stamped on every persisted snapshot.
    pub server_version: String,
    /// Log the full JSON of every snapshot before it is persisted.
    pub log_inserting_hostdata: bool,
    /// Metric priority used to order the Oracle license-type catalog.
    pub license_type_metrics_default: Vec<String>,
    /// Per-environment override of `license_type_metrics_default`.
    pub license_type_metrics_by_environment: HashMap<String, Vec<String>>,
}

impl EngineConfig {
    pub fn license_type_metrics(&self, environment: &str) -> &[String] {
        self.license_type_metrics_by_environment
            .get(environment)
            .unwrap_or(&self.license_type_metrics_default)
    }
}

/// License types that were enabled (count > 0) on a host in any stored
/// snapshot. Decides whether an activation is a first-time one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseHistory {
    enabled: HashSet<String>,
}

impl LicenseHistory {
    pub fn new(enabled: impl IntoIterator<Item = String>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
        }
    }

    /// History derived from a single snapshot, used when the full history
    /// cannot be read.
    pub fn from_snapshot(hostdata: &ercole_common::types::HostData) -> Self {
        Self::new(
            hostdata
                .all_licenses()
                .filter(|l| l.count > 0.0 && !l.license_type_id.is_empty())
                .map(|l| l.license_type_id.clone()),
        )
    }

    pub fn was_enabled(&self, license_type_id: &str) -> bool {
        self.enabled.contains(license_type_id)
    }
}
