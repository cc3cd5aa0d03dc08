//! Alert construction and delivery.
//!
//! The `*_alert` functions only build values; [`AlertThrower`] stamps the
//! id and date and hands them to the sink.

use std::sync::Arc;

use ercole_common::alert::{
    Alert, AlertCategory, AlertDetails, AlertSeverity, AlertStatus, Technology,
};
use ercole_common::id;
use ercole_common::types::{AgentError, LicenseType};

use crate::ports::AlertSink;
use crate::Clock;

const ALREADY_ENABLED_SUFFIX: &str = " (already enabled before in this host)";

fn alert(
    category: AlertCategory,
    affected_technology: Option<Technology>,
    severity: AlertSeverity,
    description: String,
    details: AlertDetails,
) -> Alert {
    Alert {
        id: String::new(),
        category,
        affected_technology,
        severity,
        status: AlertStatus::New,
        description,
        date: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        details,
    }
}

/// Critical on first activation, Info when the license type was enabled
/// on this host before.
fn activation_severity(already_enabled_before: bool) -> AlertSeverity {
    if already_enabled_before {
        AlertSeverity::Info
    } else {
        AlertSeverity::Critical
    }
}

pub fn new_server_alert(hostname: &str) -> Alert {
    alert(
        AlertCategory::Engine,
        None,
        AlertSeverity::Info,
        format!("The host {hostname} was added to ercole"),
        AlertDetails::NewServer {
            hostname: hostname.to_string(),
        },
    )
}

pub fn new_database_alert(technology: Technology, hostname: &str, dbname: &str) -> Alert {
    alert(
        AlertCategory::License,
        Some(technology),
        AlertSeverity::Info,
        format!("The database {dbname} was created on the host {hostname}"),
        AlertDetails::NewDatabase {
            hostname: hostname.to_string(),
            dbname: dbname.to_string(),
        },
    )
}

pub fn new_license_alert(
    technology: Technology,
    hostname: &str,
    dbname: &str,
    license_type: &LicenseType,
    already_enabled_before: bool,
) -> Alert {
    let mut description = format!(
        "The database {dbname} on {hostname} has enabled new license: {}",
        license_type.item_description
    );
    if already_enabled_before {
        description.push_str(ALREADY_ENABLED_SUFFIX);
    }
    alert(
        AlertCategory::License,
        Some(technology),
        activation_severity(already_enabled_before),
        description,
        AlertDetails::NewLicense {
            hostname: hostname.to_string(),
            dbname: dbname.to_string(),
            license_type_id: license_type.id.clone(),
        },
    )
}

pub fn new_option_alert(
    technology: Technology,
    hostname: &str,
    dbname: &str,
    license_type: &LicenseType,
    already_enabled_before: bool,
) -> Alert {
    let mut description = format!(
        "Database {dbname} has enabled new option: {}",
        license_type.item_description
    );
    if already_enabled_before {
        description.push_str(ALREADY_ENABLED_SUFFIX);
    }
    alert(
        AlertCategory::License,
        Some(technology),
        activation_severity(already_enabled_before),
        description,
        AlertDetails::NewOption {
            hostname: hostname.to_string(),
            dbname: dbname.to_string(),
            license_type_id: license_type.id.clone(),
        },
    )
}

pub fn unlisted_running_database_alert(hostname: &str, dbname: &str) -> Alert {
    alert(
        AlertCategory::Engine,
        Some(Technology::OracleDatabase),
        AlertSeverity::Warning,
        format!("Some databases on the host {hostname} aren't listed in the oratab: {dbname}"),
        AlertDetails::UnlistedRunningDatabase {
            hostname: hostname.to_string(),
            dbname: dbname.to_string(),
        },
    )
}

pub fn increased_cpu_cores_alert(hostname: &str, previous: u32, new: u32) -> Alert {
    alert(
        AlertCategory::License,
        None,
        AlertSeverity::Critical,
        format!("The host {hostname} has now more CPU cores: from {previous} to {new}"),
        AlertDetails::IncreasedCpuCores {
            hostname: hostname.to_string(),
            previous_cpu_cores: previous,
            new_cpu_cores: new,
        },
    )
}

pub fn missing_primary_database_alert(hostname: &str, secondary_dbname: &str) -> Alert {
    alert(
        AlertCategory::Engine,
        None,
        AlertSeverity::Warning,
        format!("Missing primary database on standby database: {secondary_dbname}"),
        AlertDetails::MissingPrimaryDatabase {
            hostname: hostname.to_string(),
            dbname: secondary_dbname.to_string(),
        },
    )
}

/// `db_names` is sorted before it is rendered and stored.
pub fn missing_databases_alert(
    hostname: &str,
    mut db_names: Vec<String>,
    severity: AlertSeverity,
) -> Alert {
    db_names.sort();
    alert(
        AlertCategory::License,
        Some(Technology::OracleDatabase),
        severity,
        format!(
            "The databases {:?} on {hostname:?} are missing compared to the previous hostdata",
            db_names.join(", ")
        ),
        AlertDetails::MissingDatabase {
            hostname: hostname.to_string(),
            db_names,
        },
    )
}

pub fn agent_error_alert(hostname: &str, errors: Vec<AgentError>) -> Alert {
    let prefix = if errors.len() > 1 { "- " } else { "" };
    let description: String = errors
        .iter()
        .map(|e| format!("{prefix}{}\n", e.message))
        .collect();
    alert(
        AlertCategory::Engine,
        None,
        AlertSeverity::Critical,
        description,
        AlertDetails::AgentError {
            hostname: hostname.to_string(),
            errors,
        },
    )
}

pub fn no_data_alert(hostname: &str, days: i64) -> Alert {
    alert(
        AlertCategory::Agent,
        None,
        AlertSeverity::Critical,
        format!("No data received from the host {hostname} in the last {days} day(s)"),
        AlertDetails::NoData {
            hostname: hostname.to_string(),
        },
    )
}

/// Stamps alerts and forwards them to the [`AlertSink`].
#[derive(Clone)]
pub struct AlertThrower {
    sink: Arc<dyn AlertSink>,
    clock: Clock,
}

impl AlertThrower {
    pub fn new(sink: Arc<dyn AlertSink>, clock: Clock) -> Self {
        Self { sink, clock }
    }

    pub fn sink(&self) -> &Arc<dyn AlertSink> {
        &self.sink
    }

    /// Delivers the alert, returning the sink error to the caller.
    pub async fn throw(&self, mut alert: Alert) -> anyhow::Result<()> {
        alert.id = id::next_id();
        alert.date = (self.clock)();
        self.sink.throw_new_alert(alert).await
    }

    /// Delivers the alert, logging instead of returning a failure.
    pub async fn throw_best_effort(&self, alert: Alert) {
        let code = alert.code();
        let hostname = alert.details.hostname().to_string();
        if let Err(e) = self.throw(alert).await {
            tracing::error!(
                error = %e,
                code = ?code,
                hostname = %hostname,
                "Failed to throw alert"
            );
        }
    }
}
