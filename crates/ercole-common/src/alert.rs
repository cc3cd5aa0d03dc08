use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::AgentError;

/// Alert severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use ercole_common::alert::AlertSeverity;
///
/// let sev: AlertSeverity = "WARNING".parse().unwrap();
/// assert_eq!(sev, AlertSeverity::Warning);
/// assert_eq!(sev.to_string(), "WARNING");
/// assert!(AlertSeverity::Critical > AlertSeverity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Notice,
    Warning,
    Major,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Notice => "NOTICE",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Major => "MAJOR",
            AlertSeverity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(AlertSeverity::Info),
            "NOTICE" => Ok(AlertSeverity::Notice),
            "WARNING" => Ok(AlertSeverity::Warning),
            "MAJOR" => Ok(AlertSeverity::Major),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertCategory {
    Engine,
    License,
    Agent,
}

/// Only the alert-service moves an alert from `New` to `Ack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    New,
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technology {
    #[serde(rename = "Oracle/Database")]
    OracleDatabase,
    #[serde(rename = "Microsoft/SQLServer")]
    MicrosoftSqlServer,
    #[serde(rename = "Oracle/MySQL")]
    OracleMySql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCode {
    NewServer,
    NewDatabase,
    NewLicense,
    NewOption,
    NoData,
    IncreasedCpuCores,
    MissingPrimaryDatabase,
    MissingDatabase,
    AgentError,
    MissingHostInCmdb,
    MissingHostInErcole,
    UnlistedRunningDatabase,
}

/// Code-specific payload of an alert, serialized as `alertCode` plus the
/// `otherInfo` object expected by the alert-service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "alertCode",
    content = "otherInfo",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum AlertDetails {
    NewServer {
        hostname: String,
    },
    NewDatabase {
        hostname: String,
        dbname: String,
    },
    NewLicense {
        hostname: String,
        dbname: String,
        #[serde(rename = "licenseTypeID")]
        license_type_id: String,
    },
    NewOption {
        hostname: String,
        dbname: String,
        #[serde(rename = "licenseTypeID")]
        license_type_id: String,
    },
    NoData {
        hostname: String,
    },
    IncreasedCpuCores {
        hostname: String,
        #[serde(rename = "previousCpuCores")]
        previous_cpu_cores: u32,
        #[serde(rename = "newCpuCores")]
        new_cpu_cores: u32,
    },
    MissingPrimaryDatabase {
        hostname: String,
        dbname: String,
    },
    MissingDatabase {
        hostname: String,
        #[serde(rename = "dbNames")]
        db_names: Vec<String>,
    },
    AgentError {
        hostname: String,
        errors: Vec<AgentError>,
    },
    MissingHostInCmdb {
        hostname: String,
    },
    MissingHostInErcole {
        hostname: String,
    },
    UnlistedRunningDatabase {
        hostname: String,
        dbname: String,
    },
}

impl AlertDetails {
    pub fn code(&self) -> AlertCode {
        match self {
            AlertDetails::NewServer { .. } => AlertCode::NewServer,
            AlertDetails::NewDatabase { .. } => AlertCode::NewDatabase,
            AlertDetails::NewLicense { .. } => AlertCode::NewLicense,
            AlertDetails::NewOption { .. } => AlertCode::NewOption,
            AlertDetails::NoData { .. } => AlertCode::NoData,
            AlertDetails::IncreasedCpuCores { .. } => AlertCode::IncreasedCpuCores,
            AlertDetails::MissingPrimaryDatabase { .. } => AlertCode::MissingPrimaryDatabase,
            AlertDetails::MissingDatabase { .. } => AlertCode::MissingDatabase,
            AlertDetails::AgentError { .. } => AlertCode::AgentError,
            AlertDetails::MissingHostInCmdb { .. } => AlertCode::MissingHostInCmdb,
            AlertDetails::MissingHostInErcole { .. } => AlertCode::MissingHostInErcole,
            AlertDetails::UnlistedRunningDatabase { .. } => AlertCode::UnlistedRunningDatabase,
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            AlertDetails::NewServer { hostname }
            | AlertDetails::NewDatabase { hostname, .. }
            | AlertDetails::NewLicense { hostname, .. }
            | AlertDetails::NewOption { hostname, .. }
            | AlertDetails::NoData { hostname }
            | AlertDetails::IncreasedCpuCores { hostname, .. }
            | AlertDetails::MissingPrimaryDatabase { hostname, .. }
            | AlertDetails::MissingDatabase { hostname, .. }
            | AlertDetails::AgentError { hostname, .. }
            | AlertDetails::MissingHostInCmdb { hostname }
            | AlertDetails::MissingHostInErcole { hostname }
            | AlertDetails::UnlistedRunningDatabase { hostname, .. } => hostname,
        }
    }
}

/// An alert as handed to the alert sink. Immutable once thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "alertCategory")]
    pub category: AlertCategory,
    #[serde(rename = "alertAffectedTechnology")]
    pub affected_technology: Option<Technology>,
    #[serde(rename = "alertSeverity")]
    pub severity: AlertSeverity,
    #[serde(rename = "alertStatus")]
    pub status: AlertStatus,
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub details: AlertDetails,
}

impl Alert {
    pub fn code(&self) -> AlertCode {
        self.details.code()
    }
}

/// Selects existing alerts for search or acknowledgement on the
/// alert-service. Unset fields do not constrain the match; `other_info`
/// is a subset match on the alert's `otherInfo` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsFilter {
    #[serde(default, rename = "ids", skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(rename = "alertCategory", skip_serializing_if = "Option::is_none")]
    pub category: Option<AlertCategory>,
    #[serde(rename = "alertAffectedTechnology", skip_serializing_if = "Option::is_none")]
    pub affected_technology: Option<Technology>,
    #[serde(rename = "alertCode", skip_serializing_if = "Option::is_none")]
    pub code: Option<AlertCode>,
    #[serde(rename = "alertSeverity", skip_serializing_if = "Option::is_none")]
    pub severity: Option<AlertSeverity>,
    #[serde(rename = "alertStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub other_info: Map<String, Value>,
}

impl AlertsFilter {
    pub fn by_ids(ids: Vec<String>) -> Self {
        Self {
            ids,
            ..Default::default()
        }
    }

    pub fn with_other_info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.other_info.insert(key.to_string(), value.into());
        self
    }

    /// Whether `alert` satisfies every constraint of this filter.
    pub fn matches(&self, alert: &Alert) -> bool {
        if !self.ids.is_empty() && !self.ids.contains(&alert.id) {
            return false;
        }
        if self.category.is_some_and(|c| c != alert.category) {
            return false;
        }
        if self.affected_technology.is_some() && self.affected_technology != alert.affected_technology {
            return false;
        }
        if self.code.is_some_and(|c| c != alert.code()) {
            return false;
        }
        if self.severity.is_some_and(|s| s != alert.severity) {
            return false;
        }
        if self.status.is_some_and(|s| s != alert.status) {
            return false;
        }
        if self.other_info.is_empty() {
            return true;
        }
        let Ok(Value::Object(encoded)) = serde_json::to_value(&alert.details) else {
            return false;
        };
        let Some(Value::Object(info)) = encoded.get("otherInfo") else {
            return false;
        };
        self.other_info
            .iter()
            .all(|(key, expected)| info.get(key) == Some(expected))
    }
}
