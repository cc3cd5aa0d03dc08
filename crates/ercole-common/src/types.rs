use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version stamped on every persisted snapshot.
pub const SERVER_SCHEMA_VERSION: u32 = 1;

pub const ORACLE_DATABASE_ROLE_PRIMARY: &str = "PRIMARY";
pub const ORACLE_DATABASE_STATUS_OPEN: &str = "OPEN";
pub const ORACLE_DATABASE_STATUS_MOUNTED: &str = "MOUNTED";

pub const HARDWARE_ABSTRACTION_PHYSICAL: &str = "PH";
pub const HARDWARE_ABSTRACTION_VIRTUAL: &str = "VIRT";

pub const CLOUD_MEMBERSHIP_AWS: &str = "aws";

pub const SQLSERVER_EDITION_ENTERPRISE: &str = "ENT";
pub const SQLSERVER_EDITION_STANDARD: &str = "STD";

pub const MYSQL_EDITION_ENTERPRISE: &str = "ENTERPRISE";

/// One inventory observation of a host, as sent by the agent and stored by
/// the data-service.
///
/// Fields the core does not interpret are kept in `extra` so that a
/// snapshot survives a decode/encode cycle without losing agent data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub server_schema_version: u32,
    pub hostname: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub agent_version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub info: HostInfo,
    #[serde(default)]
    pub cluster_membership_status: ClusterMembershipStatus,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub clusters: Vec<ClusterInfo>,
    #[serde(default)]
    pub cloud: Cloud,
    #[serde(default)]
    pub errors: Vec<AgentError>,
    #[serde(default, rename = "isDR")]
    pub is_dr: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl HostData {
    /// Multiplier applied to physical cores when licensing Enterprise
    /// editions: AWS instances count one license per vCPU core.
    pub fn core_factor(&self) -> f64 {
        if self.cloud.membership == CLOUD_MEMBERSHIP_AWS {
            1.0
        } else {
            0.5
        }
    }

    pub fn oracle_databases(&self) -> &[OracleDatabase] {
        self.features
            .oracle
            .as_ref()
            .and_then(|o| o.database.as_ref())
            .map(|d| d.databases.as_slice())
            .unwrap_or_default()
    }

    pub fn oracle_databases_mut(&mut self) -> Option<&mut Vec<OracleDatabase>> {
        self.features
            .oracle
            .as_mut()
            .and_then(|o| o.database.as_mut())
            .map(|d| &mut d.databases)
    }

    pub fn sqlserver_instances(&self) -> &[SqlServerInstance] {
        self.features
            .microsoft
            .as_ref()
            .and_then(|m| m.sql_server.as_ref())
            .map(|s| s.instances.as_slice())
            .unwrap_or_default()
    }

    pub fn mysql_instances(&self) -> &[MySqlInstance] {
        self.features
            .mysql
            .as_ref()
            .map(|m| m.instances.as_slice())
            .unwrap_or_default()
    }

    /// Every license reported on this snapshot, across technologies.
    pub fn all_licenses(&self) -> impl Iterator<Item = &License> {
        self.oracle_databases()
            .iter()
            .flat_map(|db| db.licenses.iter())
            .chain(self.sqlserver_instances().iter().map(|i| &i.license))
            .chain(self.mysql_instances().iter().map(|i| &i.license))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostInfo {
    pub hostname: String,
    #[serde(rename = "cpuModel")]
    pub cpu_model: String,
    #[serde(rename = "cpuSockets")]
    pub cpu_sockets: u32,
    #[serde(rename = "cpuCores")]
    pub cpu_cores: u32,
    #[serde(rename = "cpuThreads")]
    pub cpu_threads: u32,
    /// `PH` or `VIRT`.
    pub hardware_abstraction: String,
    /// `PH`, `VMWARE`, `OVM`, `VMOTHER`, ...
    pub hardware_abstraction_technology: String,
    pub os: String,
    pub kernel: String,
    pub memory_total: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HostInfo {
    pub fn is_physical(&self) -> bool {
        self.hardware_abstraction_technology == HARDWARE_ABSTRACTION_PHYSICAL
    }

    pub fn is_virtual(&self) -> bool {
        matches!(
            self.hardware_abstraction_technology.as_str(),
            "VMWARE" | "OVM" | "VMOTHER" | "HPVRT" | "LPAR" | "KVM" | "XEN"
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterMembershipStatus {
    pub oracle_clusterware: bool,
    pub sun_cluster: bool,
    #[serde(rename = "hacmp")]
    pub hacmp: bool,
    pub veritas_cluster_server: bool,
    pub veritas_cluster_hostnames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterInfo {
    pub fetch_endpoint: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "cpu")]
    pub cpu: u32,
    pub sockets: u32,
    #[serde(rename = "vms")]
    pub vms: Vec<VmInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VmInfo {
    pub name: String,
    pub hostname: String,
    #[serde(rename = "cappedCPU")]
    pub capped_cpu: bool,
    pub virtualization_node: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cloud {
    pub membership: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentError {
    pub message: String,
    pub class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microsoft: Option<MicrosoftFeature>,
    #[serde(rename = "mysql", skip_serializing_if = "Option::is_none")]
    pub mysql: Option<MySqlFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OracleFeature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<OracleDatabaseFeature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OracleDatabaseFeature {
    pub databases: Vec<OracleDatabase>,
    /// Instances found running on the host but absent from oratab.
    pub unlisted_running_databases: Vec<String>,
}

/// Oracle database edition, derived from the banner in `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleEdition {
    Enterprise,
    Extreme,
    Standard,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OracleDatabase {
    pub instance_number: i64,
    pub instance_name: String,
    pub name: String,
    pub unique_name: String,
    pub status: String,
    #[serde(rename = "dbID")]
    pub db_id: u64,
    pub role: String,
    #[serde(rename = "isCDB")]
    pub is_cdb: bool,
    #[serde(rename = "isRAC")]
    pub is_rac: bool,
    pub version: String,
    pub platform: String,
    pub licenses: Vec<License>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OracleDatabase {
    /// Edition named in the version banner. A banner naming neither
    /// Enterprise nor Extreme is Standard.
    pub fn edition(&self) -> OracleEdition {
        let version = self.version.to_uppercase();
        if version.contains("ENTERPRISE") {
            OracleEdition::Enterprise
        } else if version.contains("EXTREME") {
            OracleEdition::Extreme
        } else {
            OracleEdition::Standard
        }
    }

    pub fn is_primary_open(&self) -> bool {
        self.role == ORACLE_DATABASE_ROLE_PRIMARY && self.status == ORACLE_DATABASE_STATUS_OPEN
    }

    /// Mounted standby or snapshot-standby database.
    pub fn is_mounted_secondary(&self) -> bool {
        self.status == ORACLE_DATABASE_STATUS_MOUNTED && self.role != ORACLE_DATABASE_ROLE_PRIMARY
    }

    /// Per-core license multiplier for this database on the given host.
    ///
    /// Returns `None` when the hardware abstraction is unknown. For Standard Edition on physical
    /// hardware the factor is chosen so that `cores * factor == sockets`.
    pub fn core_factor(&self, host: &HostInfo, host_core_factor: f64) -> Option<f64> {
        let edition = self.edition();
        if host.is_virtual() {
            return Some(match edition {
                OracleEdition::Enterprise | OracleEdition::Extreme => host_core_factor,
                OracleEdition::Standard => 0.0,
            });
        }
        if host.is_physical() {
            return Some(match edition {
                OracleEdition::Enterprise | OracleEdition::Extreme => host_core_factor,
                OracleEdition::Standard if host.cpu_cores == 0 => 0.0,
                OracleEdition::Standard => f64::from(host.cpu_sockets) / f64::from(host.cpu_cores),
            });
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicrosoftFeature {
    #[serde(rename = "sqlServer", skip_serializing_if = "Option::is_none")]
    pub sql_server: Option<SqlServerFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlServerFeature {
    pub instances: Vec<SqlServerInstance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlServerInstance {
    pub status: String,
    pub name: String,
    #[serde(rename = "databaseID")]
    pub database_id: i64,
    /// `15.0.2000.5` as reported, rewritten to `2019` during checks.
    pub version: String,
    pub edition: String,
    pub license: License,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MySqlFeature {
    pub instances: Vec<MySqlInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MySqlInstance {
    pub name: String,
    #[serde(rename = "uuid")]
    pub uuid: String,
    pub version: String,
    pub edition: String,
    pub license: License,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A license held by a database or instance. `license_type_id` is the
/// stable key used to compare snapshots, never the position in the list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct License {
    #[serde(rename = "licenseTypeID")]
    pub license_type_id: String,
    pub name: String,
    pub count: f64,
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_comment: Option<String>,
}

/// Catalog entry describing a licensable product, owned by the api-service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseType {
    #[serde(rename = "id")]
    pub id: String,
    pub item_description: String,
    pub metric: String,
    pub aliases: Vec<String>,
    /// `true` for add-on options, `false` for base licenses.
    pub option: bool,
    /// SQL Server and MySQL catalog entries are scoped by edition.
    pub edition: String,
    pub version: String,
}
