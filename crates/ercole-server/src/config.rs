use std::collections::HashMap;

use ercole_client::RemoteService;
use ercole_engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,
    /// Snowflake node discriminator; must differ between replicas.
    #[serde(default = "default_node_id")]
    pub node_id: i32,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alert_service: RemoteService,
    #[serde(default)]
    pub api_service: RemoteService,
    #[serde(default)]
    pub data_service: DataServiceConfig,
    #[serde(default)]
    pub freshness_check: FreshnessCheckConfig,
    #[serde(default)]
    pub archived_host_cleaning: ArchivedHostCleaningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL. Defaults to `ercole.db` inside `data_dir`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}/ercole.db?mode=rwc", self.data_dir),
        }
    }

    /// Connection URL with the password replaced, for logging.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some(scheme_end) = url.find("://") else {
            return url;
        };
        let rest = &url[scheme_end + 3..];
        match (rest.find(':'), rest.find('@')) {
            (Some(colon), Some(at)) if colon < at => format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &rest[..colon],
                &rest[at..]
            ),
            _ => url,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataServiceConfig {
    /// Logs the full JSON of every persisted hostdata.
    #[serde(default)]
    pub log_inserting_hostdata: bool,
    #[serde(default)]
    pub license_type_metrics_default: Vec<String>,
    #[serde(default)]
    pub license_type_metrics_by_environment: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessCheckConfig {
    #[serde(default = "default_freshness_enabled")]
    pub enabled: bool,
    #[serde(default = "default_freshness_days_threshold")]
    pub days_threshold: i64,
    #[serde(default = "default_freshness_tick_secs")]
    pub tick_secs: u64,
}

impl Default for FreshnessCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_freshness_enabled(),
            days_threshold: default_freshness_days_threshold(),
            tick_secs: default_freshness_tick_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedHostCleaningConfig {
    #[serde(default = "default_cleaning_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cleaning_hours_threshold")]
    pub hours_threshold: i64,
    #[serde(default = "default_cleaning_tick_secs")]
    pub tick_secs: u64,
}

impl Default for ArchivedHostCleaningConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleaning_enabled(),
            hours_threshold: default_cleaning_hours_threshold(),
            tick_secs: default_cleaning_tick_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    11111
}

fn default_bind_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_node_id() -> i32 {
    1
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_freshness_enabled() -> bool {
    true
}

fn default_freshness_days_threshold() -> i64 {
    7
}

fn default_freshness_tick_secs() -> u64 {
    86400
}

fn default_cleaning_enabled() -> bool {
    true
}

fn default_cleaning_hours_threshold() -> i64 {
    24 * 30
}

fn default_cleaning_tick_secs() -> u64 {
    3600
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            log_inserting_hostdata: self.data_service.log_inserting_hostdata,
            license_type_metrics_default: self.data_service.license_type_metrics_default.clone(),
            license_type_metrics_by_environment: self
                .data_service
                .license_type_metrics_by_environment
                .clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_ip: default_bind_ip(),
            node_id: default_node_id(),
            database: DatabaseConfig::default(),
            alert_service: RemoteService::default(),
            api_service: RemoteService::default(),
            data_service: DataServiceConfig::default(),
            freshness_check: FreshnessCheckConfig::default(),
            archived_host_cleaning: ArchivedHostCleaningConfig::default(),
        }
    }
}
