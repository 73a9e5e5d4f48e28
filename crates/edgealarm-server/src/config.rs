use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// IPv4 stamped on reports produced by the center's own monitors.
    #[serde(default = "default_host_ip")]
    pub host_ip: String,
    /// Number of sequential ingestion lanes in the peer adapter.
    #[serde(default = "default_lanes")]
    pub lanes: usize,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub janitor: JanitorConfig,
    #[serde(default)]
    pub cert_monitor: CertMonitorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            host_ip: default_host_ip(),
            lanes: default_lanes(),
            rpc: RpcConfig::default(),
            janitor: JanitorConfig::default(),
            cert_monitor: CertMonitorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Full connection URL. Defaults to a SQLite file under `data_dir`.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => {
                let path = Path::new(&self.data_dir).join("alarm-manager.db");
                format!("sqlite://{}?mode=rwc", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_group_timeout_ms")]
    pub group_timeout_ms: u64,
    #[serde(default = "default_ip_timeout_ms")]
    pub ip_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            group_timeout_ms: default_group_timeout_ms(),
            ip_timeout_ms: default_ip_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanitorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_janitor_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_janitor_threshold")]
    pub threshold: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_janitor_interval_secs(),
            threshold: default_janitor_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertMonitorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// PEM path of the northbound certificate.
    #[serde(default)]
    pub north_cert: Option<String>,
    /// PEM path of the software repository certificate.
    #[serde(default)]
    pub software_cert: Option<String>,
    /// PEM path of the image repository certificate.
    #[serde(default)]
    pub image_cert: Option<String>,
    #[serde(default = "default_period_days")]
    pub default_period_days: u64,
    #[serde(default = "default_threshold_days")]
    pub default_threshold_days: u64,
    #[serde(default = "default_register_retries")]
    pub register_retries: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for CertMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            north_cert: None,
            software_cert: None,
            image_cert: None,
            default_period_days: default_period_days(),
            default_threshold_days: default_threshold_days(),
            register_retries: default_register_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_host_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_lanes() -> usize {
    8
}

fn default_group_timeout_ms() -> u64 {
    1000
}

fn default_ip_timeout_ms() -> u64 {
    10_000
}

fn default_enabled() -> bool {
    true
}

fn default_janitor_interval_secs() -> u64 {
    300
}

fn default_janitor_threshold() -> u64 {
    edgealarm_common::types::GLOBAL_CLEAR_THRESHOLD
}

fn default_period_days() -> u64 {
    1
}

fn default_threshold_days() -> u64 {
    90
}

fn default_register_retries() -> u32 {
    5
}

fn default_retry_backoff_secs() -> u64 {
    5
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Lane count clamped to at least one.
    pub fn lane_count(&self) -> usize {
        self.lanes.max(1)
    }
}
