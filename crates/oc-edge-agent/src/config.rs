//! Edge agent configuration, loadable from TOML or environment.

use oc_uplink::UplinkConfig;
use serde::Deserialize;

/// Top-level configuration for the edge agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Human-readable device description, announced on connect.
    #[serde(default = "default_description")]
    pub device_description: String,
    /// Seconds between periodic device status reports.
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
    /// Broker uplink settings. Missing host or device name runs the
    /// agent with messaging disabled.
    #[serde(default)]
    pub uplink: UplinkConfig,
}

fn default_description() -> String {
    "OwlCam edge device".to_string()
}

fn default_status_interval() -> u64 {
    30
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Build config from the environment (`MQTT_BROKER_IP`,
    /// `MQTT_DEVICE_NAME`, `MQTT_BROKER_PORT`), for deployments that
    /// ship no config file.
    pub fn from_env() -> Self {
        Self {
            device_description: default_description(),
            status_interval_secs: default_status_interval(),
            uplink: UplinkConfig::from_env(),
        }
    }
}
