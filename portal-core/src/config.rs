use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

static DEFAULT_CLIENT_CONFIG: Lazy<ClientConfig> = Lazy::new(|| {
    const CONFIG_TOML: &str = include_str!("../configs/portal_client.toml");
    load_config_from_toml_str(CONFIG_TOML).expect("Built-in portal_client.toml is invalid")
});

static DEFAULT_SIMULATOR_CONFIG: Lazy<SimulatorConfig> = Lazy::new(|| {
    const CONFIG_TOML: &str = include_str!("../configs/simulator.toml");
    simulator_config_from_toml_str(CONFIG_TOML).expect("Built-in simulator.toml is invalid")
});

// ============= 客户端配置 =============

/// 顶层客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub device: DeviceConfig,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        DEFAULT_CLIENT_CONFIG.clone()
    }
}

/// Where the device's portal lives and how long a single request may take.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// 用于解析 TOML 的临时结构
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientConfigFile {
    #[serde(default)]
    device: DeviceToml,
    #[serde(default)]
    poll: PollToml,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DeviceToml {
    base_url: String,
    request_timeout_ms: u64,
}

impl Default for DeviceToml {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.4.1".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PollToml {
    interval_ms: u64,
}

impl Default for PollToml {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl TryFrom<ClientConfigFile> for ClientConfig {
    type Error = Error;

    fn try_from(t: ClientConfigFile) -> Result<Self> {
        let base_url = t.device.base_url.trim().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "device.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        Ok(ClientConfig {
            device: DeviceConfig {
                base_url,
                request_timeout: positive_millis("device.request_timeout_ms", t.device.request_timeout_ms)?,
            },
            poll: PollConfig {
                interval: positive_millis("poll.interval_ms", t.poll.interval_ms)?,
            },
        })
    }
}

fn positive_millis(key: &str, value: u64) -> Result<Duration> {
    if value == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_millis(value))
}

// ============= 模拟设备配置 =============

/// A network the simulated radio can see, with the credentials it accepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimNetwork {
    pub ssid: String,
    pub rssi: i32,
    pub ch: u32,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub enterprise: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Whether the post-association internet check passes.
    #[serde(default = "default_true")]
    pub internet: bool,
}

fn default_true() -> bool {
    true
}

/// Behaviour of the simulated provisioning device.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub networks: Vec<SimNetwork>,
    pub assigned_ip: String,
    /// Time until a correctly configured network reports an association.
    pub association_delay: Duration,
    pub wpa_deadline: Duration,
    pub enterprise_deadline: Duration,
    pub enterprise_supported: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        DEFAULT_SIMULATOR_CONFIG.clone()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulatorConfigFile {
    #[serde(default)]
    networks: Vec<SimNetwork>,
    assigned_ip: String,
    association_delay_ms: u64,
    #[serde(default = "default_wpa_deadline_ms")]
    wpa_deadline_ms: u64,
    #[serde(default = "default_enterprise_deadline_ms")]
    enterprise_deadline_ms: u64,
    #[serde(default = "default_true")]
    enterprise_supported: bool,
}

fn default_wpa_deadline_ms() -> u64 {
    15_000
}

fn default_enterprise_deadline_ms() -> u64 {
    20_000
}

impl TryFrom<SimulatorConfigFile> for SimulatorConfig {
    type Error = Error;

    fn try_from(t: SimulatorConfigFile) -> Result<Self> {
        if let Some(bad) = t.networks.iter().find(|n| n.ssid.is_empty()) {
            return Err(Error::Config(format!(
                "simulated network on channel {} has an empty ssid",
                bad.ch
            )));
        }
        Ok(SimulatorConfig {
            networks: t.networks,
            assigned_ip: t.assigned_ip,
            association_delay: Duration::from_millis(t.association_delay_ms),
            wpa_deadline: positive_millis("wpa_deadline_ms", t.wpa_deadline_ms)?,
            enterprise_deadline: positive_millis("enterprise_deadline_ms", t.enterprise_deadline_ms)?,
            enterprise_supported: t.enterprise_supported,
        })
    }
}

// ============= 配置加载函数 =============

/// 从 TOML 字符串加载客户端配置
pub fn load_config_from_toml_str(s: &str) -> Result<ClientConfig> {
    let parsed: ClientConfigFile =
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
    ClientConfig::try_from(parsed)
}

/// 从文件加载客户端配置
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    tracing::debug!("Loaded client config from {}", path.display());
    load_config_from_toml_str(&content)
}

pub fn simulator_config_from_toml_str(s: &str) -> Result<SimulatorConfig> {
    let parsed: SimulatorConfigFile =
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
    SimulatorConfig::try_from(parsed)
}

pub fn load_simulator_config_from_path(path: impl AsRef<Path>) -> Result<SimulatorConfig> {
    let content = std::fs::read_to_string(path.as_ref())?;
    simulator_config_from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_defaults_parse() {
        let config = ClientConfig::default();
        assert_eq!(config.device.base_url, "http://192.168.4.1");
        assert_eq!(config.device.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poll.interval, Duration::from_millis(1500));

        let simulator = SimulatorConfig::default();
        assert!(!simulator.networks.is_empty());
        assert!(simulator.enterprise_supported);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = load_config_from_toml_str(
            r#"
            [device]
            base_url = "http://10.1.1.1:8080/"
            "#,
        )
        .expect("parse partial config");
        assert_eq!(config.device.base_url, "http://10.1.1.1:8080/");
        assert_eq!(config.poll.interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load_config_from_toml_str("[device]\nbase_url = \"192.168.4.1\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            load_config_from_toml_str("[poll]\ninterval_ms = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            load_config_from_toml_str("[poll]\ninterval = 5"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn simulator_network_defaults() {
        let config = simulator_config_from_toml_str(
            r#"
            assigned_ip = "10.0.0.5"
            association_delay_ms = 0

            [[networks]]
            ssid = "Lab"
            rssi = -50
            ch = 3
            "#,
        )
        .expect("parse simulator config");
        let lab = &config.networks[0];
        assert!(!lab.open && !lab.enterprise && lab.internet);
        assert_eq!(config.wpa_deadline, Duration::from_secs(15));
        assert_eq!(config.enterprise_deadline, Duration::from_secs(20));
    }
}
