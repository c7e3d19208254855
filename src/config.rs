//! Daemon configuration.
//!
//! Everything the firmware build of this device baked in at compile time is a
//! TOML file here: broker address and credentials, pin assignments, and the
//! behavior switches that distinguish the two historical device profiles.
//! Every field has a default so a missing file still yields a runnable
//! configuration.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const CONFIG_ENV: &str = "RELAYPILOT_CONFIG";
const LOCAL_FILE: &str = "relaypilot.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttSettings,
    pub device: DeviceSettings,
    pub pins: PinSettings,
    pub behavior: BehaviorSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Expected TLS certificate fingerprint. Empty disables the check.
    pub fingerprint: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            fingerprint: String::new(),
            keep_alive_secs: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct DeviceSettings {
    /// Network interface whose link state counts as "joined".
    pub interface: String,
    /// Prefix prepended to every channel, usually empty.
    pub topic_base: String,
    /// Identity override for bench rigs; empty means derive from the host.
    pub identity: String,
    /// Version string announced at boot; empty means the crate version.
    pub firmware_version: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            interface: "wlan0".to_string(),
            topic_base: String::new(),
            identity: String::new(),
            firmware_version: String::new(),
        }
    }
}

/// BCM pin assignments, defaults matching the stock relay board wiring.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct PinSettings {
    pub button: u8,
    pub relay: u8,
    pub led: u8,
    /// Optional auxiliary sensor input (PIR, reed contact).
    pub sensor: Option<u8>,
    /// Hardware debounce applied at interrupt registration.
    pub debounce_ms: u64,
}

impl Default for PinSettings {
    fn default() -> Self {
        Self {
            button: 17,
            relay: 27,
            led: 22,
            sensor: None,
            debounce_ms: 20,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Legacy wire profile: write and publish even when the relay state is
    /// unchanged. The canonical profile publishes on change only.
    pub publish_unchanged: bool,
    /// Press duration at or above which a button release means factory reset.
    pub long_press_ms: u64,
    /// Fixed delay between session reconnect attempts.
    pub reconnect_delay_ms: u64,
    /// How long one transport service tick may wait for inbound traffic.
    /// This wait is also what paces the main loop.
    pub service_poll_ms: u64,
    /// Re-announce the firmware version at this interval. Zero disables the
    /// ping; it exists for debugging broker-side liveness.
    pub version_ping_secs: u64,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            publish_unchanged: false,
            long_press_ms: 500,
            reconnect_delay_ms: 1000,
            service_poll_ms: 50,
            version_ping_secs: 0,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when no file exists.
    ///
    /// Resolution order: `RELAYPILOT_CONFIG`, then `./relaypilot.toml`, then
    /// the per-user config directory.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::resolve_path() else {
            info!("no config file found, using defaults");
            return Ok(Self::default());
        };

        info!("loading config from {}", path.display());
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        debug!(
            "config loaded: broker {}:{}, interface {}",
            config.mqtt.host, config.mqtt.port, config.device.interface
        );
        Ok(config)
    }

    fn resolve_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(LOCAL_FILE);
        if local.is_file() {
            return Some(local);
        }
        let user = dirs::config_dir()?.join("relaypilot").join("config.toml");
        user.is_file().then_some(user)
    }
}
