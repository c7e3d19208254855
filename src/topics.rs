//! Channel naming for the MQTT bridge.
//!
//! Every unit namespaces its channels under a stable per-device identifier,
//! so several switches can share one broker without colliding. The namespace
//! is rendered once during bring-up and never changes afterwards.

use std::fmt;
use std::fs;

use tracing::debug;

/// Payload sent for "on" across power/state/reset channels.
pub const ON_PAYLOAD: &str = "1";
/// Payload sent for "off" across power/state/reset channels.
pub const OFF_PAYLOAD: &str = "0";

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no readable machine id (tried {0:?})")]
    NoSource(&'static [&'static str; 2]),

    #[error("machine id {0:?} is not hexadecimal")]
    NotHex(String),
}

/// Stable per-boot device identifier, rendered as fixed-width uppercase hex.
///
/// Derived from the host machine id the same way the switch hardware derives
/// it from its chip id: the low 24 bits, formatted `%06X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Use a configured identity verbatim (bench rigs, tests).
    pub fn from_override(id: &str) -> Self {
        Self(id.to_uppercase())
    }

    /// Derive the identity from the host machine id.
    pub fn detect() -> Result<Self, IdentityError> {
        for path in MACHINE_ID_PATHS {
            if let Ok(raw) = fs::read_to_string(path) {
                debug!("deriving device identity from {path}");
                return Self::from_machine_id(raw.trim());
            }
        }
        Err(IdentityError::NoSource(&MACHINE_ID_PATHS))
    }

    fn from_machine_id(raw: &str) -> Result<Self, IdentityError> {
        if !raw.is_ascii() {
            return Err(IdentityError::NotHex(raw.to_string()));
        }
        let tail = &raw[raw.len().saturating_sub(8)..];
        let word = u32::from_str_radix(tail, 16)
            .map_err(|_| IdentityError::NotHex(raw.to_string()))?;
        Ok(Self(format!("{:06X}", word & 0x00FF_FFFF)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed channel set of one switch, keyed by logical name.
///
/// Topic template is `<base><device-id>/<segment>`. The base is usually empty
/// and exists for brokers that segregate tenants by prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicNamespace {
    version: String,
    update: String,
    reset: String,
    power: String,
    state: String,
    sensor_state: String,
}

impl TopicNamespace {
    pub fn render(base: &str, identity: &DeviceIdentity) -> Self {
        let prefix = format!("{base}{identity}");
        Self {
            version: format!("{prefix}/system/version"),
            update: format!("{prefix}/system/update"),
            reset: format!("{prefix}/system/reset"),
            power: format!("{prefix}/relay/power"),
            state: format!("{prefix}/relay/state"),
            sensor_state: format!("{prefix}/sensor/state"),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn update(&self) -> &str {
        &self.update
    }

    pub fn reset(&self) -> &str {
        &self.reset
    }

    pub fn power(&self) -> &str {
        &self.power
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn sensor_state(&self) -> &str {
        &self.sensor_state
    }

    /// Inbound channels the router listens on, in subscription order.
    pub fn subscriptions(&self) -> [&str; 3] {
        [&self.reset, &self.update, &self.power]
    }
}
