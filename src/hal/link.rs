//! Network link state via sysfs.
//!
//! The daemon does not manage the join itself (wpa_supplicant or
//! NetworkManager owns that); it only observes whether the configured
//! interface carries a link, by polling the kernel's operstate file.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::info;

use super::{LinkError, NetworkLink};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct OperstateLink {
    interface: String,
}

impl OperstateLink {
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
        }
    }

    fn operstate_path(&self) -> PathBuf {
        PathBuf::from("/sys/class/net")
            .join(&self.interface)
            .join("operstate")
    }
}

impl NetworkLink for OperstateLink {
    fn joined(&self) -> bool {
        fs::read_to_string(self.operstate_path())
            .map(|state| state.trim() == "up")
            .unwrap_or(false)
    }

    fn join(&mut self) -> Result<(), LinkError> {
        if !self.operstate_path().exists() {
            return Err(LinkError::UnknownInterface(self.interface.clone()));
        }
        info!("waiting for {} to come up", self.interface);
        while !self.joined() {
            thread::sleep(POLL_INTERVAL);
        }
        info!("network joined on {}", self.interface);
        Ok(())
    }
}
