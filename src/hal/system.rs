//! Restart primitive and the log-only stand-ins for delegated mechanisms.

use std::process::Command;

use tracing::{error, warn};

use super::{FingerprintVerifier, FirmwareUpdater, Restarter, UpdateOutcome};

/// Reboots the board through the service manager. If that fails the process
/// exits anyway and the unit's restart policy brings the daemon back.
pub struct SystemRestart;

impl Restarter for SystemRestart {
    fn restart(&self) {
        warn!("device restart requested");
        if let Err(err) = Command::new("systemctl").arg("reboot").status() {
            error!("reboot command failed: {err}");
        }
        std::process::exit(1);
    }
}

/// Update seam with no flash backend wired in: logs the request and reports
/// that no update happened.
pub struct LogOnlyUpdater;

impl FirmwareUpdater for LogOnlyUpdater {
    fn apply(&mut self, location: &str) -> UpdateOutcome {
        warn!("firmware update from {location} requested, but no update backend is configured");
        UpdateOutcome::NoUpdate
    }
}

/// Fingerprint seam with no TLS backend wired in: logs and accepts.
pub struct LogOnlyVerifier;

impl FingerprintVerifier for LogOnlyVerifier {
    fn verify(&mut self, host: &str, port: u16, expected: &str) -> bool {
        warn!(
            "fingerprint pinning configured for {host}:{port} (expected {expected}), \
             but no TLS backend is wired in; accepting"
        );
        true
    }
}
