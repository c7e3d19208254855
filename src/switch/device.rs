//! The switch runtime: bring-up sequence and the cooperative control loop.
//!
//! Built as a statum machine with two phases. `Switch<Initializing>` owns
//! the boot sequence, whose order is load-bearing: GPIO reaches a safe state
//! before any networking, the network join blocks before any session work,
//! and the session comes up before the first notifications go out.
//! `Switch<Running>` is the single-threaded loop: one connectivity check,
//! one transport service tick, at most one drained command per pass.

use std::time::Duration;

use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::hal::{Collaborators, LinkError, UpdateOutcome};
use crate::topics::{DeviceIdentity, IdentityError, TopicNamespace};

use super::bridge::{Command, CommandBridge};
use super::button::{ButtonGestureDetector, Gesture};
use super::relay::{self, RelayController};
use super::router::{MessageRouter, Route};
use super::supervisor::{ConnectivitySupervisor, SupervisorError};

/// Runtime settings snapshot, flattened from the configuration sections.
#[derive(Debug, Clone)]
pub struct Profile {
    pub topic_base: String,
    pub identity_override: String,
    pub firmware_version: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub fingerprint: String,
    pub publish_unchanged: bool,
    pub long_press_ms: u64,
    pub reconnect_delay_ms: u64,
    pub service_poll_ms: u64,
    pub version_ping_secs: u64,
}

impl Profile {
    pub fn from_config(config: &Config) -> Self {
        let firmware_version = if config.device.firmware_version.is_empty() {
            env!("CARGO_PKG_VERSION").to_string()
        } else {
            config.device.firmware_version.clone()
        };
        Self {
            topic_base: config.device.topic_base.clone(),
            identity_override: config.device.identity.clone(),
            firmware_version,
            mqtt_host: config.mqtt.host.clone(),
            mqtt_port: config.mqtt.port,
            fingerprint: config.mqtt.fingerprint.clone(),
            publish_unchanged: config.behavior.publish_unchanged,
            long_press_ms: config.behavior.long_press_ms,
            reconnect_delay_ms: config.behavior.reconnect_delay_ms,
            service_poll_ms: config.behavior.service_poll_ms,
            version_ping_secs: config.behavior.version_ping_secs,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device identity unavailable: {0}")]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("server fingerprint mismatch for {0}, device restart issued")]
    FingerprintMismatch(String),
}

/// Whether a handled event ended in a restart request. The production
/// restarter never returns, but the loop must also stop cleanly when a
/// recording one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Restarting,
}

#[state]
#[derive(Debug, Clone)]
pub enum Phase {
    Initializing,
    Running,
}

#[machine]
pub struct Switch<S: Phase> {
    profile: Profile,
    topics: TopicNamespace,
    bridge: CommandBridge,
    gestures: ButtonGestureDetector,
    relay: RelayController,
    router: MessageRouter,
    supervisor: ConnectivitySupervisor,
    io: Collaborators,
    last_version_ping_ms: u64,
}

impl Switch<Initializing> {
    pub fn create(profile: Profile, bridge: CommandBridge, io: Collaborators) -> Self {
        let gestures = ButtonGestureDetector::new(profile.long_press_ms);
        let relay = RelayController::new(profile.publish_unchanged);
        Self::new(
            profile,
            TopicNamespace::default(),
            bridge,
            gestures,
            relay,
            MessageRouter::default(),
            ConnectivitySupervisor::default(),
            io,
            0,
        )
    }

    /// Run the boot sequence and hand over to the control loop.
    pub fn bring_up(
        mut self,
        shutdown: &CancellationToken,
    ) -> Result<Switch<Running>, DeviceError> {
        // Deterministic physical output before any networking: relay open,
        // boot indicator lit.
        self.io.relay_pin.write(false);
        self.io.led_pin.write(true);
        let pressed = !self.io.button_pin.is_high();
        self.gestures.sync(pressed);

        self.io.link.join()?;

        let identity = if self.profile.identity_override.is_empty() {
            DeviceIdentity::detect()?
        } else {
            DeviceIdentity::from_override(&self.profile.identity_override)
        };
        info!("device identity: {identity}");
        self.topics = TopicNamespace::render(&self.profile.topic_base, &identity);

        if !self.profile.fingerprint.is_empty() {
            let host = self.profile.mqtt_host.clone();
            let verified =
                self.io
                    .verifier
                    .verify(&host, self.profile.mqtt_port, &self.profile.fingerprint);
            if !verified {
                error!("server fingerprint mismatch, restarting");
                self.io.power.restart();
                return Err(DeviceError::FingerprintMismatch(host));
            }
        }

        self.router = MessageRouter::new(self.topics.clone());
        self.supervisor = ConnectivitySupervisor::new(
            identity.as_str(),
            self.topics.subscriptions().map(String::from).to_vec(),
            self.profile.reconnect_delay_ms,
        );
        self.supervisor.ensure_connected(&mut self.io, shutdown)?;

        // Announce ourselves: firmware version, then the current relay state
        // so late subscribers have something retained to read.
        if let Err(err) =
            self.io
                .transport
                .publish(self.topics.version(), &self.profile.firmware_version, true)
        {
            warn!("version publish failed: {err}");
        }
        relay::publish_state(self.topics.state(), self.relay.is_on(), &mut self.io);

        // Boot pattern done; from here the LED tracks the relay inverse.
        self.io.led_pin.write(!self.relay.is_on());

        info!("bring-up complete, entering control loop");
        Ok(self.transition())
    }
}

impl Switch<Running> {
    /// The cooperative main loop. Returns when shutdown is requested or a
    /// restart has been issued.
    pub fn run(&mut self, shutdown: CancellationToken) -> Result<(), DeviceError> {
        while !shutdown.is_cancelled() {
            if self.pass(&shutdown)? == Step::Restarting {
                return Ok(());
            }
        }
        info!("shutdown requested, leaving control loop");
        Ok(())
    }

    /// One bounded pass: connectivity check, one service tick, at most one
    /// drained command. The service tick's wait is the loop's yield point;
    /// skipping it would starve the session keepalive.
    fn pass(&mut self, shutdown: &CancellationToken) -> Result<Step, DeviceError> {
        match self.supervisor.ensure_connected(&mut self.io, shutdown) {
            Ok(()) => {}
            Err(SupervisorError::Shutdown) => return Ok(Step::Continue),
            Err(err @ SupervisorError::NetworkLost) => return Err(err.into()),
        }

        let poll = Duration::from_millis(self.profile.service_poll_ms);
        for message in self.io.transport.service(poll) {
            if self.on_message(&message.topic, &message.payload) == Step::Restarting {
                return Ok(Step::Restarting);
            }
        }

        self.maybe_ping_version();

        if let Some(command) = self.bridge.drain() {
            if self.on_command(command) == Step::Restarting {
                return Ok(Step::Restarting);
            }
        }
        Ok(Step::Continue)
    }

    fn on_message(&mut self, topic: &str, payload: &str) -> Step {
        let Some(route) = self.router.route(topic, payload) else {
            return Step::Continue;
        };
        match route {
            Route::SetRelay(on) => {
                info!("remote power command: {}", if on { "on" } else { "off" });
                self.relay.apply(on, self.topics.state(), &mut self.io);
                Step::Continue
            }
            Route::ResetRequested => {
                info!("remote reset command, acknowledging and restarting");
                relay::publish_state(self.topics.state(), false, &mut self.io);
                self.io.power.restart();
                Step::Restarting
            }
            Route::UpdateRequested(location) => {
                info!("firmware update requested from {location}");
                match self.io.updater.apply(&location) {
                    UpdateOutcome::Applied => info!("firmware update applied"),
                    UpdateOutcome::NoUpdate => info!("no firmware update available"),
                    UpdateOutcome::Failed(reason) => error!("firmware update failed: {reason}"),
                }
                Step::Continue
            }
        }
    }

    fn on_command(&mut self, command: Command) -> Step {
        match command {
            Command::ButtonChanged => {
                let pressed = !self.io.button_pin.is_high();
                let now_ms = self.io.clock.now_ms();
                match self.gestures.on_edge(pressed, now_ms) {
                    Some(Gesture::Toggle) => {
                        let next = !self.relay.is_on();
                        info!("short press, relay {}", if next { "on" } else { "off" });
                        self.relay.apply(next, self.topics.state(), &mut self.io);
                    }
                    Some(Gesture::FactoryReset) => {
                        warn!("long press, factory reset");
                        self.io.power.restart();
                        return Step::Restarting;
                    }
                    None => {}
                }
                Step::Continue
            }
            Command::AuxiliaryChanged => {
                let level = self.io.sensor_pin.as_ref().map(|pin| pin.is_high());
                match level {
                    Some(high) => {
                        debug!("sensor edge, level {}", if high { "high" } else { "low" });
                        relay::publish_state(self.topics.sensor_state(), high, &mut self.io);
                    }
                    None => debug!("auxiliary edge with no sensor configured"),
                }
                Step::Continue
            }
        }
    }

    /// Debug liveness ping: re-announce the firmware version periodically.
    fn maybe_ping_version(&mut self) {
        if self.profile.version_ping_secs == 0 {
            return;
        }
        let interval_ms = self.profile.version_ping_secs * 1000;
        let now_ms = self.io.clock.now_ms();
        if now_ms.saturating_sub(self.last_version_ping_ms) < interval_ms {
            return;
        }
        self.last_version_ping_ms = now_ms;
        if let Err(err) =
            self.io
                .transport
                .publish(self.topics.version(), &self.profile.firmware_version, true)
        {
            warn!("version ping failed: {err}");
        }
    }
}
