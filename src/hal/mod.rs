//! Hardware and transport seams.
//!
//! The control logic in `switch/` only ever talks to the traits in this
//! module; the submodules provide the production implementations (rppal
//! GPIO, rumqttc session, sysfs link state, systemd restart). Everything the
//! loop needs is consolidated into one owned [`Collaborators`] context built
//! at startup — no globals, no singletons.

pub mod clock;
pub mod gpio;
pub mod link;
#[cfg(test)]
pub mod mock;
pub mod mqtt;
pub mod system;

use std::time::Duration;

use crate::config::Config;
use crate::switch::bridge::CommandBridge;

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error(transparent)]
    Gpio(#[from] gpio::GpioError),
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("network interface {0} does not exist")]
    UnknownInterface(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("broker rejected the session: {0}")]
    Rejected(String),

    #[error("session connect failed: {0}")]
    Connect(String),

    #[error("no session acknowledgement within {0:?}")]
    AckTimeout(Duration),

    #[error("no active session")]
    NotConnected,

    #[error("transport request failed: {0}")]
    Request(String),
}

/// Millisecond monotonic time plus the loop's blocking sleep.
pub trait MonotonicClock: Send {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&self, ms: u64);
}

/// The underlying network join, below the broker session.
pub trait NetworkLink: Send {
    fn joined(&self) -> bool;

    /// Block until the link is up. Short fixed retry interval, no timeout.
    fn join(&mut self) -> Result<(), LinkError>;
}

/// One inbound publish delivered by the session transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String,
    pub payload: String,
}

/// The broker session: connect, publish, subscribe, and a periodic service
/// tick that must run every loop pass to keep the session alive.
pub trait SessionTransport: Send {
    fn connected(&self) -> bool;

    fn connect(&mut self, client_id: &str) -> Result<(), TransportError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &str, retain: bool)
        -> Result<(), TransportError>;

    /// Pump the session event loop once, waiting at most `max_wait`, and
    /// return whatever inbound publishes arrived. Also where session loss is
    /// detected.
    fn service(&mut self, max_wait: Duration) -> Vec<Inbound>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    NoUpdate,
    Failed(String),
}

/// Firmware image download-and-flash, delegated wholesale.
pub trait FirmwareUpdater: Send {
    fn apply(&mut self, location: &str) -> UpdateOutcome;
}

/// TLS certificate fingerprint check against the broker endpoint.
pub trait FingerprintVerifier: Send {
    fn verify(&mut self, host: &str, port: u16, expected: &str) -> bool;
}

/// Unconditional device reboot.
///
/// The production implementation does not return in any useful sense;
/// callers bail out immediately after requesting a restart.
pub trait Restarter: Send {
    fn restart(&self);
}

pub trait OutputPin: Send {
    fn write(&mut self, high: bool);
}

pub trait InputPin: Send {
    fn is_high(&self) -> bool;
}

/// Every external collaborator the control loop touches, owned in one place.
pub struct Collaborators {
    pub clock: Box<dyn MonotonicClock>,
    pub link: Box<dyn NetworkLink>,
    pub transport: Box<dyn SessionTransport>,
    pub updater: Box<dyn FirmwareUpdater>,
    pub verifier: Box<dyn FingerprintVerifier>,
    pub power: Box<dyn Restarter>,
    pub relay_pin: Box<dyn OutputPin>,
    pub led_pin: Box<dyn OutputPin>,
    pub button_pin: Box<dyn InputPin>,
    pub sensor_pin: Option<Box<dyn InputPin>>,
}

/// Wire up the production collaborators for the given configuration.
///
/// GPIO is configured first and left in its safe power-on state (relay open,
/// status LED lit) before any networking exists.
pub fn build(config: &Config, bridge: &CommandBridge) -> Result<Collaborators, HalError> {
    let board = gpio::configure(&config.pins, bridge)?;
    Ok(Collaborators {
        clock: Box::new(clock::SystemClock::new()),
        link: Box::new(link::OperstateLink::new(&config.device.interface)),
        transport: Box::new(mqtt::RumqttcSession::new(config.mqtt.clone())),
        updater: Box::new(system::LogOnlyUpdater),
        verifier: Box::new(system::LogOnlyVerifier),
        power: Box::new(system::SystemRestart),
        relay_pin: Box::new(board.relay),
        led_pin: Box::new(board.led),
        button_pin: Box::new(board.button),
        sensor_pin: board
            .sensor
            .map(|pin| Box::new(pin) as Box<dyn InputPin>),
    })
}
