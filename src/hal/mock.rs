//! Recording fakes for the collaborator seams, shared by the unit tests.
//!
//! Every fake is a cheap `Arc` handle: one clone goes into the boxed
//! [`Collaborators`] context, the other stays in [`Probes`] so tests can
//! script behavior and inspect what the control logic did.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
    Collaborators, FingerprintVerifier, FirmwareUpdater, Inbound, InputPin, LinkError,
    MonotonicClock, NetworkLink, OutputPin, Restarter, SessionTransport, TransportError,
    UpdateOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Clone, Default)]
pub struct FakeClock {
    now_ms: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<u64>>>,
}

impl FakeClock {
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl MonotonicClock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.sleeps.lock().unwrap().push(ms);
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct FakeLink {
    joined: Arc<AtomicBool>,
}

impl FakeLink {
    pub fn set_joined(&self, joined: bool) {
        self.joined.store(joined, Ordering::SeqCst);
    }
}

impl NetworkLink for FakeLink {
    fn joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    fn join(&mut self) -> Result<(), LinkError> {
        self.joined.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct TransportInner {
    connected: bool,
    connect_attempts: u32,
    connect_failures: u32,
    fail_subscribes: bool,
    fail_publishes: bool,
    subscriptions: Vec<String>,
    published: Vec<PublishRecord>,
    inbound: VecDeque<Inbound>,
    service_calls: u32,
}

#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Mutex<TransportInner>>,
}

impl RecordingTransport {
    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().unwrap().connected = connected;
    }

    /// Make the next `count` connect attempts fail before succeeding.
    pub fn script_connect_failures(&self, count: u32) {
        self.inner.lock().unwrap().connect_failures = count;
    }

    pub fn fail_subscribes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_subscribes = fail;
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_publishes = fail;
    }

    pub fn push_inbound(&self, topic: &str, payload: &str) {
        self.inner.lock().unwrap().inbound.push_back(Inbound {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
    }

    pub fn connect_attempts(&self) -> u32 {
        self.inner.lock().unwrap().connect_attempts
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.lock().unwrap().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<PublishRecord> {
        self.inner.lock().unwrap().published.clone()
    }

    pub fn service_calls(&self) -> u32 {
        self.inner.lock().unwrap().service_calls
    }
}

impl SessionTransport for RecordingTransport {
    fn connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn connect(&mut self, _client_id: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_attempts += 1;
        if inner.connect_failures > 0 {
            inner.connect_failures -= 1;
            return Err(TransportError::Connect("scripted failure".into()));
        }
        inner.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_subscribes {
            return Err(TransportError::Request("scripted failure".into()));
        }
        inner.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_publishes {
            return Err(TransportError::Request("scripted failure".into()));
        }
        inner.published.push(PublishRecord {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }

    fn service(&mut self, _max_wait: Duration) -> Vec<Inbound> {
        let mut inner = self.inner.lock().unwrap();
        inner.service_calls += 1;
        inner.inbound.drain(..).collect()
    }
}

#[derive(Clone, Default)]
pub struct RecordingOutputPin {
    high: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl RecordingOutputPin {
    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl OutputPin for RecordingOutputPin {
    fn write(&mut self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct FakeInputPin {
    high: Arc<AtomicBool>,
}

impl FakeInputPin {
    pub fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
    }
}

impl InputPin for FakeInputPin {
    fn is_high(&self) -> bool {
        self.high.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct RecordingRestart {
    count: Arc<AtomicUsize>,
}

impl RecordingRestart {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Restarter for RecordingRestart {
    fn restart(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct RecordingUpdater {
    inner: Arc<Mutex<(Vec<String>, UpdateOutcome)>>,
}

impl Default for RecordingUpdater {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new((Vec::new(), UpdateOutcome::NoUpdate))),
        }
    }
}

impl RecordingUpdater {
    pub fn set_outcome(&self, outcome: UpdateOutcome) {
        self.inner.lock().unwrap().1 = outcome;
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().0.clone()
    }
}

impl FirmwareUpdater for RecordingUpdater {
    fn apply(&mut self, location: &str) -> UpdateOutcome {
        let mut inner = self.inner.lock().unwrap();
        inner.0.push(location.to_string());
        inner.1.clone()
    }
}

#[derive(Clone)]
pub struct RecordingVerifier {
    inner: Arc<Mutex<(usize, bool)>>,
}

impl Default for RecordingVerifier {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new((0, true))),
        }
    }
}

impl RecordingVerifier {
    pub fn set_result(&self, result: bool) {
        self.inner.lock().unwrap().1 = result;
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().0
    }
}

impl FingerprintVerifier for RecordingVerifier {
    fn verify(&mut self, _host: &str, _port: u16, _expected: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.0 += 1;
        inner.1
    }
}

pub struct Probes {
    pub clock: FakeClock,
    pub link: FakeLink,
    pub transport: RecordingTransport,
    pub updater: RecordingUpdater,
    pub verifier: RecordingVerifier,
    pub restart: RecordingRestart,
    pub relay: RecordingOutputPin,
    pub led: RecordingOutputPin,
    pub button: FakeInputPin,
    pub sensor: FakeInputPin,
}

/// A full collaborator context wired to fakes, plus the probe handles.
///
/// Defaults: link joined, session down, button released (pull-up high),
/// sensor low, every scripted operation succeeding.
pub fn harness() -> (Collaborators, Probes) {
    let clock = FakeClock::default();
    let link = FakeLink {
        joined: Arc::new(AtomicBool::new(true)),
    };
    let transport = RecordingTransport::default();
    let updater = RecordingUpdater::default();
    let verifier = RecordingVerifier::default();
    let restart = RecordingRestart::default();
    let relay = RecordingOutputPin::default();
    let led = RecordingOutputPin::default();
    let button = FakeInputPin {
        high: Arc::new(AtomicBool::new(true)),
    };
    let sensor = FakeInputPin {
        high: Arc::new(AtomicBool::new(false)),
    };

    let io = Collaborators {
        clock: Box::new(clock.clone()),
        link: Box::new(link.clone()),
        transport: Box::new(transport.clone()),
        updater: Box::new(updater.clone()),
        verifier: Box::new(verifier.clone()),
        power: Box::new(restart.clone()),
        relay_pin: Box::new(relay.clone()),
        led_pin: Box::new(led.clone()),
        button_pin: Box::new(button.clone()),
        sensor_pin: Some(Box::new(sensor.clone())),
    };

    let probes = Probes {
        clock,
        link,
        transport,
        updater,
        verifier,
        restart,
        relay,
        led,
        button,
        sensor,
    };
    (io, probes)
}
