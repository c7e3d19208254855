//! Relay output control and state notification.
//!
//! The relay and the status LED are one unit: the LED is always driven as
//! the logical inverse of the relay, never on its own. Every effective state
//! change is announced with a retained publish so late subscribers see the
//! current state immediately.

use tracing::{debug, warn};

use crate::hal::Collaborators;
use crate::topics::{OFF_PAYLOAD, ON_PAYLOAD};

#[derive(Debug)]
pub struct RelayController {
    on: bool,
    publish_unchanged: bool,
}

impl RelayController {
    /// `publish_unchanged` selects the legacy wire profile that writes and
    /// publishes on every command; the canonical profile is change-only.
    pub fn new(publish_unchanged: bool) -> Self {
        Self {
            on: false,
            publish_unchanged,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Drive the relay to `on` and announce it.
    ///
    /// Under the canonical profile a command equal to the current state is a
    /// complete no-op: no GPIO write, no publish.
    pub fn apply(&mut self, on: bool, state_topic: &str, io: &mut Collaborators) {
        if on == self.on && !self.publish_unchanged {
            debug!("relay already {}, skipping", state_label(on));
            return;
        }

        self.on = on;
        io.relay_pin.write(on);
        io.led_pin.write(!on);
        publish_state(state_topic, on, io);
    }
}

/// Retained state notification with the canonical numeric payload.
///
/// A failed publish is logged and dropped; the reconnect cycle is the only
/// recovery path.
pub(crate) fn publish_state(topic: &str, on: bool, io: &mut Collaborators) {
    let payload = if on { ON_PAYLOAD } else { OFF_PAYLOAD };
    match io.transport.publish(topic, payload, true) {
        Ok(()) => debug!("published {payload} to {topic}"),
        Err(err) => warn!("state publish to {topic} failed: {err}"),
    }
}

fn state_label(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
