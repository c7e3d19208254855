//! Button gesture classification.
//!
//! A two-state edge machine over the debounced button level. The press
//! duration decides the gesture on the release edge: a short press toggles
//! the relay, a long press means factory reset. Debouncing happens at the
//! GPIO interrupt layer; edges arriving here are trusted.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Short press: invert the relay.
    Toggle,
    /// Long press: restart the device, skipping any final publish.
    FactoryReset,
}

#[derive(Debug)]
pub struct ButtonGestureDetector {
    pressed: bool,
    pressed_at_ms: u64,
    long_press_ms: u64,
}

impl ButtonGestureDetector {
    pub fn new(long_press_ms: u64) -> Self {
        Self {
            pressed: false,
            pressed_at_ms: 0,
            long_press_ms,
        }
    }

    /// Align the stored level with the physical pin, without classifying.
    /// Used once at bring-up so the first real edge is seen as an edge.
    pub fn sync(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    /// Feed one debounced level observation taken after an edge interrupt.
    ///
    /// An observation equal to the stored level is a spurious interrupt and
    /// classifies nothing. Durations are only meaningful between a recorded
    /// press edge and the following release edge.
    pub fn on_edge(&mut self, pressed: bool, now_ms: u64) -> Option<Gesture> {
        if pressed == self.pressed {
            debug!("spurious button interrupt, level unchanged");
            return None;
        }

        let gesture = if pressed {
            self.pressed_at_ms = now_ms;
            None
        } else {
            let held_ms = now_ms.saturating_sub(self.pressed_at_ms);
            debug!("button released after {held_ms}ms");
            if held_ms < self.long_press_ms {
                Some(Gesture::Toggle)
            } else {
                Some(Gesture::FactoryReset)
            }
        };

        self.pressed = pressed;
        gesture
    }
}
