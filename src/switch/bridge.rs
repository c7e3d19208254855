//! Interrupt-to-loop command bridge.
//!
//! GPIO edges are delivered on interrupt threads while all control logic runs
//! on the single main loop. The bridge is the only mutable state shared
//! between the two: a depth-one cell that producers overwrite and the loop
//! drains once per pass. A newer edge replacing an unread one is intentional,
//! lossy semantics; the loop re-reads the pin level anyway, so only the
//! "something changed" fact matters.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// What a producer observed. The loop decides what to do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ButtonChanged,
    AuxiliaryChanged,
}

const EMPTY: u8 = 0;
const BUTTON: u8 = 1;
const AUXILIARY: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct CommandBridge {
    slot: Arc<AtomicU8>,
}

impl CommandBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command from interrupt context.
    ///
    /// One atomic store, nothing else: no I/O, no blocking, no allocation.
    pub fn signal(&self, command: Command) {
        let tag = match command {
            Command::ButtonChanged => BUTTON,
            Command::AuxiliaryChanged => AUXILIARY,
        };
        self.slot.store(tag, Ordering::Release);
    }

    /// Take the pending command, if any. Main loop only.
    ///
    /// Read-and-clear is one atomic swap, so it cannot tear against a
    /// concurrent `signal`.
    pub fn drain(&self) -> Option<Command> {
        match self.slot.swap(EMPTY, Ordering::AcqRel) {
            BUTTON => Some(Command::ButtonChanged),
            AUXILIARY => Some(Command::AuxiliaryChanged),
            _ => None,
        }
    }
}
