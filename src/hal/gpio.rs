//! GPIO wiring via rppal.
//!
//! Outputs are plain pin wrappers. The button (and optional sensor) inputs
//! are registered with edge-triggered async interrupts whose callbacks do
//! exactly one thing: tag the command bridge. Debouncing is done in hardware
//! at registration time, so the loop can trust the edges it is told about.

use std::time::Duration;

use rppal::gpio::{Event, Gpio, Trigger};
use tracing::debug;

use crate::config::PinSettings;
use crate::switch::bridge::{Command, CommandBridge};

use super::{InputPin, OutputPin};

#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("gpio controller unavailable: {0}")]
    Controller(#[source] rppal::gpio::Error),

    #[error("pin {pin} unavailable: {source}")]
    Pin {
        pin: u8,
        source: rppal::gpio::Error,
    },

    #[error("interrupt registration on pin {pin} failed: {source}")]
    Interrupt {
        pin: u8,
        source: rppal::gpio::Error,
    },
}

pub struct DrivenPin(rppal::gpio::OutputPin);

impl OutputPin for DrivenPin {
    fn write(&mut self, high: bool) {
        if high {
            self.0.set_high();
        } else {
            self.0.set_low();
        }
    }
}

pub struct SensedPin(rppal::gpio::InputPin);

impl InputPin for SensedPin {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

pub struct BoardPins {
    pub relay: DrivenPin,
    pub led: DrivenPin,
    pub button: SensedPin,
    pub sensor: Option<SensedPin>,
}

/// Claim and configure all pins, leaving them in the safe power-on state:
/// relay open, status LED lit.
pub fn configure(pins: &PinSettings, bridge: &CommandBridge) -> Result<BoardPins, GpioError> {
    let gpio = Gpio::new().map_err(GpioError::Controller)?;
    let debounce = (pins.debounce_ms > 0).then(|| Duration::from_millis(pins.debounce_ms));

    let relay = gpio
        .get(pins.relay)
        .map_err(|source| GpioError::Pin {
            pin: pins.relay,
            source,
        })?
        .into_output_low();
    let led = gpio
        .get(pins.led)
        .map_err(|source| GpioError::Pin {
            pin: pins.led,
            source,
        })?
        .into_output_high();

    // The button is wired to ground; pressed reads electrically low.
    let mut button = gpio
        .get(pins.button)
        .map_err(|source| GpioError::Pin {
            pin: pins.button,
            source,
        })?
        .into_input_pullup();
    let tap = bridge.clone();
    button
        .set_async_interrupt(Trigger::Both, debounce, move |_event: Event| {
            tap.signal(Command::ButtonChanged);
        })
        .map_err(|source| GpioError::Interrupt {
            pin: pins.button,
            source,
        })?;
    debug!("button interrupt registered on pin {}", pins.button);

    let sensor = match pins.sensor {
        Some(pin) => {
            let mut sensor = gpio
                .get(pin)
                .map_err(|source| GpioError::Pin { pin, source })?
                .into_input();
            let tap = bridge.clone();
            sensor
                .set_async_interrupt(Trigger::Both, debounce, move |_event: Event| {
                    tap.signal(Command::AuxiliaryChanged);
                })
                .map_err(|source| GpioError::Interrupt { pin, source })?;
            debug!("sensor interrupt registered on pin {pin}");
            Some(SensedPin(sensor))
        }
        None => None,
    };

    Ok(BoardPins {
        relay: DrivenPin(relay),
        led: DrivenPin(led),
        button: SensedPin(button),
        sensor,
    })
}
