//! Polarity-aware digital output lines.
//!
//! The executor speaks in "active / inactive"; each [`OutputLine`] maps
//! that onto the electrical level its pin needs. Any
//! `embedded_hal::digital::OutputPin` works, so the same executor drives
//! real GPIOs on the target and recording mocks in tests.

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

pub struct OutputLine<P> {
    pin: P,
    polarity: Polarity,
    name: &'static str,
    active: bool,
}

impl<P: OutputPin> OutputLine<P> {
    /// Wrap `pin` and drive it inactive straight away.
    pub fn new(pin: P, polarity: Polarity, name: &'static str) -> Self {
        let mut line = Self {
            pin,
            polarity,
            name,
            active: true,
        };
        if let Err(e) = line.set(false) {
            log::warn!("{e}");
        }
        line
    }

    pub fn set(&mut self, active: bool) -> Result<()> {
        let high = match self.polarity {
            Polarity::ActiveHigh => active,
            Polarity::ActiveLow => !active,
        };
        self.pin
            .set_state(PinState::from(high))
            .map_err(|_| Error::OutputWrite(self.name))?;
        self.active = active;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Access the wrapped pin (tests inspect mock pins through this).
    pub fn pin(&self) -> &P {
        &self.pin
    }
}
