//! Executor commands.
//!
//! The controller pushes these onto the [`ActionQueue`](crate::queue::ActionQueue);
//! the executor is the only consumer.

use serde::Serialize;

use crate::config::{DEVICE_PRESS_LONG_MS, DEVICE_PRESS_SHORT_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub enqueued_ms: u32,
    pub id: ActionId,
}

impl Action {
    pub fn new(enqueued_ms: u32, id: ActionId) -> Self {
        Self { enqueued_ms, id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    Light(LightPattern),
    Beep(BeepPattern),
    DevicePress(PressKind),
    /// Drive the power-cut line. Terminal.
    AssertKill,
}

impl ActionId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Light(_) => "Light",
            Self::Beep(_) => "Beep",
            Self::DevicePress(_) => "DevicePress",
            Self::AssertKill => "AssertKill",
        }
    }

    pub fn args(&self) -> (u16, u16) {
        match *self {
            Self::Light(p) => (p as u16, 0),
            Self::Beep(p) => (p as u16, 0),
            Self::DevicePress(k) => (k as u16, k.hold_ms() as u16),
            Self::AssertKill => (0, 0),
        }
    }
}

/// Status light schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum LightPattern {
    Off,
    Solid,
    SlowBlink,
    FastBlink,
    Lockout,
    Error,
}

/// Beeper sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum BeepPattern {
    Single,
    Double,
    Triple,
    ErrorFast,
    LowBattery,
}

/// Device button gesture to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum PressKind {
    /// Start/stop recording.
    Short,
    /// Power on / power off.
    Long,
}

impl PressKind {
    pub fn hold_ms(self) -> u32 {
        match self {
            Self::Short => DEVICE_PRESS_SHORT_MS,
            Self::Long => DEVICE_PRESS_LONG_MS,
        }
    }
}
