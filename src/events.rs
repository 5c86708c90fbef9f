//! Controller input events.
//!
//! Events are produced by:
//! - the button decoder (user gestures)
//! - the status interpreter (device lifecycle inferred from its LED)
//! - the battery monitor (charge level and lockout)
//!
//! and consumed by exactly one stage, the controller, through the
//! [`EventQueue`](crate::queue::EventQueue).
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ ButtonDecoder    │────▶│              │     │              │
//! │ StatusInterpreter│────▶│  EventQueue  │────▶│  Controller  │
//! │ BatteryMonitor   │────▶│  (drop-new)  │     │  (consumer)  │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```

use serde::Serialize;

use crate::error::FaultCode;
use crate::sensors::battery::BatteryState;
use crate::sensors::led_classifier::Pattern;

/// One controller input. Fixed size, `Copy`, no heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp_ms: u32,
    pub id: EventId,
    /// Audit only; nothing switches on it.
    pub source: Source,
    /// Audit only; nothing switches on it.
    pub reason: Reason,
}

impl Event {
    pub fn new(timestamp_ms: u32, id: EventId, source: Source, reason: Reason) -> Self {
        Self {
            timestamp_ms,
            id,
            source,
            reason,
        }
    }

    pub fn is_gesture(&self) -> bool {
        matches!(self.id, EventId::ShortPress { .. } | EventId::LongPress { .. })
    }
}

/// What happened, with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventId {
    // ── User input ────────────────────────────────────────
    ShortPress { held_ms: u16 },
    /// Emitted either on release or while still held (grace).
    LongPress { held_ms: u16 },

    // ── Battery ───────────────────────────────────────────
    BatteryStateChanged { state: BatteryState, millivolts: u16 },
    LockoutEnter { millivolts: u16 },
    LockoutExit { millivolts: u16 },

    // ── Device lifecycle ──────────────────────────────────
    PoweredOnIdle,
    RecordStarted,
    RecordStopped,
    PoweredOff,
    DeviceError { fault: FaultCode, pattern: Pattern },
}

impl EventId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShortPress { .. } => "ShortPress",
            Self::LongPress { .. } => "LongPress",
            Self::BatteryStateChanged { .. } => "BatteryStateChanged",
            Self::LockoutEnter { .. } => "LockoutEnter",
            Self::LockoutExit { .. } => "LockoutExit",
            Self::PoweredOnIdle => "PoweredOnIdle",
            Self::RecordStarted => "RecordStarted",
            Self::RecordStopped => "RecordStopped",
            Self::PoweredOff => "PoweredOff",
            Self::DeviceError { .. } => "DeviceError",
        }
    }

    /// Payload packed into two words for the trace buffer.
    pub fn args(&self) -> (u16, u16) {
        match *self {
            Self::ShortPress { held_ms } | Self::LongPress { held_ms } => (held_ms, 0),
            Self::BatteryStateChanged { state, millivolts } => (state as u16, millivolts),
            Self::LockoutEnter { millivolts } | Self::LockoutExit { millivolts } => {
                (0, millivolts)
            }
            Self::DeviceError { fault, pattern } => (fault as u16, pattern as u16),
            Self::PoweredOnIdle | Self::RecordStarted | Self::RecordStopped | Self::PoweredOff => {
                (0, 0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    Button,
    DeviceLed,
    DeviceStatus,
    Battery,
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reason {
    EdgeRise,
    EdgeFall,
    Timeout,
    ClassifierStable,
    SamplePeriodic,
    Hysteresis,
    Internal,
}
