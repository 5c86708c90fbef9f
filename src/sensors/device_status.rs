//! Device status interpreter.
//!
//! Pulls the classifier's current [`Pattern`] once per tick and turns
//! *transitions* into lifecycle events on the event queue:
//!
//! | Transition                         | Event                          |
//! |------------------------------------|--------------------------------|
//! | into `SlowBlink` (not latched)     | `RecordStarted`                |
//! | `SlowBlink` → `Solid` / `Off`      | `RecordStopped`                |
//! | into `Solid`                       | `PoweredOnIdle`                |
//! | into `Off`                         | `PoweredOff`                   |
//! | into `AbnormalBoot`                | `DeviceError(AbnormalBoot…)`   |
//! | `FastBlink` held past the window   | `DeviceError(DeviceCardFault)` |
//!
//! The device shows a fast blink both for a missing/full card and briefly
//! while shutting down, so only persistence past [`BOOT_TIMEOUT_MS`]
//! counts as a fault, and only once per fast-blink episode.

use log::{debug, warn};

use super::led_classifier::Pattern;
use crate::clock::deadline_reached;
use crate::config::BOOT_TIMEOUT_MS;
use crate::error::FaultCode;
use crate::events::{Event, EventId, Reason, Source};
use crate::queue::EventQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultTimer {
    Disarmed,
    Armed { deadline_ms: u32, fired: bool },
}

pub struct StatusInterpreter {
    last: Pattern,
    recording: bool,
    fault: FaultTimer,
}

impl StatusInterpreter {
    pub fn new() -> Self {
        Self {
            last: Pattern::Unknown,
            recording: false,
            fault: FaultTimer::Disarmed,
        }
    }

    /// Compare `pattern` with the last observed one and push any events.
    pub fn poll(&mut self, now_ms: u32, pattern: Pattern, events: &EventQueue) {
        if pattern != self.last {
            let prev = self.last;
            self.last = pattern;
            self.on_transition(now_ms, prev, pattern, events);
        }

        if let FaultTimer::Armed { deadline_ms, fired } = &mut self.fault {
            if !*fired && pattern == Pattern::FastBlink && deadline_reached(now_ms, *deadline_ms) {
                *fired = true;
                warn!("device: fast blink persisted, reporting card fault");
                emit(
                    events,
                    now_ms,
                    EventId::DeviceError {
                        fault: FaultCode::DeviceCardFault,
                        pattern,
                    },
                    Reason::Timeout,
                );
            }
        }
    }

    /// Latched "device is recording" view.
    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn fault_armed(&self) -> bool {
        matches!(self.fault, FaultTimer::Armed { .. })
    }

    fn on_transition(&mut self, now_ms: u32, prev: Pattern, next: Pattern, events: &EventQueue) {
        debug!("device: {:?} -> {:?}", prev, next);

        if next != Pattern::FastBlink {
            self.fault = FaultTimer::Disarmed;
        }

        match next {
            Pattern::SlowBlink => {
                if !self.recording {
                    self.recording = true;
                    emit(events, now_ms, EventId::RecordStarted, Reason::ClassifierStable);
                }
            }
            Pattern::Solid | Pattern::Off => {
                if prev == Pattern::SlowBlink {
                    emit(events, now_ms, EventId::RecordStopped, Reason::ClassifierStable);
                }
                self.recording = false;
                let id = if next == Pattern::Solid {
                    EventId::PoweredOnIdle
                } else {
                    EventId::PoweredOff
                };
                emit(events, now_ms, id, Reason::ClassifierStable);
            }
            Pattern::FastBlink => {
                if self.fault == FaultTimer::Disarmed {
                    self.fault = FaultTimer::Armed {
                        deadline_ms: now_ms.wrapping_add(BOOT_TIMEOUT_MS),
                        fired: false,
                    };
                }
            }
            Pattern::AbnormalBoot => emit(
                events,
                now_ms,
                EventId::DeviceError {
                    fault: FaultCode::AbnormalBootSignature,
                    pattern: next,
                },
                Reason::ClassifierStable,
            ),
            Pattern::Unknown => {}
        }
    }
}

impl Default for StatusInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(events: &EventQueue, now_ms: u32, id: EventId, reason: Reason) {
    if !events.push(Event::new(now_ms, id, Source::DeviceStatus, reason)) {
        warn!("device: event queue full, dropped {}", id.name());
    }
}
