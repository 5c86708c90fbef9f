//! Battery monitor.
//!
//! Samples the pack voltage on a fixed cadence and reports charge level
//! and deep-discharge lockout as events. Both outputs need
//! [`BAT_STABLE_SAMPLES`] consecutive agreeing samples before they
//! change, so a single sag under load never escalates.
//!
//! ```text
//!  mV ≥ FULL ─ Full
//!  mV ≥ HALF ─ Half
//!  mV ≥ CRIT ─ Low          (Critical stays Critical until mV ≥ LOW)
//!  mV < CRIT ─ Critical
//!
//!  lockout:  enter at mV ≤ LOCKOUT_ENTER, leave at mV ≥ LOCKOUT_EXIT
//! ```

use log::{info, warn};
use serde::Serialize;

use crate::clock::deadline_reached;
use crate::config::{
    BAT_CRITICAL_MV, BAT_FULL_MV, BAT_HALF_MV, BAT_LOCKOUT_ENTER_MV, BAT_LOCKOUT_EXIT_MV,
    BAT_LOW_MV, BAT_STABLE_SAMPLES, BATTERY_SAMPLE_MS, ENFORCE_BATTERY_LOCKOUT,
};
use crate::events::{Event, EventId, Reason, Source};
use crate::queue::EventQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum BatteryState {
    #[default]
    Unknown,
    Full,
    Half,
    Low,
    Critical,
}

/// A value that only changes after N consecutive agreeing samples.
#[derive(Debug, Clone, Copy)]
struct Debounced<T> {
    stable: T,
    candidate: T,
    count: u8,
}

impl<T: Copy + PartialEq> Debounced<T> {
    fn new(initial: T) -> Self {
        Self {
            stable: initial,
            candidate: initial,
            count: 0,
        }
    }

    /// Feed one sample; returns the new stable value when it changes.
    fn feed(&mut self, sample: T) -> Option<T> {
        if sample == self.stable {
            self.count = 0;
            self.candidate = sample;
            return None;
        }
        if sample == self.candidate {
            self.count = self.count.saturating_add(1);
        } else {
            self.candidate = sample;
            self.count = 1;
        }
        if self.count >= BAT_STABLE_SAMPLES {
            self.stable = sample;
            self.count = 0;
            return Some(sample);
        }
        None
    }
}

pub struct BatteryMonitor {
    next_sample_ms: Option<u32>,
    state: Debounced<BatteryState>,
    lockout: Debounced<bool>,
    last_mv: u16,
}

impl BatteryMonitor {
    pub fn new() -> Self {
        Self {
            next_sample_ms: None,
            state: Debounced::new(BatteryState::Unknown),
            lockout: Debounced::new(false),
            last_mv: 0,
        }
    }

    /// Classify one sample if the cadence is due. `read_mv` is only called
    /// when a sample is actually taken.
    pub fn poll(&mut self, now_ms: u32, read_mv: impl FnOnce() -> u16, events: &EventQueue) {
        if let Some(due) = self.next_sample_ms {
            if !deadline_reached(now_ms, due) {
                return;
            }
        }
        self.next_sample_ms = Some(now_ms.wrapping_add(BATTERY_SAMPLE_MS));
        self.sample(now_ms, read_mv(), events);
    }

    pub fn state(&self) -> BatteryState {
        self.state.stable
    }

    pub fn lockout_active(&self) -> bool {
        self.lockout.stable
    }

    pub fn last_millivolts(&self) -> u16 {
        self.last_mv
    }

    /// Lockout goes first so a sample that crosses both thresholds reaches
    /// the controller as `LockoutEnter` before `Critical`.
    fn sample(&mut self, now_ms: u32, mv: u16, events: &EventQueue) {
        self.last_mv = mv;
        if ENFORCE_BATTERY_LOCKOUT {
            self.update_lockout(now_ms, mv, events);
        }

        let class = classify(self.state.stable, mv);
        if let Some(state) = self.state.feed(class) {
            info!("battery: {:?} at {} mV", state, mv);
            push(
                events,
                now_ms,
                EventId::BatteryStateChanged {
                    state,
                    millivolts: mv,
                },
                Reason::SamplePeriodic,
            );
        }
    }

    fn update_lockout(&mut self, now_ms: u32, mv: u16, events: &EventQueue) {
        let want = if self.lockout.stable {
            mv < BAT_LOCKOUT_EXIT_MV
        } else {
            mv <= BAT_LOCKOUT_ENTER_MV
        };
        if let Some(locked) = self.lockout.feed(want) {
            let id = if locked {
                warn!("battery: lockout at {} mV", mv);
                EventId::LockoutEnter { millivolts: mv }
            } else {
                info!("battery: lockout released at {} mV", mv);
                EventId::LockoutExit { millivolts: mv }
            };
            push(events, now_ms, id, Reason::Hysteresis);
        }
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(current: BatteryState, mv: u16) -> BatteryState {
    if mv >= BAT_FULL_MV {
        BatteryState::Full
    } else if mv >= BAT_HALF_MV {
        BatteryState::Half
    } else if current == BatteryState::Critical && mv < BAT_LOW_MV {
        BatteryState::Critical
    } else if mv >= BAT_CRITICAL_MV {
        BatteryState::Low
    } else {
        BatteryState::Critical
    }
}

fn push(events: &EventQueue, now_ms: u32, id: EventId, reason: Reason) {
    if !events.push(Event::new(now_ms, id, Source::Battery, reason)) {
        warn!("battery: event queue full, dropped {}", id.name());
    }
}
