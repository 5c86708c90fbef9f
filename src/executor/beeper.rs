//! Beeper engine: one-shot N-beep sequences.
//!
//! ```text
//!   start ─▶ On ─▶ Gap ─▶ On ─▶ … ─▶ On ─▶ FinalGap ─▶ Idle
//! ```
//!
//! A new request always preempts whatever is playing.

use log::debug;

use crate::actions::BeepPattern;
use crate::clock::deadline_reached;
use crate::config::{BEEP_ERROR_ON_MS, BEEP_FINAL_GAP_MS, BEEP_GAP_MS, BEEP_LOW_BATTERY_ON_MS, BEEP_ON_MS};

/// `(beeps, on_ms)` for each sequence.
fn shape(pattern: BeepPattern) -> (u8, u32) {
    match pattern {
        BeepPattern::Single => (1, BEEP_ON_MS),
        BeepPattern::Double => (2, BEEP_ON_MS),
        BeepPattern::Triple => (3, BEEP_ON_MS),
        BeepPattern::ErrorFast => (4, BEEP_ERROR_ON_MS),
        BeepPattern::LowBattery => (2, BEEP_LOW_BATTERY_ON_MS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    On { until_ms: u32 },
    Gap { until_ms: u32 },
}

pub struct Beeper {
    phase: Phase,
    remaining: u8,
    on_ms: u32,
}

impl Beeper {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            remaining: 0,
            on_ms: 0,
        }
    }

    pub fn start(&mut self, now_ms: u32, pattern: BeepPattern) {
        if self.phase != Phase::Idle {
            debug!("beeper: {:?} preempts running sequence", pattern);
        }
        let (beeps, on_ms) = shape(pattern);
        self.remaining = beeps;
        self.on_ms = on_ms;
        self.phase = Phase::On {
            until_ms: now_ms.wrapping_add(on_ms),
        };
    }

    /// Advance the sequence; returns whether the buzzer should sound.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        match self.phase {
            Phase::On { until_ms } if deadline_reached(now_ms, until_ms) => {
                self.remaining = self.remaining.saturating_sub(1);
                let gap = if self.remaining == 0 {
                    BEEP_FINAL_GAP_MS
                } else {
                    BEEP_GAP_MS
                };
                self.phase = Phase::Gap {
                    until_ms: now_ms.wrapping_add(gap),
                };
            }
            Phase::Gap { until_ms } if deadline_reached(now_ms, until_ms) => {
                self.phase = if self.remaining > 0 {
                    Phase::On {
                        until_ms: now_ms.wrapping_add(self.on_ms),
                    }
                } else {
                    Phase::Idle
                };
            }
            _ => {}
        }
        matches!(self.phase, Phase::On { .. })
    }

    /// A sequence is playing (including its trailing silence).
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }
}

impl Default for Beeper {
    fn default() -> Self {
        Self::new()
    }
}
