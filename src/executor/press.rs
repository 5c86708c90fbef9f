//! Device button emulation: assert → hold → release, then a guard gap.

use log::debug;

use crate::actions::PressKind;
use crate::clock::deadline_reached;
use crate::config::DEVICE_PRESS_GUARD_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Holding { kind: PressKind, release_ms: u32 },
    Guard { until_ms: u32 },
}

pub struct PressEngine {
    phase: Phase,
    completed: u32,
}

impl PressEngine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            completed: 0,
        }
    }

    /// Begin a press if the engine is idle. Returns `false` while a press
    /// is held or the guard gap is still running.
    pub fn try_start(&mut self, now_ms: u32, kind: PressKind) -> bool {
        self.advance(now_ms);
        if self.phase != Phase::Idle {
            return false;
        }
        debug!("press: {:?} for {} ms", kind, kind.hold_ms());
        self.phase = Phase::Holding {
            kind,
            release_ms: now_ms.wrapping_add(kind.hold_ms()),
        };
        true
    }

    /// Advance the waveform; returns whether the contact should be closed.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        self.advance(now_ms);
        matches!(self.phase, Phase::Holding { .. })
    }

    /// A press is held or its guard gap is running.
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn holding(&self) -> Option<PressKind> {
        match self.phase {
            Phase::Holding { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Presses released so far.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    fn advance(&mut self, now_ms: u32) {
        match self.phase {
            Phase::Holding { release_ms, .. } if deadline_reached(now_ms, release_ms) => {
                self.completed = self.completed.wrapping_add(1);
                self.phase = Phase::Guard {
                    until_ms: now_ms.wrapping_add(DEVICE_PRESS_GUARD_MS),
                };
            }
            Phase::Guard { until_ms } if deadline_reached(now_ms, until_ms) => {
                self.phase = Phase::Idle;
            }
            _ => {}
        }
    }
}

impl Default for PressEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEVICE_PRESS_LONG_MS, DEVICE_PRESS_SHORT_MS};

    #[test]
    fn short_press_waveform() {
        let mut p = PressEngine::new();
        assert!(p.try_start(100, PressKind::Short));
        assert!(p.tick(100));
        assert!(p.tick(100 + DEVICE_PRESS_SHORT_MS - 1));
        assert!(!p.tick(100 + DEVICE_PRESS_SHORT_MS));
        assert_eq!(p.completed(), 1);
    }

    #[test]
    fn long_press_holds_longer() {
        let mut p = PressEngine::new();
        p.try_start(0, PressKind::Long);
        assert!(p.tick(DEVICE_PRESS_LONG_MS - 1));
        assert_eq!(p.holding(), Some(PressKind::Long));
        assert!(!p.tick(DEVICE_PRESS_LONG_MS));
    }

    #[test]
    fn guard_gap_rejects_new_press() {
        let mut p = PressEngine::new();
        p.try_start(0, PressKind::Short);
        p.tick(DEVICE_PRESS_SHORT_MS);
        assert!(!p.try_start(DEVICE_PRESS_SHORT_MS + 1, PressKind::Short));
        assert!(p.is_busy());
        assert!(p.try_start(DEVICE_PRESS_SHORT_MS + DEVICE_PRESS_GUARD_MS, PressKind::Long));
    }

    #[test]
    fn busy_while_holding() {
        let mut p = PressEngine::new();
        p.try_start(0, PressKind::Long);
        assert!(!p.try_start(10, PressKind::Short));
    }
}
