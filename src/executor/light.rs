//! Status light engine.
//!
//! Each [`LightPattern`] is an on/off schedule. The engine flips the level
//! whenever the current phase deadline passes; steady patterns still
//! "toggle" on a long refresh period so they cost one comparison per poll.
//!
//! | Pattern   | On     | Off     | Looks like             |
//! |-----------|--------|---------|------------------------|
//! | Off       | -      | 1000 ms | dark                   |
//! | Solid     | 1000ms | -       | lit                    |
//! | SlowBlink | 300 ms | 700 ms  | recording heartbeat    |
//! | FastBlink | 150 ms | 150 ms  | busy / booting         |
//! | Lockout   | 50 ms  | 1950 ms | brief blip every 2 s   |
//! | Error     | 50 ms  | 50 ms   | 10 Hz flicker          |

use crate::actions::LightPattern;
use crate::clock::deadline_reached;

const REFRESH_MS: u32 = 1000;

/// `(on_ms, off_ms)`; zero means the level never takes that phase.
fn schedule(pattern: LightPattern) -> (u32, u32) {
    match pattern {
        LightPattern::Off => (0, REFRESH_MS),
        LightPattern::Solid => (REFRESH_MS, 0),
        LightPattern::SlowBlink => (300, 700),
        LightPattern::FastBlink => (150, 150),
        LightPattern::Lockout => (50, 1950),
        LightPattern::Error => (50, 50),
    }
}

pub struct LightEngine {
    pattern: LightPattern,
    lit: bool,
    next_ms: u32,
}

impl LightEngine {
    pub fn new() -> Self {
        Self {
            pattern: LightPattern::Off,
            lit: false,
            next_ms: 0,
        }
    }

    /// Switch pattern, restarting its schedule at the on phase. Requesting
    /// the running pattern again leaves its phase alone.
    pub fn set(&mut self, now_ms: u32, pattern: LightPattern) {
        if pattern == self.pattern {
            return;
        }
        self.pattern = pattern;
        let (on, off) = schedule(pattern);
        self.lit = on > 0;
        self.next_ms = now_ms.wrapping_add(if self.lit { on } else { off });
    }

    /// Advance the schedule; returns whether the light should be lit.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        if deadline_reached(now_ms, self.next_ms) {
            let (on, off) = schedule(self.pattern);
            self.lit = match (on, off) {
                (0, _) => false,
                (_, 0) => true,
                _ => !self.lit,
            };
            self.next_ms = now_ms.wrapping_add(if self.lit { on } else { off });
        }
        self.lit
    }

    pub fn pattern(&self) -> LightPattern {
        self.pattern
    }
}

impl Default for LightEngine {
    fn default() -> Self {
        Self::new()
    }
}
