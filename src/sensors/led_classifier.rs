//! Device status-LED classifier.
//!
//! Turns raw edge timings from the status-sense line into a [`Pattern`].
//! The classifier keeps its own state and is read by pull
//! ([`LedClassifier::pattern`]); it never touches the event queue.
//!
//! ## Per-edge pipeline
//!
//! 1. Glitch filter: an edge closer than [`LED_GLITCH_US`] to the previous
//!    accepted edge is rejected. Its timing is not recorded, but the level
//!    still follows it so the classifier stays in step with the line.
//! 2. The level that just ended gives the latest on- or off-duration.
//! 3. Same-phase period: time since the previous edge that produced the
//!    same level (rise-to-rise or fall-to-fall).
//! 4. The period is matched against the fast, slow, and abnormal-boot
//!    windows, with bounds on the on/off durations. Anything else is
//!    inconclusive and breaks the streak.
//! 5. [`LED_HYSTERESIS_COUNT`] consecutive matches of one band publish it.
//!
//! ## Quiet rule
//!
//! Every poll, if no edge has been accepted for [`LED_SOLID_MS`], the held
//! level alone decides `Solid` or `Off`. A published blink holds the rule
//! off for one extra worst-case period of its band so a pause mid-cycle
//! is not mistaken for a steady light.
//!
//! The hold-off is the published band's own maximum period, not the
//! largest across bands: a gap longer than that no longer fits the band.

use serde::Serialize;

use super::edge_ring::{Edge, EdgeRing};
use crate::clock::{Tick, elapsed_ms};
use crate::config::{
    LED_ABN_OFF_MIN_MS, LED_ABN_PERIOD_MAX_MS, LED_ABN_PERIOD_MIN_MS, LED_FAST_EDGE_MAX_MS,
    LED_FAST_EDGE_MIN_MS, LED_FAST_PERIOD_MAX_MS, LED_FAST_PERIOD_MIN_MS, LED_GLITCH_US,
    LED_HYSTERESIS_COUNT, LED_SLOW_EDGE_MAX_MS, LED_SLOW_EDGE_MIN_MS, LED_SLOW_PERIOD_MAX_MS,
    LED_SLOW_PERIOD_MIN_MS, LED_SOLID_MS,
};

/// Semantic reading of the device status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum Pattern {
    #[default]
    Unknown,
    Off,
    Solid,
    SlowBlink,
    FastBlink,
    AbnormalBoot,
}

impl Pattern {
    pub fn is_blink(self) -> bool {
        matches!(self, Self::SlowBlink | Self::FastBlink | Self::AbnormalBoot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Fast,
    Slow,
    Abnormal,
}

impl Band {
    fn pattern(self) -> Pattern {
        match self {
            Self::Fast => Pattern::FastBlink,
            Self::Slow => Pattern::SlowBlink,
            Self::Abnormal => Pattern::AbnormalBoot,
        }
    }

    fn max_period_ms(self) -> u32 {
        match self {
            Self::Fast => LED_FAST_PERIOD_MAX_MS,
            Self::Slow => LED_SLOW_PERIOD_MAX_MS,
            Self::Abnormal => LED_ABN_PERIOD_MAX_MS,
        }
    }

    /// Match a same-phase period plus the latest on/off durations.
    fn classify(period: u32, on: u32, off: u32) -> Option<Self> {
        let fast_edges = LED_FAST_EDGE_MIN_MS..=LED_FAST_EDGE_MAX_MS;
        let slow_edges = LED_SLOW_EDGE_MIN_MS..=LED_SLOW_EDGE_MAX_MS;

        if (LED_FAST_PERIOD_MIN_MS..=LED_FAST_PERIOD_MAX_MS).contains(&period) {
            return (fast_edges.contains(&on) && fast_edges.contains(&off)).then_some(Self::Fast);
        }
        if (LED_SLOW_PERIOD_MIN_MS..=LED_SLOW_PERIOD_MAX_MS).contains(&period) {
            return (slow_edges.contains(&on) && slow_edges.contains(&off)).then_some(Self::Slow);
        }
        if (LED_ABN_PERIOD_MIN_MS..=LED_ABN_PERIOD_MAX_MS).contains(&period) {
            return (off >= LED_ABN_OFF_MIN_MS).then_some(Self::Abnormal);
        }
        None
    }
}

pub struct LedClassifier {
    /// Last accepted level, `true` = LED lit.
    lit: bool,
    started_us: u32,
    last_edge_us: Option<u32>,
    /// Last accepted edge into each level, indexed by `lit as usize`.
    last_into_us: [Option<u32>; 2],
    last_on_ms: Option<u32>,
    last_off_ms: Option<u32>,
    last_period_ms: Option<u32>,

    candidate: Option<Band>,
    streak: u8,

    pattern: Pattern,
    /// Band of the currently published blink, if any.
    sticky: Option<Band>,
    /// Quiet rule has fired since the last accepted edge.
    settled: bool,
    last_change_ms: u32,
    rejected: u16,
}

impl LedClassifier {
    /// `lit` is the LED level sampled at start-up.
    pub fn new(now: Tick, lit: bool) -> Self {
        Self {
            lit,
            started_us: now.us,
            last_edge_us: None,
            last_into_us: [None; 2],
            last_on_ms: None,
            last_off_ms: None,
            last_period_ms: None,
            candidate: None,
            streak: 0,
            pattern: Pattern::Unknown,
            sticky: None,
            settled: false,
            last_change_ms: now.ms,
            rejected: 0,
        }
    }

    /// Drain pending edges, then apply the quiet rule against `lit_now`.
    pub fn poll<const N: usize>(&mut self, now: Tick, lit_now: bool, edges: &EdgeRing<N>) -> Pattern {
        while let Some(edge) = edges.pop() {
            self.on_edge(now.ms, edge);
        }
        self.apply_quiet_rule(now, lit_now);
        self.pattern
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// When the published pattern last changed.
    pub fn last_change_ms(&self) -> u32 {
        self.last_change_ms
    }

    pub fn last_on_ms(&self) -> Option<u32> {
        self.last_on_ms
    }

    pub fn last_off_ms(&self) -> Option<u32> {
        self.last_off_ms
    }

    pub fn last_period_ms(&self) -> Option<u32> {
        self.last_period_ms
    }

    /// Edges thrown away by the glitch filter.
    pub fn edges_rejected(&self) -> u16 {
        self.rejected
    }

    // ── Internal ──────────────────────────────────────────────

    fn on_edge(&mut self, now_ms: u32, edge: Edge) {
        if edge.level_after == self.lit {
            return;
        }

        if let Some(prev) = self.last_edge_us {
            if edge.timestamp_us.wrapping_sub(prev) < LED_GLITCH_US {
                self.rejected = self.rejected.saturating_add(1);
                self.lit = edge.level_after;
                return;
            }
            let ended_ms = elapsed_ms(prev, edge.timestamp_us);
            if self.lit {
                self.last_on_ms = Some(ended_ms);
            } else {
                self.last_off_ms = Some(ended_ms);
            }
        }

        let phase = edge.level_after as usize;
        let period = self.last_into_us[phase].map(|t| elapsed_ms(t, edge.timestamp_us));
        self.last_into_us[phase] = Some(edge.timestamp_us);
        self.last_edge_us = Some(edge.timestamp_us);
        self.lit = edge.level_after;
        self.settled = false;

        let (Some(period), Some(on), Some(off)) = (period, self.last_on_ms, self.last_off_ms) else {
            return;
        };
        self.last_period_ms = Some(period);

        match Band::classify(period, on, off) {
            Some(band) if self.candidate == Some(band) => {
                self.streak = self.streak.saturating_add(1);
            }
            Some(band) => {
                self.candidate = Some(band);
                self.streak = 1;
            }
            None => {
                self.candidate = None;
                self.streak = 0;
                return;
            }
        }

        if self.streak >= LED_HYSTERESIS_COUNT {
            if let Some(band) = self.candidate {
                self.sticky = Some(band);
                self.publish(now_ms, band.pattern());
            }
        }
    }

    fn apply_quiet_rule(&mut self, now: Tick, lit_now: bool) {
        if !self.settled {
            let since = self.last_edge_us.unwrap_or(self.started_us);
            let hold_off = self.sticky.map_or(0, Band::max_period_ms);
            if elapsed_ms(since, now.us) < LED_SOLID_MS + hold_off {
                return;
            }
            self.settled = true;
            self.sticky = None;
            self.candidate = None;
            self.streak = 0;
        }
        let steady = if lit_now { Pattern::Solid } else { Pattern::Off };
        self.publish(now.ms, steady);
    }

    fn publish(&mut self, now_ms: u32, pattern: Pattern) {
        if pattern != self.pattern {
            log::debug!("led: {:?} -> {:?}", self.pattern, pattern);
            self.pattern = pattern;
            self.last_change_ms = now_ms;
        }
    }
}
