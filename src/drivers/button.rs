//! User button decoder: debounce plus short/long gesture classification.
//!
//! ## Hardware
//!
//! The button is routed through the power-path supervisor, whose
//! interrupt output is active-low. The GPIO ISR pushes every level change
//! (already converted to "pressed" polarity) into an [`EdgeRing`]; `poll()`,
//! called from the main loop, runs the gesture state machine.
//!
//! ## Gestures
//!
//! | Gesture     | Condition                                   | Event        |
//! |-------------|---------------------------------------------|--------------|
//! | Bounce      | edge < 35 ms after the last accepted edge   | -            |
//! | Tap         | released after < 50 ms                      | -            |
//! | Short press | released after 50 .. 500 ms                 | `ShortPress` |
//! | Long press  | held 500 ms (emitted while still held)      | `LongPress`  |
//!
//! A long press fires once per press, at the grace point, so the user
//! gets feedback without having to let go.
//!
//! A bounced edge is not forgotten: the level it left behind is kept as
//! pending and committed, at its own timestamp, once the debounce window
//! after the last accepted edge has passed. A release inside the window
//! therefore still ends the hold, as a tap.

use log::{debug, info, warn};

use crate::clock::{Tick, elapsed_ms};
use crate::config::{BTN_DEBOUNCE_MS, BTN_GRACE_MS, BTN_NUCLEAR_MS, BTN_SHORT_MIN_MS};
use crate::events::{Event, EventId, Reason, Source};
use crate::queue::EventQueue;
use crate::sensors::edge_ring::{Edge, EdgeRing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Released,
    Held {
        since_us: u32,
        long_sent: bool,
        nuclear_logged: bool,
    },
}

pub struct ButtonDecoder {
    state: GestureState,
    last_edge_us: Option<u32>,
    /// Latest edge rejected by the debounce window.
    pending: Option<Edge>,
    bounces: u16,
}

impl ButtonDecoder {
    pub fn new() -> Self {
        Self {
            state: GestureState::Released,
            last_edge_us: None,
            pending: None,
            bounces: 0,
        }
    }

    /// Consume pending edges and check the hold timer.
    pub fn poll<const N: usize>(&mut self, now: Tick, edges: &EdgeRing<N>, events: &EventQueue) {
        while let Some(edge) = edges.pop() {
            self.settle(edge.timestamp_us, now.ms, events);
            match self.last_edge_us {
                Some(prev) if edge.timestamp_us.wrapping_sub(prev) < BTN_DEBOUNCE_MS * 1000 => {
                    self.bounces = self.bounces.saturating_add(1);
                    self.pending = Some(edge);
                }
                _ => self.accept(now.ms, edge, events),
            }
        }
        self.settle(now.us, now.ms, events);

        if let GestureState::Held {
            since_us,
            long_sent,
            nuclear_logged,
        } = &mut self.state
        {
            let held = elapsed_ms(*since_us, now.us);
            if !*long_sent && held >= BTN_GRACE_MS {
                *long_sent = true;
                emit(events, now.ms, EventId::LongPress { held_ms: clamp(held) }, Reason::Timeout);
            }
            if !*nuclear_logged && held >= BTN_NUCLEAR_MS {
                *nuclear_logged = true;
                info!("button: held {} ms, power-path override range", held);
            }
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, GestureState::Held { .. })
    }

    /// Edges that landed inside the debounce window.
    pub fn bounces(&self) -> u16 {
        self.bounces
    }

    /// Commit the pending level once `at_us` is past the debounce window.
    fn settle(&mut self, at_us: u32, now_ms: u32, events: &EventQueue) {
        let (Some(edge), Some(prev)) = (self.pending, self.last_edge_us) else {
            return;
        };
        if at_us.wrapping_sub(prev) >= BTN_DEBOUNCE_MS * 1000 {
            self.pending = None;
            self.accept(now_ms, edge, events);
        }
    }

    fn accept(&mut self, now_ms: u32, edge: Edge, events: &EventQueue) {
        self.last_edge_us = Some(edge.timestamp_us);
        match (self.state, edge.level_after) {
            (GestureState::Released, true) => {
                self.state = GestureState::Held {
                    since_us: edge.timestamp_us,
                    long_sent: false,
                    nuclear_logged: false,
                };
            }
            (GestureState::Held { since_us, long_sent, .. }, false) => {
                self.state = GestureState::Released;
                let held = elapsed_ms(since_us, edge.timestamp_us);
                self.on_release(now_ms, held, long_sent, events);
            }
            // Same level twice: a bounce settled back where it started.
            _ => {}
        }
    }

    fn on_release(&mut self, now_ms: u32, held: u32, long_sent: bool, events: &EventQueue) {
        if held < BTN_SHORT_MIN_MS {
            debug!("button: {} ms tap ignored", held);
        } else if held < BTN_GRACE_MS {
            emit(events, now_ms, EventId::ShortPress { held_ms: clamp(held) }, Reason::EdgeFall);
        } else if !long_sent {
            emit(events, now_ms, EventId::LongPress { held_ms: clamp(held) }, Reason::EdgeFall);
        }
    }
}

impl Default for ButtonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp(ms: u32) -> u16 {
    ms.min(u32::from(u16::MAX)) as u16
}

fn emit(events: &EventQueue, now_ms: u32, id: EventId, reason: Reason) {
    if !events.push(Event::new(now_ms, id, Source::Button, reason)) {
        warn!("button: event queue full, dropped {}", id.name());
    }
}
