//! Runtime diagnostics.
//!
//! [`TraceRecorder`] is an [`EventSink`] that keeps the most recent
//! controller events in a fixed ring, so the last few seconds before a
//! fault can be dumped without a heap. [`DiagnosticsSnapshot`] gathers
//! the counters every stage keeps and renders them as JSON for the
//! periodic serial dump.

use heapless::{HistoryBuffer, Vec};
use serde::Serialize;

use crate::actions::LightPattern;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::TRACE_DEPTH;
use crate::error::FaultCode;
use crate::fsm::StateId;
use crate::sensors::battery::BatteryState;
use crate::sensors::led_classifier::Pattern;

/// One trace line. Payloads are packed into two words like the queues do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub at_ms: u32,
    pub kind: &'static str,
    pub what: &'static str,
    pub arg0: u16,
    pub arg1: u16,
}

impl TraceEntry {
    fn from_event(at_ms: u32, event: &AppEvent) -> Self {
        let (kind, what, arg0, arg1) = match *event {
            AppEvent::Started(state) => ("start", "", state as u16, 0),
            AppEvent::EventReceived(ev) => {
                let (a, b) = ev.id.args();
                ("event", ev.id.name(), a, b)
            }
            AppEvent::EventDiscarded { event, reason } => {
                ("discard", event.id.name(), reason as u16, 0)
            }
            AppEvent::StateChanged { from, to, .. } => ("state", "", from as u16, to as u16),
            AppEvent::FaultRaised(fault) => ("fault", "", fault as u16, 0),
            AppEvent::ActionDropped(action) => {
                let (a, b) = action.id.args();
                ("action-drop", action.id.name(), a, b)
            }
            AppEvent::ShutdownComplete => ("shutdown", "", 0, 0),
        };
        Self {
            at_ms,
            kind,
            what,
            arg0,
            arg1,
        }
    }
}

/// Keeps the last [`TRACE_DEPTH`] controller events.
pub struct TraceRecorder {
    buf: HistoryBuffer<TraceEntry, TRACE_DEPTH>,
    last_ms: u32,
    total: u32,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self {
            buf: HistoryBuffer::new(),
            last_ms: 0,
            total: 0,
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<TraceEntry, TRACE_DEPTH> {
        self.buf.oldest_ordered().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    /// Entries ever recorded, including overwritten ones.
    pub fn total(&self) -> u32 {
        self.total
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TraceRecorder {
    fn emit(&mut self, event: &AppEvent) {
        // Only some events carry a time; the rest inherit the last one seen.
        match *event {
            AppEvent::EventReceived(ev) | AppEvent::EventDiscarded { event: ev, .. } => {
                self.last_ms = ev.timestamp_ms;
            }
            AppEvent::StateChanged { at_ms, .. } => self.last_ms = at_ms,
            AppEvent::ActionDropped(action) => self.last_ms = action.enqueued_ms,
            _ => {}
        }
        self.buf.write(TraceEntry::from_event(self.last_ms, event));
        self.total = self.total.wrapping_add(1);
    }
}

/// Everything worth knowing about a running controller, at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    pub uptime_ms: u32,
    pub state: StateId,
    pub battery: BatteryState,
    pub millivolts: u16,
    pub lockout: bool,
    pub last_fault: Option<FaultCode>,
    pub shutdown_pending: bool,
    pub pattern: Pattern,
    pub recording: bool,
    pub light: LightPattern,
    pub killed: bool,
    pub events_dropped: u16,
    pub actions_dropped: u16,
    pub actions_requeued: u32,
    pub led_edge_overflows: u16,
    pub button_edge_overflows: u16,
    pub led_edges_rejected: u16,
    pub button_bounces: u16,
    pub events_handled: u32,
    pub events_discarded: u32,
    pub transitions: u32,
    pub trace: Vec<TraceEntry, TRACE_DEPTH>,
}

impl DiagnosticsSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventId, Reason, Source};

    fn received(t: u32) -> AppEvent {
        AppEvent::EventReceived(Event::new(
            t,
            EventId::ShortPress { held_ms: 120 },
            Source::Button,
            Reason::EdgeFall,
        ))
    }

    #[test]
    fn trace_keeps_most_recent() {
        let mut trace = TraceRecorder::new();
        for t in 0..(TRACE_DEPTH as u32 + 5) {
            trace.emit(&received(t));
        }
        let entries = trace.entries();
        assert_eq!(entries.len(), TRACE_DEPTH);
        assert_eq!(entries[0].at_ms, 5);
        assert_eq!(entries[TRACE_DEPTH - 1].at_ms, TRACE_DEPTH as u32 + 4);
        assert_eq!(trace.total(), TRACE_DEPTH as u32 + 5);
    }

    #[test]
    fn untimed_events_inherit_last_time() {
        let mut trace = TraceRecorder::new();
        trace.emit(&received(42));
        trace.emit(&AppEvent::FaultRaised(FaultCode::BootTimeout));
        let entries = trace.entries();
        assert_eq!(entries[1].at_ms, 42);
        assert_eq!(entries[1].kind, "fault");
        assert_eq!(entries[1].arg0, FaultCode::BootTimeout as u16);
    }

    #[test]
    fn snapshot_renders_json() {
        let mut trace = TraceRecorder::new();
        trace.emit(&AppEvent::StateChanged {
            from: StateId::Off,
            to: StateId::Booting,
            at_ms: 7,
        });
        let snap = DiagnosticsSnapshot {
            uptime_ms: 1000,
            state: StateId::Booting,
            battery: BatteryState::Full,
            millivolts: 8300,
            lockout: false,
            last_fault: None,
            shutdown_pending: false,
            pattern: Pattern::FastBlink,
            recording: false,
            light: LightPattern::FastBlink,
            killed: false,
            events_dropped: 0,
            actions_dropped: 0,
            actions_requeued: 0,
            led_edge_overflows: 0,
            button_edge_overflows: 0,
            led_edges_rejected: 0,
            button_bounces: 0,
            events_handled: 1,
            events_discarded: 0,
            transitions: 1,
            trace: trace.entries(),
        };
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"state\":\"Booting\""));
        assert!(json.contains("\"last_fault\":null"));
        assert!(json.contains("\"kind\":\"state\""));
    }
}
