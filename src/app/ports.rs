//! Port traits: the boundary between the controller and the outside world.
//!
//! ```text
//!   ControllerService ──▶ EventSink ──▶ LogEventSink / TraceRecorder
//! ```
//!
//! The controller never logs its audit stream directly; adapters implement
//! [`EventSink`] and the service takes them via generics, so tests can
//! capture every event with a recording mock.

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → outside world)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

/// Fan one stream out to two sinks, e.g. the serial log and the trace.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}
