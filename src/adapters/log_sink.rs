//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured controller events to
//! the ESP-IDF logger (UART / USB-CDC in production). Per-event receipts
//! go out at `debug` so the default `info` level only shows lifecycle.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::EventReceived(ev) => {
                let (a0, a1) = ev.id.args();
                debug!(
                    "EVENT | t={} {} ({}, {}) src={:?} why={:?}",
                    ev.timestamp_ms,
                    ev.id.name(),
                    a0,
                    a1,
                    ev.source,
                    ev.reason
                );
            }
            AppEvent::EventDiscarded { event, reason } => {
                info!("DROP  | {} discarded: {:?}", event.id.name(), reason);
            }
            AppEvent::StateChanged { from, to, at_ms } => {
                info!("STATE | {:?} -> {:?} at {} ms", from, to, at_ms);
            }
            AppEvent::FaultRaised(fault) => {
                warn!("FAULT | {}", fault);
            }
            AppEvent::ActionDropped(action) => {
                warn!("DROP  | action {} lost, queue full", action.id.name());
            }
            AppEvent::ShutdownComplete => {
                info!("POWER | shutdown complete");
            }
        }
    }
}
