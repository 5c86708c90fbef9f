//! The whole controller as one owned value.
//!
//! ```text
//!  LED edges ──▶ LedClassifier ──▶ StatusInterpreter ─┐
//!  Button edges ──▶ ButtonDecoder ─────────────────────┼──▶ EventQueue
//!  Battery ADC ──▶ BatteryMonitor ─────────────────────┘        │
//!                                                               ▼
//!                       Executor ◀── ActionQueue ◀── ControllerService
//! ```
//!
//! Every stage is polled from [`Pipeline::poll`] in the order above, so an
//! edge that arrives before a poll can reach the outputs in that same
//! poll. The queues and edge rings are borrowed, not owned: on target
//! they are statics shared with the GPIO ISRs.

use embedded_hal::digital::OutputPin;

use crate::app::ports::EventSink;
use crate::app::service::ControllerService;
use crate::clock::{Tick, deadline_reached};
use crate::config::{BUTTON_EDGE_SLOTS, EXECUTOR_POLL_MS, LED_EDGE_SLOTS, LED_POLL_MS};
use crate::diagnostics::{DiagnosticsSnapshot, TraceRecorder};
use crate::drivers::button::ButtonDecoder;
use crate::drivers::outputs::OutputLine;
use crate::executor::Executor;
use crate::queue::{ActionQueue, EventQueue};
use crate::sensors::battery::BatteryMonitor;
use crate::sensors::device_status::StatusInterpreter;
use crate::sensors::edge_ring::EdgeRing;
use crate::sensors::led_classifier::LedClassifier;

/// The shared buffers between ISRs, producers and consumers.
#[derive(Clone, Copy)]
pub struct Channels<'a> {
    pub events: &'a EventQueue,
    pub actions: &'a ActionQueue,
    pub led_edges: &'a EdgeRing<LED_EDGE_SLOTS>,
    pub button_edges: &'a EdgeRing<BUTTON_EDGE_SLOTS>,
}

/// The four output lines, in executor order.
pub struct Outputs<L, B, D, K> {
    pub light: OutputLine<L>,
    pub buzzer: OutputLine<B>,
    pub device_button: OutputLine<D>,
    pub kill: OutputLine<K>,
}

pub struct Pipeline<'a, L, B, D, K> {
    channels: Channels<'a>,
    button: ButtonDecoder,
    classifier: LedClassifier,
    interpreter: StatusInterpreter,
    battery: BatteryMonitor,
    controller: ControllerService,
    executor: Executor<L, B, D, K>,
    next_led_ms: u32,
    next_executor_ms: u32,
}

impl<'a, L, B, D, K> Pipeline<'a, L, B, D, K>
where
    L: OutputPin,
    B: OutputPin,
    D: OutputPin,
    K: OutputPin,
{
    /// `led_lit` is the status-sense level at boot, in lit polarity.
    pub fn new(channels: Channels<'a>, outputs: Outputs<L, B, D, K>, now: Tick, led_lit: bool) -> Self {
        Self {
            channels,
            button: ButtonDecoder::new(),
            classifier: LedClassifier::new(now, led_lit),
            interpreter: StatusInterpreter::new(),
            battery: BatteryMonitor::new(),
            controller: ControllerService::new(),
            executor: Executor::new(outputs.light, outputs.buzzer, outputs.device_button, outputs.kill),
            next_led_ms: now.ms,
            next_executor_ms: now.ms,
        }
    }

    pub fn start(&mut self, now: Tick, sink: &mut impl EventSink) {
        self.controller.start(now.ms, self.channels.actions, sink);
        self.executor.poll(now.ms, self.channels.actions);
    }

    /// One superloop iteration. `read_battery_mv` is only called when a
    /// battery sample is due.
    pub fn poll(
        &mut self,
        now: Tick,
        led_lit: bool,
        read_battery_mv: impl FnOnce() -> u16,
        sink: &mut impl EventSink,
    ) {
        let Channels {
            events,
            actions,
            led_edges,
            button_edges,
        } = self.channels;

        self.button.poll(now, button_edges, events);

        if deadline_reached(now.ms, self.next_led_ms) {
            self.next_led_ms = now.ms.wrapping_add(LED_POLL_MS);
            let pattern = self.classifier.poll(now, led_lit, led_edges);
            self.interpreter.poll(now.ms, pattern, events);
        }

        self.battery.poll(now.ms, read_battery_mv, events);
        self.controller.poll(now.ms, events, actions, sink);

        if deadline_reached(now.ms, self.next_executor_ms) {
            self.next_executor_ms = now.ms.wrapping_add(EXECUTOR_POLL_MS);
            self.executor.poll(now.ms, actions);
        }
    }

    pub fn snapshot(&self, now_ms: u32, trace: &TraceRecorder) -> DiagnosticsSnapshot {
        let Channels {
            events,
            actions,
            led_edges,
            button_edges,
        } = self.channels;
        DiagnosticsSnapshot {
            uptime_ms: now_ms,
            state: self.controller.state(),
            battery: self.battery.state(),
            millivolts: self.battery.last_millivolts(),
            lockout: self.controller.lockout_active(),
            last_fault: self.controller.last_fault(),
            shutdown_pending: self.controller.shutdown_pending(),
            pattern: self.classifier.pattern(),
            recording: self.interpreter.recording(),
            light: self.executor.light_pattern(),
            killed: self.executor.killed(),
            events_dropped: events.dropped(),
            actions_dropped: actions.dropped(),
            actions_requeued: self.executor.requeued(),
            led_edge_overflows: led_edges.overflows(),
            button_edge_overflows: button_edges.overflows(),
            led_edges_rejected: self.classifier.edges_rejected(),
            button_bounces: self.button.bounces(),
            events_handled: self.controller.events_handled(),
            events_discarded: self.controller.events_discarded(),
            transitions: self.controller.transitions(),
            trace: trace.entries(),
        }
    }

    pub fn controller(&self) -> &ControllerService {
        &self.controller
    }

    pub fn executor(&self) -> &Executor<L, B, D, K> {
        &self.executor
    }

    pub fn classifier(&self) -> &LedClassifier {
        &self.classifier
    }

    pub fn interpreter(&self) -> &StatusInterpreter {
        &self.interpreter
    }

    pub fn battery(&self) -> &BatteryMonitor {
        &self.battery
    }

    pub fn button(&self) -> &ButtonDecoder {
        &self.button
    }
}
