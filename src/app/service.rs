//! Controller service, the single consumer of the event queue.
//!
//! [`ControllerService`] owns the FSM and its context. Each poll it runs
//! the current state's deadline checks, then drains the event queue in
//! FIFO order. Battery rules are applied here, ahead of the state
//! handlers, because they outrank every state:
//!
//! - `LockoutEnter` forces `Lockout` from anywhere; `LockoutExit` returns
//!   to `Off` only from `Lockout`.
//! - `Critical` moves `Idle` and `Recording` to `LowBattery`.
//! - Gestures are discarded while locked out or while a shutdown is
//!   pending. They are never buffered for later.
//!
//! ```text
//!  EventQueue ──▶ ┌────────────────────────┐ ──▶ ActionQueue
//!                 │   ControllerService    │
//!                 │  battery rules · FSM   │ ──▶ EventSink
//!                 └────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::actions::ActionId;
use crate::error::FaultCode;
use crate::events::{Event, EventId};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::queue::{ActionQueue, EventQueue};
use crate::sensors::battery::BatteryState;

use super::events::{AppEvent, DiscardReason};
use super::ports::EventSink;

// ───────────────────────────────────────────────────────────────
// ControllerService
// ───────────────────────────────────────────────────────────────

pub struct ControllerService {
    fsm: Fsm,
    ctx: FsmContext,
    events_handled: u32,
    events_discarded: u32,
    actions_dropped: u32,
}

impl ControllerService {
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new() -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Off),
            ctx: FsmContext::new(),
            events_handled: 0,
            events_discarded: 0,
            actions_dropped: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter `Off` and queue its presentation.
    pub fn start(&mut self, now_ms: u32, actions: &ActionQueue, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        self.flush(actions, sink);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("controller started in {:?}", self.fsm.current_state());
    }

    // ── Per-poll orchestration ────────────────────────────────

    pub fn poll(
        &mut self,
        now_ms: u32,
        events: &EventQueue,
        actions: &ActionQueue,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;

        let before = self.snapshot();
        self.fsm.tick(&mut self.ctx);
        self.report(before, sink);
        self.flush(actions, sink);

        while let Some(event) = events.pop() {
            let before = self.snapshot();
            self.handle(event, sink);
            self.report(before, sink);
            self.flush(actions, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn battery(&self) -> BatteryState {
        self.ctx.battery
    }

    pub fn lockout_active(&self) -> bool {
        self.ctx.lockout
    }

    pub fn last_fault(&self) -> Option<FaultCode> {
        self.ctx.last_fault
    }

    pub fn shutdown_pending(&self) -> bool {
        self.ctx.shutdown_pending()
    }

    pub fn events_handled(&self) -> u32 {
        self.events_handled
    }

    pub fn events_discarded(&self) -> u32 {
        self.events_discarded
    }

    /// Actions lost because the action queue was full.
    pub fn actions_dropped(&self) -> u32 {
        self.actions_dropped
    }

    pub fn transitions(&self) -> u32 {
        self.fsm.transitions()
    }

    // ── Internal ──────────────────────────────────────────────

    fn handle(&mut self, event: Event, sink: &mut impl EventSink) {
        self.events_handled = self.events_handled.wrapping_add(1);
        sink.emit(&AppEvent::EventReceived(event));

        let state = self.fsm.current_state();
        match event.id {
            EventId::LockoutEnter { millivolts } => {
                warn!("controller: lockout entered at {millivolts} mV");
                self.ctx.lockout = true;
                self.fsm.force_transition(StateId::Lockout, &mut self.ctx);
            }
            EventId::LockoutExit { millivolts } => {
                info!("controller: lockout released at {millivolts} mV");
                self.ctx.lockout = false;
                if state == StateId::Lockout {
                    self.fsm.force_transition(StateId::Off, &mut self.ctx);
                }
            }
            EventId::BatteryStateChanged { state: battery, .. } => {
                self.ctx.battery = battery;
                if battery == BatteryState::Critical
                    && !self.ctx.lockout
                    && matches!(state, StateId::Idle | StateId::Recording)
                {
                    self.fsm.force_transition(StateId::LowBattery, &mut self.ctx);
                }
            }
            _ if event.is_gesture() && state == StateId::Lockout => {
                self.discard(event, DiscardReason::Lockout, sink);
            }
            _ if event.is_gesture() && self.ctx.shutdown_pending() => {
                self.discard(event, DiscardReason::ShutdownPending, sink);
            }
            _ => self.fsm.dispatch(&mut self.ctx, &event),
        }
    }

    fn discard(&mut self, event: Event, reason: DiscardReason, sink: &mut impl EventSink) {
        debug!("controller: {} discarded ({:?})", event.id.name(), reason);
        self.events_discarded = self.events_discarded.wrapping_add(1);
        sink.emit(&AppEvent::EventDiscarded { event, reason });
    }

    fn snapshot(&self) -> (StateId, u32) {
        (self.fsm.current_state(), self.ctx.shutdowns())
    }

    fn report(&self, (from, shutdowns): (StateId, u32), sink: &mut impl EventSink) {
        let to = self.fsm.current_state();
        if self.ctx.shutdowns() != shutdowns {
            sink.emit(&AppEvent::ShutdownComplete);
        }
        if to == from {
            return;
        }
        sink.emit(&AppEvent::StateChanged {
            from,
            to,
            at_ms: self.ctx.now_ms,
        });
        if matches!(to, StateId::Error | StateId::LowBattery | StateId::Lockout) {
            if let Some(fault) = self.ctx.last_fault {
                sink.emit(&AppEvent::FaultRaised(fault));
            }
        }
    }

    /// Move the outbox onto the action queue. A full queue drops the
    /// action; a dropped light request is re-sent on the next request.
    fn flush(&mut self, actions: &ActionQueue, sink: &mut impl EventSink) {
        for action in self.ctx.take_actions() {
            if actions.push(action) {
                continue;
            }
            warn!("controller: action queue full, {} dropped", action.id.name());
            self.actions_dropped = self.actions_dropped.wrapping_add(1);
            if matches!(action.id, ActionId::Light(_)) {
                self.ctx.forget_light();
            }
            sink.emit(&AppEvent::ActionDropped(action));
        }
    }
}

impl Default for ControllerService {
    fn default() -> Self {
        Self::new()
    }
}
