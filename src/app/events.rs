//! Outbound application events.
//!
//! The [`ControllerService`](super::service::ControllerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them: log to serial, keep a trace
//! for diagnostics, or both.

use crate::actions::Action;
use crate::error::FaultCode;
use crate::events::Event;
use crate::fsm::StateId;

/// Why an input event never reached the state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DiscardReason {
    Lockout,
    ShutdownPending,
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller has started (carries initial state).
    Started(StateId),

    /// An input event was popped from the event queue.
    EventReceived(Event),

    /// A gesture was dropped by a global rule.
    EventDiscarded { event: Event, reason: DiscardReason },

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId, at_ms: u32 },

    /// A fault was raised on entry to Error, LowBattery or Lockout.
    FaultRaised(FaultCode),

    /// The action queue was full; this action was never executed.
    ActionDropped(Action),

    /// A user power-off finished.
    ShutdownComplete,
}
