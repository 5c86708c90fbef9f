//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                            │
//! │  ┌────────────┬──────────┬──────────┬────────────────┬──────────────┐  │
//! │  │ StateId    │ on_enter │ on_exit  │ on_event       │ on_update    │  │
//! │  ├────────────┼──────────┼──────────┼────────────────┼──────────────┤  │
//! │  │ Off        │ fn(ctx)  │    -     │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ Booting    │ fn(ctx)  │ fn(ctx)  │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ Idle       │ fn(ctx)  │    -     │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ Recording  │ fn(ctx)  │    -     │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ LowBattery │ fn(ctx)  │    -     │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ Error      │ fn(ctx)  │ fn(ctx)  │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  │ Lockout    │ fn(ctx)  │ fn(ctx)  │ fn(ctx,&Event) │ fn(ctx)      │  │
//! │  └────────────┴──────────┴──────────┴────────────────┴──────────────┘  │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_event` runs for each event the controller hands to the current
//! state; `on_update` runs once per poll to check deadlines. Either may
//! return `Some(next)`, in which case the engine runs `on_exit` for the
//! current state, then `on_enter` for the next. `on_enter` is where each
//! state emits its light and beep actions, so a transition can never
//! happen without its presentation.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

use crate::events::Event;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Controller lifecycle states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[repr(u8)]
pub enum StateId {
    Off = 0,
    Booting = 1,
    Idle = 2,
    Recording = 3,
    LowBattery = 4,
    Error = 5,
    Lockout = 6,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert an index back to `StateId`. Asserts in debug builds;
    /// falls back to `Error` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Off,
            1 => Self::Booting,
            2 => Self::Idle,
            3 => Self::Recording,
            4 => Self::LowBattery,
            5 => Self::Error,
            6 => Self::Lockout,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit`: run exactly once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-event handler. `Some(next)` requests a transition.
pub type StateEventFn = fn(&mut FsmContext, &Event) -> Option<StateId>;

/// Per-poll deadline check. `Some(next)` requests a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    transitions: u32,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter`. Call once before the first event.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        ctx.entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Hand one event to the current state.
    pub fn dispatch(&mut self, ctx: &mut FsmContext, event: &Event) {
        if let Some(next) = (self.table[self.current].on_event)(ctx, event) {
            self.force_transition(next, ctx);
        }
    }

    /// Run the current state's deadline checks.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.force_transition(next, ctx);
        }
    }

    /// Transition regardless of what the current state wants. Used for the
    /// battery rules that override every state. A no-op if already there.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);
        ctx.entered_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
