//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to. It holds the battery picture, the pending deadlines, the
//! shutdown sequence, and an outbox of actions the controller flushes
//! to the executor after each event.

use heapless::Vec;
use log::{debug, warn};

use crate::actions::{Action, ActionId, BeepPattern, LightPattern, PressKind};
use crate::clock::deadline_reached;
use crate::config::{RECORD_CONFIRM_MS, SHUTDOWN_CONFIRM_MS};
use crate::error::FaultCode;
use crate::sensors::battery::BatteryState;

/// Actions one handler may emit before the controller flushes.
pub const OUTBOX_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Shutdown sequence
// ---------------------------------------------------------------------------

/// Progress of a user-requested power-off.
///
/// ```text
///  None ──LongPress──▶ AwaitPowerOff ──PoweredOff──▶ complete
///    │                       ▲
///    │ (start unconfirmed)   │ (RecordStopped)
///    ▼                       │
///  AwaitRecordStart ──▶ AwaitStop
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    None,
    /// A record request is in flight; stop it once it starts.
    AwaitRecordStart { deadline_ms: u32 },
    /// Stop press sent; power off once recording stops.
    AwaitStop { deadline_ms: u32 },
    /// Power-off press sent.
    AwaitPowerOff { deadline_ms: u32 },
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Time of the poll currently being handled.
    pub now_ms: u32,
    /// When the current state was entered.
    pub entered_ms: u32,

    // -- Battery --
    pub battery: BatteryState,
    pub lockout: bool,

    // -- Faults --
    /// Fault that put the controller into Error, cleared on exit.
    pub fault: Option<FaultCode>,
    /// Most recent fault ever raised.
    pub last_fault: Option<FaultCode>,

    // -- Deadlines --
    pub boot_deadline_ms: Option<u32>,
    /// An abnormal boot signature was seen while booting.
    pub boot_signature_seen: bool,
    /// A start-recording press is awaiting confirmation.
    pub record_deadline_ms: Option<u32>,

    // -- Shutdown --
    pub shutdown: ShutdownPhase,
    /// Set when a shutdown finishes; consumed by `Off` on entry.
    pub shutdown_complete: bool,
    shutdowns: u32,

    // -- Outputs --
    outbox: Vec<Action, OUTBOX_DEPTH>,
    last_light: Option<LightPattern>,
}

impl FsmContext {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            entered_ms: 0,
            battery: BatteryState::Unknown,
            lockout: false,
            fault: None,
            last_fault: None,
            boot_deadline_ms: None,
            boot_signature_seen: false,
            record_deadline_ms: None,
            shutdown: ShutdownPhase::None,
            shutdown_complete: false,
            shutdowns: 0,
            outbox: Vec::new(),
            last_light: None,
        }
    }

    pub fn ms_in_state(&self) -> u32 {
        self.now_ms.wrapping_sub(self.entered_ms)
    }

    pub fn reached(&self, deadline_ms: u32) -> bool {
        deadline_reached(self.now_ms, deadline_ms)
    }

    pub fn after(&self, delay_ms: u32) -> u32 {
        self.now_ms.wrapping_add(delay_ms)
    }

    // -- Faults ------------------------------------------------------------

    pub fn raise(&mut self, fault: FaultCode) {
        self.fault = Some(fault);
        self.last_fault = Some(fault);
    }

    // -- Recording ---------------------------------------------------------

    /// A start request is in flight and not yet expired.
    pub fn record_requested(&self) -> bool {
        self.record_deadline_ms.is_some_and(|d| !self.reached(d))
    }

    pub fn request_record(&mut self) {
        self.press(PressKind::Short);
        self.record_deadline_ms = Some(self.after(RECORD_CONFIRM_MS));
    }

    // -- Shutdown ----------------------------------------------------------

    pub fn shutdown_pending(&self) -> bool {
        self.shutdown != ShutdownPhase::None
    }

    /// Send the power-off press and wait for the device to go dark.
    pub fn request_power_off(&mut self) {
        self.press(PressKind::Long);
        self.shutdown = ShutdownPhase::AwaitPowerOff {
            deadline_ms: self.after(SHUTDOWN_CONFIRM_MS),
        };
    }

    /// Stop recording first, then power off.
    pub fn request_stop_then_power_off(&mut self) {
        self.press(PressKind::Short);
        self.shutdown = ShutdownPhase::AwaitStop {
            deadline_ms: self.after(SHUTDOWN_CONFIRM_MS),
        };
    }

    pub fn finish_shutdown(&mut self) {
        self.shutdown = ShutdownPhase::None;
        self.shutdown_complete = true;
        self.shutdowns = self.shutdowns.wrapping_add(1);
    }

    pub fn abandon_shutdown(&mut self) {
        if self.shutdown_pending() {
            debug!("shutdown abandoned in {:?}", self.shutdown);
        }
        self.shutdown = ShutdownPhase::None;
    }

    pub fn shutdowns(&self) -> u32 {
        self.shutdowns
    }

    // -- Outbox ------------------------------------------------------------

    /// Request a light pattern. Repeating the last request is a no-op.
    pub fn light(&mut self, pattern: LightPattern) {
        if self.last_light == Some(pattern) {
            return;
        }
        self.last_light = Some(pattern);
        self.emit(ActionId::Light(pattern));
    }

    pub fn beep(&mut self, pattern: BeepPattern) {
        self.emit(ActionId::Beep(pattern));
    }

    pub fn press(&mut self, kind: PressKind) {
        self.emit(ActionId::DevicePress(kind));
    }

    pub fn kill(&mut self) {
        self.emit(ActionId::AssertKill);
    }

    /// The executor never saw the last light request; send the next one
    /// even if it repeats.
    pub fn forget_light(&mut self) {
        self.last_light = None;
    }

    pub fn take_actions(&mut self) -> impl Iterator<Item = Action> + use<> {
        core::mem::take(&mut self.outbox).into_iter()
    }

    fn emit(&mut self, id: ActionId) {
        if self.outbox.push(Action::new(self.now_ms, id)).is_err() {
            warn!("fsm: outbox full, {} dropped", id.name());
        }
    }
}

impl Default for FsmContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_light_is_deduplicated() {
        let mut ctx = FsmContext::new();
        ctx.light(LightPattern::Solid);
        ctx.light(LightPattern::Solid);
        ctx.light(LightPattern::SlowBlink);
        assert_eq!(ctx.take_actions().count(), 2);
        ctx.light(LightPattern::SlowBlink);
        assert_eq!(ctx.take_actions().count(), 0);
        ctx.forget_light();
        ctx.light(LightPattern::SlowBlink);
        assert_eq!(ctx.take_actions().count(), 1);
    }

    #[test]
    fn record_request_expires() {
        let mut ctx = FsmContext::new();
        ctx.now_ms = 100;
        ctx.request_record();
        assert!(ctx.record_requested());
        ctx.now_ms = 100 + RECORD_CONFIRM_MS;
        assert!(!ctx.record_requested());
    }

    #[test]
    fn outbox_overflow_drops_newest() {
        let mut ctx = FsmContext::new();
        for _ in 0..OUTBOX_DEPTH + 2 {
            ctx.beep(BeepPattern::Single);
        }
        assert_eq!(ctx.take_actions().count(), OUTBOX_DEPTH);
    }

    #[test]
    fn power_off_sets_deadline() {
        let mut ctx = FsmContext::new();
        ctx.now_ms = 10;
        ctx.request_power_off();
        assert_eq!(
            ctx.shutdown,
            ShutdownPhase::AwaitPowerOff {
                deadline_ms: 10 + SHUTDOWN_CONFIRM_MS
            }
        );
        let ids: std::vec::Vec<_> = ctx.take_actions().map(|a| a.id).collect();
        assert_eq!(ids, [ActionId::DevicePress(PressKind::Long)]);
        ctx.finish_shutdown();
        assert!(!ctx.shutdown_pending());
        assert!(ctx.shutdown_complete);
        assert_eq!(ctx.shutdowns(), 1);
    }
}
