//! Concrete state handler functions and table builder.
//!
//! Each state is a row of plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap. Presentation (light and beep) lives in `on_enter`,
//! so every transition carries its own feedback.
//!
//! ```text
//!         LongPress                PoweredOnIdle
//!  OFF ─────────────▶ BOOTING ─────────────────▶ IDLE ◀────────┐
//!   ▲                    │ (deadline)             │  RecordStarted │ RecordStopped
//!   │                    ▼                        ▼               │
//!   │                  ERROR ◀──DeviceError── RECORDING ──────────┘
//!   │                    │
//!   └──PoweredOff────────┘        LOW_BATTERY ◀── Critical (Idle/Recording)
//!
//!  Any state ──[LockoutEnter]──▶ LOCKOUT ──[LockoutExit]──▶ OFF
//! ```
//!
//! Battery and lockout rules are applied by the controller before the
//! event reaches these handlers; see [`crate::app::service`].

use log::{debug, error, info, warn};

use super::context::{FsmContext, ShutdownPhase};
use super::{StateDescriptor, StateId};
use crate::actions::{BeepPattern, LightPattern, PressKind};
use crate::config::{BOOT_TIMEOUT_MS, KILL_AFTER_SHUTDOWN};
use crate::error::FaultCode;
use crate::events::{Event, EventId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Off
        StateDescriptor {
            id: StateId::Off,
            name: "Off",
            on_enter: Some(off_enter),
            on_exit: None,
            on_event: off_event,
            on_update: no_update,
        },
        // Index 1: Booting
        StateDescriptor {
            id: StateId::Booting,
            name: "Booting",
            on_enter: Some(booting_enter),
            on_exit: Some(booting_exit),
            on_event: booting_event,
            on_update: booting_update,
        },
        // Index 2: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_event: idle_event,
            on_update: idle_update,
        },
        // Index 3: Recording
        StateDescriptor {
            id: StateId::Recording,
            name: "Recording",
            on_enter: Some(recording_enter),
            on_exit: None,
            on_event: recording_event,
            on_update: shutdown_update,
        },
        // Index 4: LowBattery
        StateDescriptor {
            id: StateId::LowBattery,
            name: "LowBattery",
            on_enter: Some(low_battery_enter),
            on_exit: None,
            on_event: low_battery_event,
            on_update: shutdown_update,
        },
        // Index 5: Error
        StateDescriptor {
            id: StateId::Error,
            name: "Error",
            on_enter: Some(error_enter),
            on_exit: Some(error_exit),
            on_event: error_event,
            on_update: shutdown_update,
        },
        // Index 6: Lockout
        StateDescriptor {
            id: StateId::Lockout,
            name: "Lockout",
            on_enter: Some(lockout_enter),
            on_exit: Some(lockout_exit),
            on_event: lockout_event,
            on_update: no_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared handlers
// ═══════════════════════════════════════════════════════════════════════════

fn no_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

/// Shutdown deadlines, common to every powered state.
fn shutdown_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.shutdown {
        ShutdownPhase::AwaitRecordStart { deadline_ms } if ctx.reached(deadline_ms) => {
            info!("SHUTDOWN: record start never confirmed, powering off");
            ctx.request_power_off();
            None
        }
        ShutdownPhase::AwaitStop { deadline_ms } if ctx.reached(deadline_ms) => {
            warn!("SHUTDOWN: record stop never confirmed, powering off anyway");
            ctx.request_power_off();
            None
        }
        ShutdownPhase::AwaitPowerOff { deadline_ms } if ctx.reached(deadline_ms) => {
            warn!("SHUTDOWN: device never went dark, completing shutdown");
            ctx.finish_shutdown();
            Some(StateId::Off)
        }
        _ => None,
    }
}

/// `PoweredOff` completes a pending power-off.
fn powered_off(ctx: &mut FsmContext) -> Option<StateId> {
    if matches!(ctx.shutdown, ShutdownPhase::AwaitPowerOff { .. }) {
        ctx.finish_shutdown();
        return Some(StateId::Off);
    }
    debug!("device powered off unprompted");
    None
}

fn device_fault(ctx: &mut FsmContext, fault: FaultCode) -> Option<StateId> {
    ctx.raise(fault);
    Some(StateId::Error)
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF: device unpowered, waiting for the user
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::Off);
    ctx.boot_deadline_ms = None;
    ctx.record_deadline_ms = None;
    ctx.abandon_shutdown();

    if ctx.shutdown_complete {
        ctx.shutdown_complete = false;
        if KILL_AFTER_SHUTDOWN {
            info!("OFF: shutdown complete, cutting power");
            ctx.kill();
        }
    }
}

fn off_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::LongPress { .. } => {
            ctx.press(PressKind::Long);
            ctx.boot_deadline_ms = Some(ctx.after(BOOT_TIMEOUT_MS));
            ctx.boot_signature_seen = false;
            Some(StateId::Booting)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  BOOTING: power-on press sent, waiting for the device to settle
// ═══════════════════════════════════════════════════════════════════════════

fn booting_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::FastBlink);
    ctx.beep(BeepPattern::Single);
    info!("BOOTING: waiting up to {} ms for the device", BOOT_TIMEOUT_MS);
}

fn booting_exit(ctx: &mut FsmContext) {
    ctx.boot_deadline_ms = None;
}

fn booting_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::PoweredOnIdle => {
            info!("BOOTING: device ready after {} ms", ctx.ms_in_state());
            ctx.beep(BeepPattern::Triple);
            Some(StateId::Idle)
        }
        // Some devices start recording as soon as they boot.
        EventId::RecordStarted => {
            info!("BOOTING: device booted straight into recording");
            ctx.beep(BeepPattern::Double);
            Some(StateId::Recording)
        }
        EventId::DeviceError {
            fault: FaultCode::AbnormalBootSignature,
            ..
        } => {
            ctx.boot_signature_seen = true;
            None
        }
        _ => None,
    }
}

fn booting_update(ctx: &mut FsmContext) -> Option<StateId> {
    let deadline = ctx.boot_deadline_ms?;
    if !ctx.reached(deadline) {
        return None;
    }
    let fault = if ctx.boot_signature_seen {
        FaultCode::AbnormalBootSignature
    } else {
        FaultCode::BootTimeout
    };
    device_fault(ctx, fault)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: device on, not recording
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::Solid);
}

fn idle_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::ShortPress { .. } => {
            if ctx.record_requested() {
                debug!("IDLE: start already requested, press discarded");
            } else {
                ctx.request_record();
            }
            None
        }
        EventId::LongPress { .. } => {
            if ctx.record_requested() {
                // Stop the recording as soon as it is confirmed.
                ctx.shutdown = ShutdownPhase::AwaitRecordStart {
                    deadline_ms: ctx.record_deadline_ms.unwrap_or(ctx.now_ms),
                };
            } else {
                ctx.request_power_off();
            }
            None
        }
        EventId::RecordStarted => {
            ctx.record_deadline_ms = None;
            ctx.beep(BeepPattern::Double);
            if matches!(ctx.shutdown, ShutdownPhase::AwaitRecordStart { .. }) {
                ctx.request_stop_then_power_off();
            }
            Some(StateId::Recording)
        }
        EventId::PoweredOff => powered_off(ctx),
        EventId::DeviceError { fault, .. } => device_fault(ctx, fault),
        _ => None,
    }
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if let Some(deadline) = ctx.record_deadline_ms {
        if ctx.reached(deadline) {
            debug!("IDLE: record start not confirmed in time");
            ctx.record_deadline_ms = None;
        }
    }
    shutdown_update(ctx)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECORDING
// ═══════════════════════════════════════════════════════════════════════════

fn recording_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::SlowBlink);
}

fn recording_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::ShortPress { .. } => {
            ctx.press(PressKind::Short);
            None
        }
        EventId::LongPress { .. } => {
            ctx.request_stop_then_power_off();
            None
        }
        EventId::RecordStopped => {
            ctx.beep(BeepPattern::Single);
            if matches!(ctx.shutdown, ShutdownPhase::AwaitStop { .. }) {
                ctx.request_power_off();
            }
            Some(StateId::Idle)
        }
        EventId::PoweredOff => powered_off(ctx),
        EventId::DeviceError { fault, .. } => device_fault(ctx, fault),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOW_BATTERY: critical charge, only power-off is offered
// ═══════════════════════════════════════════════════════════════════════════

fn low_battery_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::SlowBlink);
    ctx.beep(BeepPattern::LowBattery);
    ctx.last_fault = Some(FaultCode::BatteryCritical);
    warn!("LOW_BATTERY: battery critical, power off soon");
}

fn low_battery_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::LongPress { .. } => {
            ctx.request_power_off();
            None
        }
        EventId::RecordStopped if matches!(ctx.shutdown, ShutdownPhase::AwaitStop { .. }) => {
            ctx.request_power_off();
            None
        }
        EventId::PoweredOff => powered_off(ctx),
        EventId::DeviceError { fault, .. } => device_fault(ctx, fault),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR: fault presented until the user powers off
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::Error);
    ctx.beep(BeepPattern::ErrorFast);
    ctx.record_deadline_ms = None;
    ctx.abandon_shutdown();
    let fault = ctx.fault.unwrap_or(FaultCode::IllegalState);
    error!("ERROR: {fault}");
}

fn error_exit(ctx: &mut FsmContext) {
    if let Some(fault) = ctx.fault.take() {
        info!("ERROR: leaving with {fault} cleared");
    }
}

fn error_event(ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    match event.id {
        EventId::LongPress { .. } => {
            ctx.request_power_off();
            None
        }
        EventId::PoweredOff => {
            if matches!(ctx.shutdown, ShutdownPhase::AwaitPowerOff { .. }) {
                ctx.finish_shutdown();
            }
            Some(StateId::Off)
        }
        EventId::DeviceError { fault, .. } => {
            debug!("ERROR: further fault {fault} while already faulted");
            None
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOCKOUT: deep discharge protection, all input ignored
// ═══════════════════════════════════════════════════════════════════════════

fn lockout_enter(ctx: &mut FsmContext) {
    ctx.light(LightPattern::Lockout);
    ctx.beep(BeepPattern::Single);
    ctx.boot_deadline_ms = None;
    ctx.record_deadline_ms = None;
    ctx.abandon_shutdown();
    ctx.raise(FaultCode::BatteryLockout);
    warn!("LOCKOUT: battery below lockout threshold, input disabled");
}

fn lockout_exit(ctx: &mut FsmContext) {
    ctx.fault = None;
    info!("LOCKOUT: battery recovered");
}

fn lockout_event(_ctx: &mut FsmContext, event: &Event) -> Option<StateId> {
    debug!("LOCKOUT: {} ignored", event.id.name());
    None
}
