//! Timing, threshold, and policy constants.
//!
//! Every value the controller reacts to is a named compile-time constant.
//! Nothing here is tunable at runtime; [`Timings`] only mirrors the
//! constants into one serialisable value so diagnostics can report what
//! the running build was compiled with.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User button (debounce + gesture bands)
// ---------------------------------------------------------------------------

/// Edges closer than this to the previous accepted edge are contact bounce.
pub const BTN_DEBOUNCE_MS: u32 = 35;
/// Shortest hold that counts as a deliberate press.
pub const BTN_SHORT_MIN_MS: u32 = 50;
/// Hold length the power-path chip needs before it latches the rail on.
pub const BTN_WAKE_MIN_MS: u32 = 350;
/// Hold length at which a press becomes a long press (emitted while held).
pub const BTN_GRACE_MS: u32 = 500;
/// Hold length at which the power-path chip forces a hard cut on its own.
pub const BTN_NUCLEAR_MS: u32 = 1500;

// ---------------------------------------------------------------------------
// Device button emulation
// ---------------------------------------------------------------------------

pub const DEVICE_PRESS_SHORT_MS: u32 = 500;
pub const DEVICE_PRESS_LONG_MS: u32 = 3000;
/// Dead time after a release before the next press may assert.
pub const DEVICE_PRESS_GUARD_MS: u32 = 500;

// ---------------------------------------------------------------------------
// Beeper
// ---------------------------------------------------------------------------

pub const BEEP_ON_MS: u32 = 80;
pub const BEEP_ERROR_ON_MS: u32 = 50;
pub const BEEP_LOW_BATTERY_ON_MS: u32 = 250;
pub const BEEP_GAP_MS: u32 = 80;
/// Silence after the last beep of a sequence before the engine goes idle.
pub const BEEP_FINAL_GAP_MS: u32 = 180;

// ---------------------------------------------------------------------------
// Controller deadlines
// ---------------------------------------------------------------------------

/// Bound on how long the device may take to show a settled status after a
/// power-on press. Also the persistence window for a fast-blink fault.
pub const BOOT_TIMEOUT_MS: u32 = 8000;
/// How long a start-record press may stay unconfirmed.
pub const RECORD_CONFIRM_MS: u32 = 8000;
/// How long after the power-off press the device may take to go dark.
pub const SHUTDOWN_CONFIRM_MS: u32 = DEVICE_PRESS_LONG_MS + BOOT_TIMEOUT_MS;

// ---------------------------------------------------------------------------
// LED classifier windows
// ---------------------------------------------------------------------------

/// Edges closer together than this are treated as glitches.
pub const LED_GLITCH_US: u32 = 3_000;
/// Quiet time after which the held level alone decides Solid vs Off.
pub const LED_SOLID_MS: u32 = 1500;

pub const LED_SLOW_PERIOD_MIN_MS: u32 = 700;
pub const LED_SLOW_PERIOD_MAX_MS: u32 = 1800;
pub const LED_SLOW_EDGE_MIN_MS: u32 = 150;
pub const LED_SLOW_EDGE_MAX_MS: u32 = 1200;

pub const LED_FAST_PERIOD_MIN_MS: u32 = 80;
pub const LED_FAST_PERIOD_MAX_MS: u32 = 450;
pub const LED_FAST_EDGE_MIN_MS: u32 = 20;
pub const LED_FAST_EDGE_MAX_MS: u32 = 250;

/// Abnormal boot: a slow burst whose period sits above the recording band
/// and whose dark phase is long.
pub const LED_ABN_PERIOD_MIN_MS: u32 = LED_SLOW_PERIOD_MAX_MS + 1;
pub const LED_ABN_PERIOD_MAX_MS: u32 = 3200;
pub const LED_ABN_OFF_MIN_MS: u32 = 800;

/// Consecutive same-band classifications required before publishing.
pub const LED_HYSTERESIS_COUNT: u8 = 2;

// ---------------------------------------------------------------------------
// Battery (battery-terminal millivolts, 2S Li-ion pack)
// ---------------------------------------------------------------------------

pub const BAT_FULL_MV: u16 = 8200;
pub const BAT_HALF_MV: u16 = 7400;
pub const BAT_LOW_MV: u16 = 7100;
pub const BAT_CRITICAL_MV: u16 = 7000;

/// Lockout is entered at or below this level...
pub const BAT_LOCKOUT_ENTER_MV: u16 = 6800;
/// ...and released only at or above this one.
pub const BAT_LOCKOUT_EXIT_MV: u16 = 7100;

/// Consecutive samples a new classification must hold before it is reported.
pub const BAT_STABLE_SAMPLES: u8 = 3;

// ---------------------------------------------------------------------------
// Cadences
// ---------------------------------------------------------------------------

pub const BATTERY_SAMPLE_MS: u32 = 250;
pub const LED_POLL_MS: u32 = 10;
pub const EXECUTOR_POLL_MS: u32 = 1;
pub const DIAGNOSTICS_INTERVAL_MS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Queue sizes (ring slots; one slot is always kept free)
// ---------------------------------------------------------------------------

pub const EVENT_QUEUE_SLOTS: usize = 16;
pub const ACTION_QUEUE_SLOTS: usize = 8;
pub const LED_EDGE_SLOTS: usize = 32;
pub const BUTTON_EDGE_SLOTS: usize = 8;
pub const TRACE_DEPTH: usize = 32;
/// Device presses the executor holds while the press engine is busy.
pub const DEFERRED_PRESS_SLOTS: usize = 4;

// ---------------------------------------------------------------------------
// Policy flags
// ---------------------------------------------------------------------------

/// Honour battery lockout events. Bench builds on a lab supply turn this off.
pub const ENFORCE_BATTERY_LOCKOUT: bool = true;
/// Cut our own power once a user shutdown has completed.
pub const KILL_AFTER_SHUTDOWN: bool = true;

// ---------------------------------------------------------------------------
// Serialisable mirror
// ---------------------------------------------------------------------------

/// Snapshot of the compiled-in timing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub btn_debounce_ms: u32,
    pub btn_short_min_ms: u32,
    pub btn_grace_ms: u32,
    pub btn_nuclear_ms: u32,
    pub press_short_ms: u32,
    pub press_long_ms: u32,
    pub press_guard_ms: u32,
    pub boot_timeout_ms: u32,
    pub led_solid_ms: u32,
    pub led_slow_period_ms: (u32, u32),
    pub led_fast_period_ms: (u32, u32),
    pub bat_lockout_mv: (u16, u16),
}

impl Timings {
    pub const DEFAULT: Self = Self {
        btn_debounce_ms: BTN_DEBOUNCE_MS,
        btn_short_min_ms: BTN_SHORT_MIN_MS,
        btn_grace_ms: BTN_GRACE_MS,
        btn_nuclear_ms: BTN_NUCLEAR_MS,
        press_short_ms: DEVICE_PRESS_SHORT_MS,
        press_long_ms: DEVICE_PRESS_LONG_MS,
        press_guard_ms: DEVICE_PRESS_GUARD_MS,
        boot_timeout_ms: BOOT_TIMEOUT_MS,
        led_solid_ms: LED_SOLID_MS,
        led_slow_period_ms: (LED_SLOW_PERIOD_MIN_MS, LED_SLOW_PERIOD_MAX_MS),
        led_fast_period_ms: (LED_FAST_PERIOD_MIN_MS, LED_FAST_PERIOD_MAX_MS),
        bat_lockout_mv: (BAT_LOCKOUT_ENTER_MV, BAT_LOCKOUT_EXIT_MV),
    };
}

impl Default for Timings {
    fn default() -> Self {
        Self::DEFAULT
    }
}
