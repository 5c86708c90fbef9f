//! GPIO / peripheral pin assignments for the controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

use crate::drivers::outputs::Polarity;

// ---------------------------------------------------------------------------
// Inputs (edge-triggered, both edges)
// ---------------------------------------------------------------------------

/// Device status LED sense, via the NPN sniffer stage.
/// LOW = device LED lit.
pub const DEVICE_LED_SENSE_GPIO: i32 = 4;
pub const DEVICE_LED_LIT_LEVEL: bool = false;

/// User button, routed through the power-path supervisor's INT# output.
/// LOW = pressed.
pub const BUTTON_GPIO: i32 = 5;
pub const BUTTON_PRESSED_LEVEL: bool = false;

// ---------------------------------------------------------------------------
// Battery sense (ADC1, polled)
// ---------------------------------------------------------------------------

/// Battery divider midpoint. ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const BATTERY_ADC_GPIO: i32 = 1;
pub const BATTERY_ADC_CHANNEL: u32 = 0;
/// Divider: 68 kΩ over 33 kΩ. Battery mV = pin mV × (68 + 33) / 33.
pub const BATTERY_DIVIDER_NUM: u32 = 101;
pub const BATTERY_DIVIDER_DEN: u32 = 33;

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// PhotoMOS driving the device's button contacts.
pub const DEVICE_BUTTON_GPIO: i32 = 6;
pub const DEVICE_BUTTON_POLARITY: Polarity = Polarity::ActiveHigh;

/// User-facing status light.
pub const STATUS_LIGHT_GPIO: i32 = 7;
pub const STATUS_LIGHT_POLARITY: Polarity = Polarity::ActiveHigh;

/// Buzzer / haptic driver, low-side N-MOSFET gate.
pub const BUZZER_GPIO: i32 = 8;
pub const BUZZER_POLARITY: Polarity = Polarity::ActiveHigh;

/// KILL# to the power-path supervisor. Asserting it removes power for good.
pub const KILL_GPIO: i32 = 9;
pub const KILL_POLARITY: Polarity = Polarity::ActiveLow;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 43;
pub const UART_RX_GPIO: i32 = 44;
