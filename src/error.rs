//! Fault taxonomy and firmware error type.
//!
//! [`FaultCode`] is what the controller latches when it enters `Error` or
//! `Lockout`; it travels inside [`EventId::DeviceError`](crate::events::EventId)
//! and shows up in logs and the diagnostics snapshot. [`Error`] covers the
//! few genuinely fallible operations, all of them at boot.

use core::fmt;

use serde::Serialize;

use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Fault codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum FaultCode {
    /// The device never confirmed it was ready after a power-on press.
    BootTimeout = 1,
    /// The device showed its abnormal-boot blink signature.
    AbnormalBootSignature = 2,
    /// Fast blink persisted past the fault window (card missing / full).
    DeviceCardFault = 3,
    BatteryCritical = 4,
    BatteryLockout = 5,
    /// A state handler reached a branch that should be unreachable.
    IllegalState = 6,
    UnexpectedEvent = 7,
    UnexpectedPattern = 8,
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootTimeout => write!(f, "device boot timeout"),
            Self::AbnormalBootSignature => write!(f, "abnormal boot signature"),
            Self::DeviceCardFault => write!(f, "device card fault"),
            Self::BatteryCritical => write!(f, "battery critical"),
            Self::BatteryLockout => write!(f, "battery lockout"),
            Self::IllegalState => write!(f, "illegal state"),
            Self::UnexpectedEvent => write!(f, "unexpected event"),
            Self::UnexpectedPattern => write!(f, "unexpected LED pattern"),
        }
    }
}

// ---------------------------------------------------------------------------
// Firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed.
    Init(HwInitError),
    /// An output line rejected a write.
    OutputWrite(&'static str),
    /// A battery ADC conversion failed (ESP-IDF return code).
    Adc(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::OutputWrite(line) => write!(f, "output write failed: {line}"),
            Self::Adc(rc) => write!(f, "battery ADC read failed (rc={rc})"),
        }
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_is_human_readable() {
        assert_eq!(FaultCode::DeviceCardFault.to_string(), "device card fault");
        assert_eq!(FaultCode::BootTimeout.to_string(), "device boot timeout");
    }

    #[test]
    fn init_error_converts() {
        let e: Error = HwInitError::GpioConfigFailed(-1).into();
        assert_eq!(e, Error::Init(HwInitError::GpioConfigFailed(-1)));
        assert!(e.to_string().starts_with("init: GPIO config failed"));
    }
}
