//! Monotonic timestamps and wrap-safe deadline arithmetic.
//!
//! The firmware keeps two truncated views of the same 64-bit uptime:
//! milliseconds for deadlines and microseconds for edge timing. Each
//! wraps independently, so they are carried together instead of being
//! derived from each other.

/// A single sample of the monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub ms: u32,
    pub us: u32,
}

impl Tick {
    pub fn from_micros(uptime_us: u64) -> Self {
        Self {
            ms: (uptime_us / 1000) as u32,
            us: uptime_us as u32,
        }
    }

    pub fn from_millis(uptime_ms: u64) -> Self {
        Self::from_micros(uptime_ms * 1000)
    }
}

/// `true` once `now` has reached or passed `deadline`.
///
/// Valid while the two are within ~24.8 days of each other.
pub fn deadline_reached(now_ms: u32, deadline_ms: u32) -> bool {
    now_ms.wrapping_sub(deadline_ms) as i32 >= 0
}

/// Microsecond delta converted to whole milliseconds.
pub fn elapsed_ms(from_us: u32, to_us: u32) -> u32 {
    to_us.wrapping_sub(from_us) / 1000
}
