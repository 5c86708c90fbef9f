//! Monotonic time source for the superloop.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//!   The edge ISRs read the same timer, so edge and poll timestamps share
//!   one time base.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::clock::Tick;

pub struct EspTimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for EspTimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EspTimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Both wrapping views of the current time.
    pub fn now(&self) -> Tick {
        Tick::from_micros(self.uptime_us())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_monotonic() {
        let t = EspTimeAdapter::new();
        let a = t.uptime_us();
        let b = t.uptime_us();
        assert!(b >= a);
        assert!(t.now().ms <= 1000);
    }
}
