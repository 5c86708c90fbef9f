//! One-shot hardware peripheral initialization and the GPIO ISRs.
//!
//! Configures the battery ADC channel, the two edge-sense inputs and the
//! four output lines using raw ESP-IDF sys calls. Called once from
//! `main()` before the superloop starts.
//!
//! The ISRs only timestamp the edge, read the level and push into the
//! matching [`EdgeRing`]; all interpretation happens in the main loop.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

use crate::config::{BUTTON_EDGE_SLOTS, LED_EDGE_SLOTS};
use crate::drivers::outputs::Polarity;
use crate::error::Result;
use crate::pins;
use crate::sensors::edge_ring::EdgeRing;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

// ── Edge rings shared with the ISRs ───────────────────────────

/// Device status LED edges, in lit polarity.
pub static LED_EDGES: EdgeRing<LED_EDGE_SLOTS> = EdgeRing::new();
/// User button edges, in pressed polarity.
pub static BUTTON_EDGES: EdgeRing<BUTTON_EDGE_SLOTS> = EdgeRing::new();

// ── Init ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> core::result::Result<(), HwInitError> {
    // SAFETY: Called once from main() before the superloop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_gpio_inputs()?;
        init_adc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> core::result::Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> core::result::Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::BATTERY_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=battery)", pins::BATTERY_ADC_CHANNEL);
    Ok(())
}

/// Full-scale input at 12 dB attenuation, in millivolts.
const ADC_FULL_SCALE_MV: u32 = 3100;
const ADC_MAX_RAW: u32 = 4095;

/// Convert a raw 12-bit reading at the divider midpoint to battery mV.
pub fn raw_to_battery_mv(raw: u16) -> u16 {
    let pin_mv = u32::from(raw).min(ADC_MAX_RAW) * ADC_FULL_SCALE_MV / ADC_MAX_RAW;
    let battery_mv = pin_mv * pins::BATTERY_DIVIDER_NUM / pins::BATTERY_DIVIDER_DEN;
    battery_mv.min(u32::from(u16::MAX)) as u16
}

#[cfg(target_os = "espidf")]
pub fn battery_millivolts() -> Result<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), pins::BATTERY_ADC_CHANNEL, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(crate::error::Error::Adc(ret));
    }
    Ok(raw_to_battery_mv(raw.max(0) as u16))
}

/// Host builds report a full battery.
#[cfg(not(target_os = "espidf"))]
pub fn battery_millivolts() -> Result<u16> {
    Ok(crate::config::BAT_FULL_MV)
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> core::result::Result<(), HwInitError> {
    for pin in [pins::DEVICE_LED_SENSE_GPIO, pins::BUTTON_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: GPIO inputs configured (LED sense, button)");
    Ok(())
}

/// Instantaneous device LED state, in lit polarity.
#[cfg(target_os = "espidf")]
pub fn device_led_lit() -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    let high = (unsafe { gpio_get_level(pins::DEVICE_LED_SENSE_GPIO) }) != 0;
    high == pins::DEVICE_LED_LIT_LEVEL
}

#[cfg(not(target_os = "espidf"))]
pub fn device_led_lit() -> bool {
    false
}

// ── GPIO Outputs ──────────────────────────────────────────────

/// Electrical level a line idles at.
pub fn inactive_level(polarity: Polarity) -> bool {
    polarity == Polarity::ActiveLow
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> core::result::Result<(), HwInitError> {
    let outputs = [
        (pins::KILL_GPIO, pins::KILL_POLARITY),
        (pins::DEVICE_BUTTON_GPIO, pins::DEVICE_BUTTON_POLARITY),
        (pins::STATUS_LIGHT_GPIO, pins::STATUS_LIGHT_POLARITY),
        (pins::BUZZER_GPIO, pins::BUZZER_POLARITY),
    ];

    for (pin, polarity) in outputs {
        // Latch the inactive level first so enabling the driver cannot
        // glitch KILL# low.
        unsafe { gpio_set_level(pin, u32::from(inactive_level(polarity))) };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: GPIO outputs configured, KILL# released");
    Ok(())
}

/// A GPIO write rejected by ESP-IDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioWriteError(pub i32);

impl embedded_hal::digital::Error for GpioWriteError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// An output pin configured by [`init_peripherals`].
pub struct GpioOutput {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    high: bool,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            high: false,
        }
    }

    pub fn gpio(&self) -> i32 {
        self.pin
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> core::result::Result<(), GpioWriteError> {
        // SAFETY: gpio_set_level writes to an output configured in
        // init_gpio_outputs(); main loop only.
        let ret = unsafe { gpio_set_level(self.pin, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(GpioWriteError(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> core::result::Result<(), GpioWriteError> {
        self.high = high;
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = GpioWriteError;
}

impl embedded_hal::digital::OutputPin for GpioOutput {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(true)
    }
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn isr_now_us() -> u32 {
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    (unsafe { esp_timer_get_time() }) as u32
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn led_sense_isr(_arg: *mut core::ffi::c_void) {
    use crate::sensors::edge_ring::Edge;
    let timestamp_us = isr_now_us();
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let high = unsafe { gpio_get_level(pins::DEVICE_LED_SENSE_GPIO) } != 0;
    LED_EDGES.push(Edge {
        timestamp_us,
        level_after: high == pins::DEVICE_LED_LIT_LEVEL,
    });
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_isr(_arg: *mut core::ffi::c_void) {
    use crate::sensors::edge_ring::Edge;
    let timestamp_us = isr_now_us();
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let high = unsafe { gpio_get_level(pins::BUTTON_GPIO) } != 0;
    BUTTON_EDGES.push(Edge {
        timestamp_us,
        level_after: high == pins::BUTTON_PRESSED_LEVEL,
    });
}

/// Install the per-pin GPIO ISR service and register both edge handlers.
/// Call after init_peripherals() and before the superloop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> core::result::Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed
    // (acceptable). The handlers registered below only push to lock-free
    // edge rings.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for (pin, handler) in [
            (pins::DEVICE_LED_SENSE_GPIO, led_sense_isr as unsafe extern "C" fn(*mut core::ffi::c_void)),
            (pins::BUTTON_GPIO, button_isr),
        ] {
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE);
            let ret = gpio_isr_handler_add(pin, Some(handler), core::ptr::null_mut());
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrInstallFailed(ret));
            }
            gpio_intr_enable(pin);
        }

        info!("hw_init: ISR service installed (LED sense, button)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> core::result::Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;

    #[test]
    fn divider_conversion() {
        assert_eq!(raw_to_battery_mv(0), 0);
        // Full-scale input is ~9.5 V at the battery.
        assert_eq!(raw_to_battery_mv(4095), (3100_u32 * 101 / 33) as u16);
        // Out-of-range raw values clamp to full scale.
        assert_eq!(raw_to_battery_mv(u16::MAX), raw_to_battery_mv(4095));
    }

    #[test]
    fn lockout_threshold_is_resolvable() {
        // One ADC count is ~9 mV at the battery, well inside the
        // 300 mV lockout hysteresis band.
        let step = raw_to_battery_mv(2000) - raw_to_battery_mv(1999);
        assert!(step < 20);
    }

    #[test]
    fn kill_idles_high() {
        assert!(inactive_level(pins::KILL_POLARITY));
        assert!(!inactive_level(pins::STATUS_LIGHT_POLARITY));
    }

    #[test]
    fn host_gpio_output_records_level() {
        let mut pin = GpioOutput::new(pins::BUZZER_GPIO);
        pin.set_high().unwrap();
        assert!(pin.high);
        pin.set_low().unwrap();
        assert!(!pin.high);
        assert_eq!(pin.gpio(), pins::BUZZER_GPIO);
    }

    #[test]
    fn host_battery_reads_full() {
        assert_eq!(battery_millivolts(), Ok(crate::config::BAT_FULL_MV));
    }

    #[test]
    fn init_error_display() {
        assert_eq!(
            HwInitError::GpioConfigFailed(-1).to_string(),
            "GPIO config failed (rc=-1)"
        );
    }
}
