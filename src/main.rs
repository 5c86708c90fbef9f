//! Camera-module controller firmware: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  GPIO ISRs ──▶ EdgeRings     EspTimeAdapter   LogEventSink    │
//! │  ADC1 battery sense          GpioOutput × 4   TraceRecorder   │
//! │                                                               │
//! │  ──────────────── Port / queue boundary ────────────────      │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │  Pipeline (pure logic, polled)                          │  │
//! │  │  Button · Classifier · Interpreter · Battery            │  │
//! │  │  ControllerService (FSM) · Executor                     │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{debug, error, info, warn};

use camctl::adapters::log_sink::LogEventSink;
use camctl::adapters::time::EspTimeAdapter;
use camctl::clock::deadline_reached;
use camctl::config::{BAT_FULL_MV, DIAGNOSTICS_INTERVAL_MS, Timings};
use camctl::diagnostics::TraceRecorder;
use camctl::drivers::hw_init::{self, BUTTON_EDGES, GpioOutput, LED_EDGES};
use camctl::drivers::outputs::OutputLine;
use camctl::pins;
use camctl::pipeline::{Channels, Outputs, Pipeline};
use camctl::queue::{ActionQueue, EventQueue};

static EVENTS: EventQueue = EventQueue::new();
static ACTIONS: ActionQueue = ActionQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("camctl v{}", env!("CARGO_PKG_VERSION"));
    match serde_json::to_string(&Timings::DEFAULT) {
        Ok(json) => info!("Timings: {}", json),
        Err(e) => warn!("Timings: render failed ({})", e),
    }

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Outputs are in an unknown state. The task watchdog resets us.
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service() {
        error!("ISR service init failed: {}, running without inputs", e);
    }

    // ── 3. Pipeline ───────────────────────────────────────────
    let time = EspTimeAdapter::new();
    let channels = Channels {
        events: &EVENTS,
        actions: &ACTIONS,
        led_edges: &LED_EDGES,
        button_edges: &BUTTON_EDGES,
    };
    let outputs = Outputs {
        light: OutputLine::new(
            GpioOutput::new(pins::STATUS_LIGHT_GPIO),
            pins::STATUS_LIGHT_POLARITY,
            "light",
        ),
        buzzer: OutputLine::new(GpioOutput::new(pins::BUZZER_GPIO), pins::BUZZER_POLARITY, "buzzer"),
        device_button: OutputLine::new(
            GpioOutput::new(pins::DEVICE_BUTTON_GPIO),
            pins::DEVICE_BUTTON_POLARITY,
            "device-button",
        ),
        kill: OutputLine::new(GpioOutput::new(pins::KILL_GPIO), pins::KILL_POLARITY, "kill"),
    };

    let mut sink = (LogEventSink::new(), TraceRecorder::new());
    let mut pipeline = Pipeline::new(channels, outputs, time.now(), hw_init::device_led_lit());
    pipeline.start(time.now(), &mut sink);

    info!("System ready. Entering superloop.");

    // ── 4. Superloop ──────────────────────────────────────────
    // Until the ADC has answered once, a failed read must not look like a
    // flat battery.
    let mut last_good_mv = BAT_FULL_MV;
    let mut next_dump_ms = time.now().ms.wrapping_add(DIAGNOSTICS_INTERVAL_MS);
    loop {
        let now = time.now();
        let read_battery = || match hw_init::battery_millivolts() {
            Ok(mv) => {
                last_good_mv = mv;
                mv
            }
            Err(e) => {
                warn!("Battery: {}, reusing {} mV", e, last_good_mv);
                last_good_mv
            }
        };
        pipeline.poll(now, hw_init::device_led_lit(), read_battery, &mut sink);

        if deadline_reached(now.ms, next_dump_ms) {
            next_dump_ms = now.ms.wrapping_add(DIAGNOSTICS_INTERVAL_MS);
            match pipeline.snapshot(now.ms, &sink.1).to_json() {
                Ok(json) => debug!("Diagnostics: {}", json),
                Err(e) => warn!("Diagnostics: render failed ({})", e),
            }
        }

        // Yield so the idle task runs.
        FreeRtos::delay_ms(1);
    }
}
