//! Whole-pipeline scenarios: simulated LED and button edges in, mock
//! output lines out, with time stepped one millisecond at a time.

use camctl::actions::LightPattern;
use camctl::app::events::AppEvent;
use camctl::config::{BAT_STABLE_SAMPLES, BATTERY_SAMPLE_MS, DEVICE_PRESS_LONG_MS};
use camctl::error::FaultCode;
use camctl::fsm::StateId;
use camctl::sensors::battery::BatteryState;
use camctl::sensors::led_classifier::Pattern;

use crate::mock_hw::{Bench, LedDrive};

/// Power the device on and wait for it to report idle.
fn boot(bench: &mut Bench) {
    bench.advance_to(2_000);
    bench.hold_button(600);
    assert_eq!(bench.state(), StateId::Booting);

    // The device starts blinking once the power-on press has landed.
    assert!(bench.advance_until(DEVICE_PRESS_LONG_MS + 100, |b| b.device_button().high));
    bench.led_fast_blink();
    bench.advance(3_000);
    bench.led = LedDrive::Steady(true);

    assert!(bench.advance_until(5_000, |b| b.state() == StateId::Idle));
}

#[test]
fn dark_device_settles_to_off_without_leaving_off() {
    let mut bench = Bench::new();
    bench.advance(2_000);
    assert_eq!(bench.pipeline.classifier().pattern(), Pattern::Off);
    assert_eq!(bench.state(), StateId::Off);
    assert!(!bench.device_button().high);
    assert!(bench.kill_pin().high, "kill line is active-low and must idle high");
}

#[test]
fn power_on_record_and_shut_down() {
    let mut bench = Bench::new();
    boot(&mut bench);
    assert_eq!(bench.pipeline.executor().light_pattern(), LightPattern::Solid);
    assert_eq!(bench.pipeline.executor().presses_completed(), 1);

    // Short press starts a recording.
    bench.advance(1_000);
    bench.hold_button(150);
    assert!(bench.advance_until(100, |b| b.device_button().high));
    bench.advance(1_000);
    bench.led_slow_blink();
    assert!(bench.advance_until(4_000, |b| b.state() == StateId::Recording));
    assert!(bench.pipeline.interpreter().recording());

    // Long press: stop, then power off without further input.
    bench.advance(1_000);
    bench.hold_button(600);
    assert_eq!(bench.state(), StateId::Recording);
    assert!(bench.pipeline.controller().shutdown_pending());

    bench.advance(1_500);
    bench.led = LedDrive::Steady(true);
    assert!(bench.advance_until(5_000, |b| b.state() == StateId::Idle));
    assert!(bench.pipeline.controller().shutdown_pending());

    // Power-off press lands, then the device goes dark.
    assert!(bench.advance_until(1_000, |b| b.device_button().high));
    assert!(bench.advance_until(DEVICE_PRESS_LONG_MS + 100, |b| !b.device_button().high));
    bench.led = LedDrive::Steady(false);
    assert!(bench.advance_until(3_000, |b| b.state() == StateId::Off));

    bench.advance(10);
    assert!(bench.pipeline.executor().killed());
    assert!(!bench.kill_pin().high);
    assert_eq!(
        bench.recorder().states(),
        [
            StateId::Booting,
            StateId::Idle,
            StateId::Recording,
            StateId::Idle,
            StateId::Off
        ]
    );
    assert_eq!(bench.recorder().count(|e| *e == AppEvent::ShutdownComplete), 1);
    assert_eq!(bench.pipeline.executor().presses_completed(), 4);
}

#[test]
fn persistent_fast_blink_is_a_card_fault() {
    let mut bench = Bench::new();
    boot(&mut bench);

    bench.led_fast_blink();
    assert!(bench.advance_until(12_000, |b| b.state() == StateId::Error));
    assert_eq!(
        bench.pipeline.controller().last_fault(),
        Some(FaultCode::DeviceCardFault)
    );
    assert_eq!(bench.pipeline.executor().light_pattern(), LightPattern::Error);
    assert!(bench.buzzer_pin().pulses() > 0);
}

#[test]
fn sagging_battery_locks_out_input() {
    let mut bench = Bench::new();
    boot(&mut bench);

    bench.battery_mv = 6_700;
    let settle = BATTERY_SAMPLE_MS * (u32::from(BAT_STABLE_SAMPLES) + 1);
    assert!(bench.advance_until(settle, |b| b.state() == StateId::Lockout));
    assert_eq!(bench.pipeline.battery().state(), BatteryState::Critical);
    // The same sample crossed both thresholds; lockout wins outright.
    assert!(!bench.recorder().states().contains(&StateId::LowBattery));

    let presses = bench.pipeline.executor().presses_completed();
    bench.hold_button(150);
    bench.advance(500);
    bench.hold_button(700);
    bench.advance(4_000);
    assert_eq!(bench.state(), StateId::Lockout);
    assert_eq!(bench.pipeline.executor().presses_completed(), presses);
    assert_eq!(bench.pipeline.controller().events_discarded(), 2);

    bench.battery_mv = 7_400;
    assert!(bench.advance_until(settle, |b| b.state() == StateId::Off));
}

#[test]
fn snapshot_reflects_the_run() {
    let mut bench = Bench::new();
    boot(&mut bench);

    let snap = bench.pipeline.snapshot(bench.now_ms, &bench.sink.1);
    assert_eq!(snap.state, StateId::Idle);
    assert_eq!(snap.pattern, Pattern::Solid);
    assert_eq!(snap.light, LightPattern::Solid);
    assert_eq!(snap.transitions, 2);
    assert_eq!(snap.events_dropped, 0);
    assert!(!snap.trace.is_empty());

    let json = snap.to_json().unwrap();
    assert!(json.contains("\"state\":\"Idle\""));
}
