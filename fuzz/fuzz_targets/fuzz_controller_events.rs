//! Fuzz target: arbitrary event streams into `ControllerService`
//!
//! Each input byte picks an event (low nibble) and a time step (high
//! nibble, in 250 ms units) so state deadlines also get exercised. The
//! action queue is drained after every poll, as the executor would.
//!
//! Checked after every poll:
//! - lockout and the `Lockout` state always agree
//! - the power cut is only ever requested right after a completed shutdown
//!
//! cargo fuzz run fuzz_controller_events

#![no_main]

use camctl::actions::{Action, ActionId};
use camctl::app::events::AppEvent;
use camctl::app::ports::EventSink;
use camctl::app::service::ControllerService;
use camctl::error::FaultCode;
use camctl::events::{Event, EventId, Reason, Source};
use camctl::fsm::StateId;
use camctl::queue::{ActionQueue, EventQueue};
use camctl::sensors::battery::BatteryState;
use camctl::sensors::led_classifier::Pattern;
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Counter {
    shutdowns: u32,
}

impl EventSink for Counter {
    fn emit(&mut self, event: &AppEvent) {
        if *event == AppEvent::ShutdownComplete {
            self.shutdowns += 1;
        }
    }
}

fn event_for(nibble: u8) -> EventId {
    match nibble {
        0 | 1 => EventId::ShortPress { held_ms: 150 },
        2 | 3 => EventId::LongPress { held_ms: 600 },
        4 => EventId::PoweredOnIdle,
        5 => EventId::RecordStarted,
        6 => EventId::RecordStopped,
        7 => EventId::PoweredOff,
        8 => EventId::DeviceError {
            fault: FaultCode::DeviceCardFault,
            pattern: Pattern::FastBlink,
        },
        9 => EventId::DeviceError {
            fault: FaultCode::AbnormalBootSignature,
            pattern: Pattern::AbnormalBoot,
        },
        10 => EventId::BatteryStateChanged {
            state: BatteryState::Critical,
            millivolts: 6950,
        },
        11 => EventId::BatteryStateChanged {
            state: BatteryState::Half,
            millivolts: 7600,
        },
        12 => EventId::LockoutEnter { millivolts: 6700 },
        13 => EventId::LockoutExit { millivolts: 7200 },
        _ => EventId::RecordStopped,
    }
}

fuzz_target!(|data: &[u8]| {
    let events = EventQueue::new();
    let actions = ActionQueue::new();
    let mut sink = Counter::default();
    let mut svc = ControllerService::new();
    let mut now_ms: u32 = 0;
    svc.start(now_ms, &actions, &mut sink);

    for &byte in data {
        now_ms = now_ms.wrapping_add(u32::from(byte >> 4) * 250);
        let id = event_for(byte & 0x0f);
        events.push(Event::new(now_ms, id, Source::Controller, Reason::Internal));

        let shutdowns = sink.shutdowns;
        svc.poll(now_ms, &events, &actions, &mut sink);

        let mut kill = false;
        actions.drain(|a: Action| kill |= a.id == ActionId::AssertKill);
        if kill {
            assert!(sink.shutdowns > shutdowns, "power cut without a completed shutdown");
        }
        assert_eq!(svc.lockout_active(), svc.state() == StateId::Lockout);
    }
});
