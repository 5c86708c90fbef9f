//! Controller scenarios driven by injected events.
//!
//! These bypass the sensors and feed the event queue directly, then check
//! what lands on the action queue and which state the FSM settles in.

use camctl::actions::{Action, ActionId, BeepPattern, LightPattern, PressKind};
use camctl::app::events::{AppEvent, DiscardReason};
use camctl::app::service::ControllerService;
use camctl::config::BOOT_TIMEOUT_MS;
use camctl::error::FaultCode;
use camctl::events::{Event, EventId, Reason, Source};
use camctl::fsm::StateId;
use camctl::queue::{ActionQueue, EventQueue};
use camctl::sensors::battery::BatteryState;
use camctl::sensors::led_classifier::Pattern;

use crate::mock_hw::RecordingSink;

const SHORT: EventId = EventId::ShortPress { held_ms: 150 };
const LONG: EventId = EventId::LongPress { held_ms: 600 };

struct Rig {
    svc: ControllerService,
    events: EventQueue,
    actions: ActionQueue,
    sink: RecordingSink,
    now_ms: u32,
}

impl Rig {
    fn new() -> Self {
        let mut rig = Self {
            svc: ControllerService::new(),
            events: EventQueue::new(),
            actions: ActionQueue::new(),
            sink: RecordingSink::new(),
            now_ms: 0,
        };
        rig.svc.start(0, &rig.actions, &mut rig.sink);
        rig.take();
        rig
    }

    /// Inject one event 10 ms after the last and return the actions queued.
    fn inject(&mut self, id: EventId) -> Vec<ActionId> {
        self.now_ms += 10;
        let source = if matches!(id, EventId::ShortPress { .. } | EventId::LongPress { .. }) {
            Source::Button
        } else {
            Source::DeviceStatus
        };
        assert!(self.events.push(Event::new(self.now_ms, id, source, Reason::Internal)));
        self.svc.poll(self.now_ms, &self.events, &self.actions, &mut self.sink);
        self.take()
    }

    fn idle_for(&mut self, ms: u32) -> Vec<ActionId> {
        self.now_ms += ms;
        self.svc.poll(self.now_ms, &self.events, &self.actions, &mut self.sink);
        self.take()
    }

    fn take(&mut self) -> Vec<ActionId> {
        let mut out = Vec::new();
        self.actions.drain(|a: Action| out.push(a.id));
        out
    }

    fn state(&self) -> StateId {
        self.svc.state()
    }

    fn to_idle(&mut self) {
        self.inject(LONG);
        self.inject(EventId::PoweredOnIdle);
        assert_eq!(self.state(), StateId::Idle);
        self.take();
    }

    fn to_recording(&mut self) {
        self.to_idle();
        self.inject(SHORT);
        self.inject(EventId::RecordStarted);
        assert_eq!(self.state(), StateId::Recording);
        self.take();
    }
}

fn press(kind: PressKind) -> ActionId {
    ActionId::DevicePress(kind)
}

#[test]
fn power_on_then_start_recording() {
    let mut rig = Rig::new();

    let acts = rig.inject(LONG);
    assert_eq!(acts.first(), Some(&press(PressKind::Long)));
    assert_eq!(rig.state(), StateId::Booting);

    let acts = rig.inject(EventId::PoweredOnIdle);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(acts.contains(&ActionId::Beep(BeepPattern::Triple)));
    assert!(acts.contains(&ActionId::Light(LightPattern::Solid)));

    let acts = rig.inject(SHORT);
    assert_eq!(acts, [press(PressKind::Short)]);
    assert_eq!(rig.state(), StateId::Idle);

    // Nothing changes until the device confirms.
    assert!(rig.idle_for(2_000).is_empty());
    assert_eq!(rig.state(), StateId::Idle);

    let acts = rig.inject(EventId::RecordStarted);
    assert_eq!(rig.state(), StateId::Recording);
    assert!(acts.contains(&ActionId::Beep(BeepPattern::Double)));
    assert!(acts.contains(&ActionId::Light(LightPattern::SlowBlink)));
}

#[test]
fn long_press_while_recording_stops_then_powers_off() {
    let mut rig = Rig::new();
    rig.to_recording();

    let acts = rig.inject(LONG);
    assert_eq!(acts, [press(PressKind::Short)]);
    assert_eq!(rig.state(), StateId::Recording);
    assert!(rig.svc.shutdown_pending());

    let acts = rig.inject(EventId::RecordStopped);
    assert_eq!(rig.state(), StateId::Idle);
    assert!(acts.contains(&press(PressKind::Long)), "power-off must follow on its own");
    assert!(rig.svc.shutdown_pending());

    let acts = rig.inject(EventId::PoweredOff);
    assert_eq!(rig.state(), StateId::Off);
    assert!(acts.contains(&ActionId::AssertKill));
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ShutdownComplete), 1);
}

#[test]
fn gestures_during_shutdown_are_discarded() {
    let mut rig = Rig::new();
    rig.to_recording();
    rig.inject(LONG);

    assert!(rig.inject(SHORT).is_empty());
    assert!(rig.inject(LONG).is_empty());
    assert_eq!(rig.svc.events_discarded(), 2);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::EventDiscarded {
                reason: DiscardReason::ShutdownPending,
                ..
            }
        )),
        2
    );
}

#[test]
fn boot_timeout_faults() {
    let mut rig = Rig::new();
    rig.inject(LONG);
    let acts = rig.idle_for(BOOT_TIMEOUT_MS);
    assert_eq!(rig.state(), StateId::Error);
    assert!(acts.contains(&ActionId::Light(LightPattern::Error)));
    assert!(acts.contains(&ActionId::Beep(BeepPattern::ErrorFast)));
    assert_eq!(rig.svc.last_fault(), Some(FaultCode::BootTimeout));
    assert!(rig.sink.events.contains(&AppEvent::FaultRaised(FaultCode::BootTimeout)));
}

#[test]
fn card_fault_while_recording() {
    let mut rig = Rig::new();
    rig.to_recording();
    rig.inject(EventId::DeviceError {
        fault: FaultCode::DeviceCardFault,
        pattern: Pattern::FastBlink,
    });
    assert_eq!(rig.state(), StateId::Error);
    assert_eq!(rig.svc.last_fault(), Some(FaultCode::DeviceCardFault));

    // Long press is the way out.
    let acts = rig.inject(LONG);
    assert_eq!(acts, [press(PressKind::Long)]);
    rig.inject(EventId::PoweredOff);
    assert_eq!(rig.state(), StateId::Off);
}

fn lockout_from(rig: &mut Rig) {
    rig.inject(EventId::LockoutEnter { millivolts: 6700 });
    assert_eq!(rig.state(), StateId::Lockout);
    assert!(rig.svc.lockout_active());

    for gesture in [SHORT, LONG, SHORT, LONG] {
        assert!(rig.inject(gesture).is_empty());
        assert_eq!(rig.state(), StateId::Lockout);
    }

    rig.inject(EventId::LockoutExit { millivolts: 7200 });
    assert_eq!(rig.state(), StateId::Off);
    assert!(!rig.svc.lockout_active());

    // Input works again.
    rig.inject(LONG);
    assert_eq!(rig.state(), StateId::Booting);
}

#[test]
fn lockout_dominates_every_state() {
    let setups: [(StateId, fn(&mut Rig)); 6] = [
        (StateId::Off, |_| {}),
        (StateId::Booting, |r| {
            r.inject(LONG);
        }),
        (StateId::Idle, Rig::to_idle),
        (StateId::Recording, Rig::to_recording),
        (StateId::LowBattery, |r| {
            r.to_idle();
            r.inject(EventId::BatteryStateChanged {
                state: BatteryState::Critical,
                millivolts: 6950,
            });
        }),
        (StateId::Error, |r| {
            r.inject(LONG);
            r.idle_for(BOOT_TIMEOUT_MS);
        }),
    ];
    for (expected, setup) in setups {
        let mut rig = Rig::new();
        setup(&mut rig);
        assert_eq!(rig.state(), expected);
        lockout_from(&mut rig);
        assert_eq!(
            rig.sink.count(|e| matches!(
                e,
                AppEvent::EventDiscarded {
                    reason: DiscardReason::Lockout,
                    ..
                }
            )),
            4,
            "from {:?}",
            expected
        );
    }
}

#[test]
fn critical_battery_while_recording() {
    let mut rig = Rig::new();
    rig.to_recording();
    let acts = rig.inject(EventId::BatteryStateChanged {
        state: BatteryState::Critical,
        millivolts: 6950,
    });
    assert_eq!(rig.state(), StateId::LowBattery);
    assert!(acts.contains(&ActionId::Beep(BeepPattern::LowBattery)));
    assert_eq!(rig.svc.battery(), BatteryState::Critical);
}

#[test]
fn critical_after_lockout_keeps_lockout_presentation() {
    let mut rig = Rig::new();
    rig.to_recording();
    let mut acts = rig.inject(EventId::LockoutEnter { millivolts: 6700 });
    acts.extend(rig.inject(EventId::BatteryStateChanged {
        state: BatteryState::Critical,
        millivolts: 6700,
    }));
    assert_eq!(rig.state(), StateId::Lockout);
    assert!(!acts.contains(&ActionId::Beep(BeepPattern::LowBattery)));
    assert!(!rig.sink.states().contains(&StateId::LowBattery));
}
