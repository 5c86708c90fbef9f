//! Mock hardware for integration tests.
//!
//! Records every output write so tests can assert on line history without
//! touching real GPIO registers, and simulates the device status LED and
//! user button as edge streams with host-controlled time.

use core::convert::Infallible;

use camctl::app::events::AppEvent;
use camctl::app::ports::EventSink;
use camctl::clock::Tick;
use camctl::config::{BUTTON_EDGE_SLOTS, LED_EDGE_SLOTS};
use camctl::diagnostics::TraceRecorder;
use camctl::drivers::outputs::{OutputLine, Polarity};
use camctl::fsm::StateId;
use camctl::pipeline::{Channels, Outputs, Pipeline};
use camctl::queue::{ActionQueue, EventQueue};
use camctl::sensors::edge_ring::{Edge, EdgeRing};
use embedded_hal::digital::{ErrorType, OutputPin};

// ── MockPin ───────────────────────────────────────────────────

/// An output pin that remembers every level written to it.
#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
    pub writes: Vec<bool>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rising edges seen so far.
    pub fn pulses(&self) -> usize {
        self.writes.windows(2).filter(|w| !w[0] && w[1]).count()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.writes.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.writes.push(true);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Captures every [`AppEvent`] the controller emits.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Every state entered, in order.
    pub fn states(&self) -> Vec<StateId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Simulated device LED ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedDrive {
    Steady(bool),
    /// Square wave starting lit at `from_ms`.
    Blink { from_ms: u32, period_ms: u32, on_ms: u32 },
}

impl LedDrive {
    fn level_at(self, t_ms: u32) -> bool {
        match self {
            Self::Steady(lit) => lit,
            Self::Blink {
                from_ms,
                period_ms,
                on_ms,
            } => (t_ms.wrapping_sub(from_ms) % period_ms) < on_ms,
        }
    }
}

// ── Bench ─────────────────────────────────────────────────────

/// Queues and rings the pipeline borrows. Leaked so the bench can own
/// the pipeline without a self-referential struct.
pub struct Wiring {
    pub events: EventQueue,
    pub actions: ActionQueue,
    pub led_edges: EdgeRing<LED_EDGE_SLOTS>,
    pub button_edges: EdgeRing<BUTTON_EDGE_SLOTS>,
}

pub type BenchPipeline = Pipeline<'static, MockPin, MockPin, MockPin, MockPin>;

pub struct Bench {
    pub wiring: &'static Wiring,
    pub pipeline: BenchPipeline,
    pub sink: (RecordingSink, TraceRecorder),
    pub now_ms: u32,
    pub battery_mv: u16,
    pub led: LedDrive,
    lit: bool,
}

#[allow(dead_code)]
impl Bench {
    /// Device dark, battery healthy, controller started at t = 0.
    pub fn new() -> Self {
        let wiring: &'static Wiring = Box::leak(Box::new(Wiring {
            events: EventQueue::new(),
            actions: ActionQueue::new(),
            led_edges: EdgeRing::new(),
            button_edges: EdgeRing::new(),
        }));
        let channels = Channels {
            events: &wiring.events,
            actions: &wiring.actions,
            led_edges: &wiring.led_edges,
            button_edges: &wiring.button_edges,
        };
        let outputs = Outputs {
            light: OutputLine::new(MockPin::new(), Polarity::ActiveHigh, "light"),
            buzzer: OutputLine::new(MockPin::new(), Polarity::ActiveHigh, "buzzer"),
            device_button: OutputLine::new(MockPin::new(), Polarity::ActiveHigh, "device-button"),
            kill: OutputLine::new(MockPin::new(), Polarity::ActiveLow, "kill"),
        };
        let mut bench = Self {
            wiring,
            pipeline: Pipeline::new(channels, outputs, Tick::default(), false),
            sink: (RecordingSink::new(), TraceRecorder::new()),
            now_ms: 0,
            battery_mv: 8300,
            led: LedDrive::Steady(false),
            lit: false,
        };
        bench.pipeline.start(Tick::default(), &mut bench.sink);
        bench
    }

    pub fn state(&self) -> StateId {
        self.pipeline.controller().state()
    }

    pub fn recorder(&self) -> &RecordingSink {
        &self.sink.0
    }

    /// Step one millisecond: feed the LED line, then poll.
    pub fn step(&mut self) {
        self.now_ms += 1;
        let level = self.led.level_at(self.now_ms);
        if level != self.lit {
            self.lit = level;
            self.wiring.led_edges.push(Edge {
                timestamp_us: self.now_ms * 1000,
                level_after: level,
            });
        }
        let mv = self.battery_mv;
        let now = Tick::from_millis(u64::from(self.now_ms));
        self.pipeline.poll(now, self.lit, || mv, &mut self.sink);
    }

    pub fn advance(&mut self, ms: u32) {
        for _ in 0..ms {
            self.step();
        }
    }

    pub fn advance_to(&mut self, t_ms: u32) {
        while self.now_ms < t_ms {
            self.step();
        }
    }

    /// Step until `done` holds or `limit_ms` more have passed.
    pub fn advance_until(&mut self, limit_ms: u32, done: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..limit_ms {
            if done(self) {
                return true;
            }
            self.step();
        }
        done(self)
    }

    /// Hold the user button for `ms`, then release and settle briefly.
    pub fn hold_button(&mut self, ms: u32) {
        self.button_edge(true);
        self.advance(ms);
        self.button_edge(false);
        self.advance(5);
    }

    pub fn button_edge(&mut self, pressed: bool) {
        self.wiring.button_edges.push(Edge {
            timestamp_us: self.now_ms * 1000,
            level_after: pressed,
        });
    }

    /// Fast blink from now, the device's boot presentation.
    pub fn led_fast_blink(&mut self) {
        self.led = LedDrive::Blink {
            from_ms: self.now_ms + 1,
            period_ms: 200,
            on_ms: 100,
        };
    }

    /// Slow blink from now, the device's recording presentation.
    pub fn led_slow_blink(&mut self) {
        self.led = LedDrive::Blink {
            from_ms: self.now_ms + 1,
            period_ms: 1000,
            on_ms: 500,
        };
    }

    pub fn device_button(&self) -> &MockPin {
        self.pipeline.executor().press_line().pin()
    }

    pub fn kill_pin(&self) -> &MockPin {
        self.pipeline.executor().kill_line().pin()
    }

    pub fn light_pin(&self) -> &MockPin {
        self.pipeline.executor().light_line().pin()
    }

    pub fn buzzer_pin(&self) -> &MockPin {
        self.pipeline.executor().buzzer_line().pin()
    }
}
