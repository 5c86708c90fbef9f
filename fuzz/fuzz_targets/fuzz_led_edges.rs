//! Fuzz target: LED edge stream → `LedClassifier` → `StatusInterpreter`
//!
//! Every 3 input bytes are one edge: a little-endian gap in milliseconds
//! (the top bit of the second byte makes it a sub-millisecond gap, to hit
//! the glitch filter) and a level byte. The stream is fed through the
//! edge ring exactly as the ISR would, with polls in between.
//!
//! cargo fuzz run fuzz_led_edges

#![no_main]

use camctl::clock::Tick;
use camctl::events::EventId;
use camctl::queue::EventQueue;
use camctl::sensors::device_status::StatusInterpreter;
use camctl::sensors::edge_ring::{Edge, EdgeRing};
use camctl::sensors::led_classifier::{LedClassifier, Pattern};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let ring: EdgeRing<32> = EdgeRing::new();
    let events = EventQueue::new();
    let mut cls = LedClassifier::new(Tick::default(), false);
    let mut interp = StatusInterpreter::new();

    let mut now_us: u64 = 0;
    let mut lit = false;
    let mut stopped = 0u32;
    let mut started = 0u32;

    for chunk in data.chunks_exact(3) {
        let raw = u16::from_le_bytes([chunk[0], chunk[1] & 0x7f]);
        now_us += if chunk[1] & 0x80 != 0 {
            u64::from(raw % 1000)
        } else {
            u64::from(raw) * 1000
        };
        lit = chunk[2] & 1 != 0;
        ring.push(Edge {
            timestamp_us: now_us as u32,
            level_after: lit,
        });

        let now = Tick::from_micros(now_us);
        let before = cls.pattern();
        let pattern = cls.poll(now, lit, &ring);
        interp.poll(now.ms, pattern, &events);

        while let Some(ev) = events.pop() {
            match ev.id {
                EventId::RecordStopped => {
                    assert_eq!(before, Pattern::SlowBlink, "stop without a slow blink");
                    stopped += 1;
                }
                EventId::RecordStarted => started += 1,
                _ => {}
            }
        }
        assert!(stopped <= started, "more stops than starts");
        assert!(ring.is_empty(), "poll must drain the ring");
    }

    // A long quiet spell always settles to the held level.
    let now = Tick::from_micros(now_us + 10_000_000);
    let steady = if lit { Pattern::Solid } else { Pattern::Off };
    assert_eq!(cls.poll(now, lit, &ring), steady);
});
