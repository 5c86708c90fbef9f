//! Fuzz target: `RingQueue` push/pop sequences
//!
//! Each byte is one operation: even bytes push a running sequence number,
//! odd bytes pop. A shadow `VecDeque` with the same drop-new policy must
//! agree with the queue after every step.
//!
//! cargo fuzz run fuzz_queue_ops

#![no_main]

use std::collections::VecDeque;

use camctl::queue::RingQueue;
use libfuzzer_sys::fuzz_target;

type Ring = RingQueue<u32, 8>;

fuzz_target!(|data: &[u8]| {
    let mut q = Ring::new();
    let mut shadow: VecDeque<u32> = VecDeque::new();
    let mut dropped = 0u16;
    let mut seq = 0u32;

    for &op in data {
        if op & 1 == 0 {
            seq += 1;
            let accepted = q.push(seq);
            assert_eq!(accepted, shadow.len() < Ring::CAPACITY);
            if accepted {
                shadow.push_back(seq);
            } else {
                dropped = dropped.saturating_add(1);
            }
        } else {
            assert_eq!(q.pop(), shadow.pop_front());
        }
        assert_eq!(q.count(), shadow.len());
        assert_eq!(q.is_empty(), shadow.is_empty());
        assert_eq!(q.dropped(), dropped);
    }
});
