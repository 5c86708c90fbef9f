//! Lock-free single-producer/single-consumer edge buffer.
//!
//! The GPIO interrupt handler is the only producer: it captures a
//! timestamp and the line level and pushes one [`Edge`]. The poll-side
//! decoder is the only consumer. Head and tail are single bytes, so the
//! shared indices are read and written atomically without masking
//! interrupts on either side.
//!
//! ```text
//!   ISR ──push()──▶ [ e0 | e1 | e2 | .. ] ──pop()──▶ classifier / decoder
//!                    ▲head          ▲tail
//! ```

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, AtomicU16, Ordering};

/// A level change captured in interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edge {
    pub timestamp_us: u32,
    pub level_after: bool,
}

pub struct EdgeRing<const N: usize> {
    head: AtomicU8,
    tail: AtomicU8,
    overflows: AtomicU16,
    buf: UnsafeCell<[Edge; N]>,
}

// SAFETY: slot `head` is written only by the single producer before it
// publishes the new head with Release; slot `tail` is read only by the
// single consumer after it observes that head with Acquire. The two sides
// never touch the same slot concurrently.
unsafe impl<const N: usize> Sync for EdgeRing<N> {}

impl<const N: usize> EdgeRing<N> {
    const SLOTS_OK: () = assert!(
        N >= 8 && N <= 128 && N.is_power_of_two(),
        "edge ring must hold 8..=128 slots, power of two"
    );
    const MASK: u8 = (N - 1) as u8;

    pub const fn new() -> Self {
        let () = Self::SLOTS_OK;
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            overflows: AtomicU16::new(0),
            buf: UnsafeCell::new(
                [Edge {
                    timestamp_us: 0,
                    level_after: false,
                }; N],
            ),
        }
    }

    /// Producer side. Safe to call from interrupt context.
    /// A full ring drops the new edge.
    pub fn push(&self, edge: Edge) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next = head.wrapping_add(1) & Self::MASK;
        if next == tail {
            // fetch_update keeps the counter saturating at u16::MAX.
            let _ = self
                .overflows
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1));
            return false;
        }
        // SAFETY: see the `Sync` impl; only the producer writes slot `head`.
        unsafe {
            (*self.buf.get())[head as usize] = edge;
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<Edge> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        // SAFETY: see the `Sync` impl; slot `tail` was published by the producer.
        let edge = unsafe { (*self.buf.get())[tail as usize] };
        self.tail.store(tail.wrapping_add(1) & Self::MASK, Ordering::Release);
        Some(edge)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head.wrapping_sub(tail) & Self::MASK) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Edges dropped because the consumer fell behind.
    pub fn overflows(&self) -> u16 {
        self.overflows.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for EdgeRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(t: u32, level: bool) -> Edge {
        Edge {
            timestamp_us: t,
            level_after: level,
        }
    }

    #[test]
    fn pops_in_push_order() {
        let ring: EdgeRing<8> = EdgeRing::new();
        ring.push(edge(1, true));
        ring.push(edge(2, false));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop(), Some(edge(1, true)));
        assert_eq!(ring.pop(), Some(edge(2, false)));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn overflow_drops_newest_and_keeps_indices_sane() {
        let ring: EdgeRing<8> = EdgeRing::new();
        for t in 0..7 {
            assert!(ring.push(edge(t, t % 2 == 0)));
        }
        assert!(!ring.push(edge(99, true)));
        assert_eq!(ring.overflows(), 1);
        assert_eq!(ring.len(), 7);
        for t in 0..7 {
            assert_eq!(ring.pop().map(|e| e.timestamp_us), Some(t));
        }
        assert!(ring.is_empty());
        assert!(ring.push(edge(100, true)));
        assert_eq!(ring.pop().map(|e| e.timestamp_us), Some(100));
    }
}
