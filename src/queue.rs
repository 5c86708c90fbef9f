//! Bounded, drop-new ring queues shared between interrupt and main context.
//!
//! ```text
//! ┌─────────────┐  push_in(cs)  ┌──────────────┐  pop()   ┌────────────┐
//! │ ISR context │──────────────▶│              │─────────▶│ single     │
//! │ main loop   │──────────────▶│   IsrQueue   │          │ consumer   │
//! └─────────────┘    push()     └──────────────┘          └────────────┘
//! ```
//!
//! [`RingQueue`] is the plain data structure; [`IsrQueue`] wraps it in a
//! `critical_section::Mutex` so a shared `static` can be written from an
//! interrupt handler and drained from the main loop. A full queue rejects
//! the new item and bumps a saturating counter: the oldest items are never
//! overwritten and nothing ever blocks.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};

use crate::actions::Action;
use crate::config::{ACTION_QUEUE_SLOTS, EVENT_QUEUE_SLOTS};
use crate::events::Event;

/// Controller input queue.
pub type EventQueue = IsrQueue<Event, EVENT_QUEUE_SLOTS>;
/// Executor input queue.
pub type ActionQueue = IsrQueue<Action, ACTION_QUEUE_SLOTS>;

// ── Plain ring ────────────────────────────────────────────────

/// Fixed ring of `N` slots. One slot is kept free to tell full from empty,
/// so at most [`Self::CAPACITY`] items are held.
pub struct RingQueue<T, const N: usize> {
    buf: [Option<T>; N],
    head: usize,
    tail: usize,
    dropped: u16,
}

impl<T: Copy, const N: usize> RingQueue<T, N> {
    const SLOTS_OK: () = assert!(
        N > 1 && N.is_power_of_two(),
        "queue slot count must be a power of two greater than one"
    );
    const MASK: usize = N - 1;

    /// Items that fit before pushes start failing.
    pub const CAPACITY: usize = N - 1;

    pub const fn new() -> Self {
        let () = Self::SLOTS_OK;
        Self {
            buf: [None; N],
            head: 0,
            tail: 0,
            dropped: 0,
        }
    }

    /// Append `item`. Returns `false` (and counts a drop) when full.
    pub fn push(&mut self, item: T) -> bool {
        let next = (self.head + 1) & Self::MASK;
        if next == self.tail {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        self.buf[self.head] = Some(item);
        self.head = next;
        true
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let item = self.buf[self.tail].take();
        self.tail = (self.tail + 1) & Self::MASK;
        item
    }

    pub fn count(&self) -> usize {
        self.head.wrapping_sub(self.tail) & Self::MASK
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T: Copy, const N: usize> Default for RingQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Interrupt-safe wrapper ────────────────────────────────────

/// A [`RingQueue`] behind a critical-section mutex.
///
/// Every method except [`push_in`](Self::push_in) masks interrupts for the
/// duration of the access. `push_in` borrows the caller's critical section
/// instead, for use inside an interrupt handler that already runs with
/// interrupts masked.
pub struct IsrQueue<T, const N: usize> {
    inner: Mutex<RefCell<RingQueue<T, N>>>,
}

impl<T: Copy, const N: usize> IsrQueue<T, N> {
    pub const CAPACITY: usize = RingQueue::<T, N>::CAPACITY;

    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingQueue::new())),
        }
    }

    /// Push from normal context.
    pub fn push(&self, item: T) -> bool {
        critical_section::with(|cs| self.push_in(cs, item))
    }

    /// Push from a context that already holds a critical section.
    pub fn push_in(&self, cs: CriticalSection<'_>, item: T) -> bool {
        self.inner.borrow_ref_mut(cs).push(item)
    }

    pub fn pop(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop())
    }

    pub fn count(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).count())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn dropped(&self) -> u16 {
        critical_section::with(|cs| self.inner.borrow_ref(cs).dropped())
    }

    /// Drain every pending item into `handler`, FIFO.
    ///
    /// Each pop takes its own critical section so interrupts are never
    /// held off across the handler.
    pub fn drain(&self, mut handler: impl FnMut(T)) {
        while let Some(item) = self.pop() {
            handler(item);
        }
    }
}

impl<T: Copy, const N: usize> Default for IsrQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
