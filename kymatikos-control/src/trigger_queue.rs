//! Lock-free queue carrying note triggers from the audio context to the
//! control context.
//!
//! The audio context pushes every [`NoteTrigger`] the arpeggiator fires; the
//! control loop drains them each tick to blink pad LEDs, fire gate pulses and
//! move the pitch CV. A push never blocks: when the queue is full the trigger
//! is counted as dropped and the audio context carries on.
//!
//! # Contract
//!
//! - Only the audio context calls [`push()`](TriggerQueue::push).
//! - Only the control context calls [`pop()`](TriggerQueue::pop) and
//!   [`take_dropped()`](TriggerQueue::take_dropped).

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::arp::NoteTrigger;

/// Default number of slots (usable capacity is one less).
pub const TRIGGER_QUEUE_SLOTS: usize = 16;

/// Single-producer single-consumer ring of [`NoteTrigger`]s.
///
/// One slot stays empty to tell full from empty, so `N` slots hold `N - 1`
/// triggers.
pub struct TriggerQueue<const N: usize = TRIGGER_QUEUE_SLOTS> {
    slots: [UnsafeCell<NoteTrigger>; N],
    /// Next slot to write (audio context only).
    head: AtomicUsize,
    /// Next slot to read (control context only).
    tail: AtomicUsize,
    /// Triggers discarded because the queue was full.
    dropped: AtomicU32,
}

// SAFETY: the producer writes only the slot at `head` and publishes it with a
// release store; the consumer reads only slots between `tail` and `head`.
unsafe impl<const N: usize> Sync for TriggerQueue<N> {}

impl<const N: usize> TriggerQueue<N> {
    pub const fn new() -> Self {
        assert!(N >= 2, "trigger queue needs at least 2 slots");
        TriggerQueue {
            slots: [const { UnsafeCell::new(NoteTrigger { pad: 0 }) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a trigger (audio context). Returns `false` if it was dropped.
    pub fn push(&self, trigger: NoteTrigger) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;
        if next == self.tail.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: sole producer, and `next != tail` means the consumer is not
        // reading this slot.
        unsafe {
            *self.slots[head].get() = trigger;
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Dequeue the oldest trigger (control context).
    pub fn pop(&self) -> Option<NoteTrigger> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: sole consumer, and `tail != head` means the slot holds a
        // trigger the producer has finished writing.
        let trigger = unsafe { *self.slots[tail].get() };
        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(trigger)
    }

    /// Number of triggers dropped since the last call, resetting the count.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Usable capacity.
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<const N: usize> Default for TriggerQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(pad: u8) -> NoteTrigger {
        NoteTrigger { pad }
    }

    #[test]
    fn fifo_order() {
        let q: TriggerQueue<4> = TriggerQueue::new();
        assert!(q.is_empty());
        assert!(q.push(t(3)));
        assert!(q.push(t(1)));
        assert!(q.push(t(4)));
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop(), Some(t(3)));
        assert_eq!(q.pop(), Some(t(1)));
        assert_eq!(q.pop(), Some(t(4)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_queue_counts_drops() {
        let q: TriggerQueue<3> = TriggerQueue::new();
        assert_eq!(q.capacity(), 2);
        assert!(q.push(t(0)));
        assert!(q.push(t(1)));
        assert!(!q.push(t(2)));
        assert!(!q.push(t(3)));
        assert_eq!(q.take_dropped(), 2);
        assert_eq!(q.take_dropped(), 0);
        assert_eq!(q.pop(), Some(t(0)));
        assert!(q.push(t(5)));
    }

    #[test]
    fn wraps_around() {
        let q: TriggerQueue<3> = TriggerQueue::new();
        for round in 0..10u8 {
            assert!(q.push(t(round)));
            assert!(q.push(t(round + 100)));
            assert_eq!(q.pop(), Some(t(round)));
            assert_eq!(q.pop(), Some(t(round + 100)));
            assert!(q.is_empty());
        }
    }

    #[test]
    fn threaded_delivery_in_order() {
        extern crate std;
        use std::thread;

        let q: TriggerQueue<8> = TriggerQueue::new();
        thread::scope(|s| {
            s.spawn(|| {
                let mut pad = 0u8;
                while pad < 200 {
                    if q.push(t(pad)) {
                        pad += 1;
                    }
                }
            });

            let mut expected = 0u8;
            while expected < 200 {
                if let Some(trigger) = q.pop() {
                    assert_eq!(trigger.pad, expected);
                    expected += 1;
                }
            }
        });
    }
}
