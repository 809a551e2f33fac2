//! Lock-free double-buffered snapshot handoff from control to audio.
//!
//! The control context writes a complete [`ParameterSnapshot`] into the slot
//! the audio context is not reading, then publishes it with a single atomic
//! store. At the start of each block the audio context copies the newest
//! published slot into a private snapshot, so every read within a block sees
//! one untorn version.
//!
//! # Contract
//!
//! - Exactly one [`SnapshotPublisher`] (control context) and one
//!   [`SnapshotReader`] (audio context) exist per exchange; [`split()`]
//!   enforces this through the `&mut` borrow.
//! - The reader never blocks. If a publication races a block boundary the
//!   reader keeps its previous copy and picks up the new one next block.
//! - The publisher may spin briefly while the reader finishes copying the
//!   slot it is about to overwrite. On a single core where the audio
//!   callback preempts the control loop this never happens.
//!
//! [`split()`]: SnapshotExchange::split

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::snapshot::ParameterSnapshot;

/// Marker stored in `reading` while the reader is not copying a slot.
const NOT_READING: u8 = u8::MAX;

/// Two snapshot slots plus the publication sequence.
///
/// The published slot is `sequence & 1`; every publication bumps the
/// sequence, so the reader detects a new snapshot even when the slot index
/// has come back to the one it last copied.
pub struct SnapshotExchange {
    slots: [UnsafeCell<ParameterSnapshot>; 2],
    /// Publication counter (written only by the publisher).
    sequence: AtomicU32,
    /// Slot the reader is copying, or `NOT_READING` (written only by the reader).
    reading: AtomicU8,
}

// SAFETY: slot access is coordinated by `sequence` and `reading`. The
// publisher only writes the slot that is neither published nor being read,
// and the reader only copies a slot after announcing it in `reading` and
// re-checking that it is still the published one.
unsafe impl Sync for SnapshotExchange {}

impl SnapshotExchange {
    /// Create an exchange with both slots holding the power-on defaults.
    pub const fn new() -> Self {
        Self::with_initial(ParameterSnapshot::DEFAULT)
    }

    /// Create an exchange with both slots holding `initial`.
    pub const fn with_initial(initial: ParameterSnapshot) -> Self {
        SnapshotExchange {
            slots: [UnsafeCell::new(initial), UnsafeCell::new(initial)],
            sequence: AtomicU32::new(0),
            reading: AtomicU8::new(NOT_READING),
        }
    }

    /// Split into the control-side publisher and the audio-side reader.
    pub fn split(&mut self) -> (SnapshotPublisher<'_>, SnapshotReader<'_>) {
        let sequence = *self.sequence.get_mut();
        let current = *self.slots[slot_of(sequence)].get_mut();
        *self.reading.get_mut() = NOT_READING;

        let exchange: &SnapshotExchange = self;
        (
            SnapshotPublisher {
                exchange,
                latest: current,
            },
            SnapshotReader {
                exchange,
                cursor: sequence,
                local: current,
            },
        )
    }
}

impl Default for SnapshotExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn slot_of(sequence: u32) -> usize {
    (sequence & 1) as usize
}

/// Control-context half of a [`SnapshotExchange`].
pub struct SnapshotPublisher<'a> {
    exchange: &'a SnapshotExchange,
    latest: ParameterSnapshot,
}

impl SnapshotPublisher<'_> {
    /// Write `snapshot` into the inactive slot, then make it current.
    ///
    /// The slot write always completes before the sequence store that
    /// publishes it.
    pub fn publish(&mut self, snapshot: ParameterSnapshot) {
        let ex = self.exchange;
        let next = ex.sequence.load(Ordering::Relaxed).wrapping_add(1);
        let target = slot_of(next);

        while ex.reading.load(Ordering::SeqCst) as usize == target {
            spin_loop();
        }

        // SAFETY: `target` is not the published slot, and the reader is not
        // copying it: any reader that announces `target` from here on fails
        // its re-check against the current sequence and backs off.
        unsafe {
            *ex.slots[target].get() = snapshot;
        }
        ex.sequence.store(next, Ordering::SeqCst);
        self.latest = snapshot;
    }

    /// The most recently published snapshot, for control-side display.
    pub fn latest(&self) -> &ParameterSnapshot {
        &self.latest
    }

    /// Number of publications so far (wrapping).
    pub fn sequence(&self) -> u32 {
        self.exchange.sequence.load(Ordering::Relaxed)
    }
}

/// Audio-context half of a [`SnapshotExchange`].
pub struct SnapshotReader<'a> {
    exchange: &'a SnapshotExchange,
    cursor: u32,
    local: ParameterSnapshot,
}

impl SnapshotReader<'_> {
    /// Copy the newest published snapshot into the private copy.
    ///
    /// Returns `true` if a new snapshot was taken. Never blocks, never
    /// loops: on a race with the publisher the previous copy is kept.
    pub fn sync_to_local(&mut self) -> bool {
        let ex = self.exchange;
        let sequence = ex.sequence.load(Ordering::Acquire);
        if sequence == self.cursor {
            return false;
        }

        let slot = slot_of(sequence);
        ex.reading.store(slot as u8, Ordering::SeqCst);
        if ex.sequence.load(Ordering::SeqCst) != sequence {
            ex.reading.store(NOT_READING, Ordering::Release);
            return false;
        }

        // SAFETY: `slot` is announced in `reading` and was still published
        // after the announcement, so the publisher will not write it until
        // `reading` is cleared below.
        self.local = unsafe { *ex.slots[slot].get() };
        self.cursor = sequence;
        ex.reading.store(NOT_READING, Ordering::Release);
        true
    }

    /// The snapshot in effect for the current block.
    pub fn current(&self) -> &ParameterSnapshot {
        &self.local
    }
}
