//! Fixed-capacity, insertion-ordered set of held pads.

use crate::constants::NUM_PADS;

/// Ordered set of pad indices, at most one entry per physical pad.
///
/// Insertion order is playback order. Removal shifts later entries left, so
/// order is kept without any allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSet {
    notes: [u8; NUM_PADS],
    len: usize,
}

impl NoteSet {
    pub const CAPACITY: usize = NUM_PADS;

    pub const fn new() -> Self {
        NoteSet {
            notes: [0; NUM_PADS],
            len: 0,
        }
    }

    /// Append `pad` if it is a valid pad index, absent, and there is room.
    /// Returns `true` if added.
    pub fn insert(&mut self, pad: u8) -> bool {
        if pad as usize >= Self::CAPACITY || self.contains(pad) || self.len >= Self::CAPACITY {
            return false;
        }
        self.notes[self.len] = pad;
        self.len += 1;
        true
    }

    /// Remove `pad`, keeping the order of the rest. Returns `true` if removed.
    pub fn remove(&mut self, pad: u8) -> bool {
        let Some(pos) = self.position(pad) else {
            return false;
        };
        self.notes.copy_within(pos + 1..self.len, pos);
        self.len -= 1;
        true
    }

    /// `true` if `pad` is held.
    pub fn contains(&self, pad: u8) -> bool {
        self.position(pad).is_some()
    }

    fn position(&self, pad: u8) -> Option<usize> {
        self.as_slice().iter().position(|&n| n == pad)
    }

    /// Pad at playback position `index`.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_slice().get(index).copied()
    }

    /// Held pads in playback order.
    pub fn as_slice(&self) -> &[u8] {
        &self.notes[..self.len]
    }

    /// Number of held pads.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every pad.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Bitmask with one bit per held pad.
    pub fn mask(&self) -> u16 {
        self.as_slice().iter().fold(0, |m, &n| m | (1 << n))
    }
}

impl Default for NoteSet {
    fn default() -> Self {
        Self::new()
    }
}
