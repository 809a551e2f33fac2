//! Touch-pad arpeggiator.
//!
//! Held pads form an ordered [`NoteSet`]. A sample-clocked [`ArpClock`]
//! decides when a note fires, and the [`Direction`] decides which one.
//! Triggers are returned as [`NoteTrigger`] values for the caller to
//! dispatch; nothing is called back from inside the arpeggiator.
//!
//! The arpeggiator is owned by the audio context. The control context only
//! reaches it indirectly: tempo through the parameter snapshot, clear and
//! restart through [`SharedControls`](crate::shared::SharedControls) request
//! flags.
//!
//! # Example
//! ```
//! use kymatikos_control::arp::{Arpeggiator, ArpConfig, Direction};
//!
//! let mut arp = Arpeggiator::new(48_000.0, ArpConfig::default());
//! arp.set_direction(Direction::Forward);
//! arp.update_held_notes(0b1000, 0); // pad 3 pressed
//! let fired: Vec<u8> = arp.advance(32).map(|t| t.pad).collect();
//! assert_eq!(fired, [3]);
//! ```

mod clock;
mod note_set;

pub use clock::ArpClock;
pub use note_set::NoteSet;

use crate::constants::{NUM_PADS, PAD_MASK};

/// Note-selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Cycle the held notes in insertion order.
    Forward,
    /// Pick a held note uniformly at random.
    Random,
    /// Play in the order pads were pressed (same traversal as `Forward`).
    AsPlayed,
}

/// Arpeggiator state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArpState {
    /// No notes held; no triggers.
    Idle,
    /// Stepping through held notes in set order.
    Forward,
    /// Picking held notes at random.
    Random,
    /// Stepping through held notes in press order.
    AsPlayed,
}

/// A note fired by the arpeggiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoteTrigger {
    /// Pad index of the fired note.
    pub pad: u8,
}

/// Tempo and polyrhythm ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpConfig {
    /// Tempo at knob 0, in Hz.
    pub min_tempo_hz: f32,
    /// Tempo at knob 1, in Hz.
    pub max_tempo_hz: f32,
    /// Lowest tempo ever used, in Hz.
    pub tempo_floor_hz: f32,
    /// Polyrhythm ratio at knob 0.
    pub min_ratio: f32,
    /// Polyrhythm ratio at knob 1.
    pub max_ratio: f32,
    /// Initial state of the random-direction generator. Must be non-zero.
    pub rng_seed: u32,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            min_tempo_hz: 1.0,
            max_tempo_hz: 30.0,
            tempo_floor_hz: 0.1,
            min_ratio: 0.5,
            max_ratio: 2.0,
            rng_seed: 0x1234_5678,
        }
    }
}

/// 32-bit xorshift generator (13, 17, 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Xorshift32(u32);

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift.
        Xorshift32(if seed == 0 { 0x1234_5678 } else { seed })
    }

    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

/// Sample-clocked note trigger state machine.
pub struct Arpeggiator {
    config: ArpConfig,
    notes: NoteSet,
    clock: ArpClock,
    direction: Direction,
    step: usize,
    rng: Xorshift32,
}

impl Arpeggiator {
    /// An idle arpeggiator stepping forward at 1 Hz, with the first trigger
    /// due as soon as a note is held.
    pub fn new(sample_rate: f32, config: ArpConfig) -> Self {
        Arpeggiator {
            notes: NoteSet::new(),
            clock: ArpClock::new(sample_rate, config.tempo_floor_hz),
            direction: Direction::Forward,
            step: 0,
            rng: Xorshift32::new(config.rng_seed),
            config,
        }
    }

    /// Tempo and polyrhythm ranges in use.
    pub fn config(&self) -> &ArpConfig {
        &self.config
    }

    // ── Tempo ──────────────────────────────────────────────────────────

    /// Set the base tempo in Hz (clamped to the configured floor).
    pub fn set_tempo(&mut self, hz: f32) {
        self.clock.set_tempo(hz);
    }

    /// Map a knob in `[0, 1]` exponentially onto the tempo range:
    /// `min * (max / min)^x`, so equal knob travel gives equal tempo ratios.
    pub fn set_tempo_from_knob(&mut self, knob: f32) {
        let x = crate::snapshot::clamp_unit(knob);
        let ArpConfig { min_tempo_hz: min, max_tempo_hz: max, .. } = self.config;
        let hz = if min > 0.0 && max > 0.0 {
            min * libm::powf(max / min, x)
        } else {
            min + (max - min) * x
        };
        self.set_tempo(hz);
    }

    /// Set the polyrhythm ratio; the effective interval is `1 / (tempo * r)`.
    pub fn set_polyrhythm_ratio(&mut self, ratio: f32) {
        self.clock.set_ratio(ratio);
    }

    /// Map a knob in `[0, 1]` linearly onto the polyrhythm range.
    pub fn set_polyrhythm_ratio_from_knob(&mut self, knob: f32) {
        let x = crate::snapshot::clamp_unit(knob);
        let ratio = self.config.min_ratio + x * (self.config.max_ratio - self.config.min_ratio);
        self.set_polyrhythm_ratio(ratio);
    }

    /// Base tempo before the polyrhythm ratio, in Hz.
    pub fn tempo_hz(&self) -> f32 {
        self.clock.tempo_hz()
    }

    pub fn polyrhythm_ratio(&self) -> f32 {
        self.clock.ratio()
    }

    /// Effective interval between triggers, in seconds.
    pub fn interval_secs(&self) -> f32 {
        self.clock.interval_secs()
    }

    pub fn clock(&self) -> &ArpClock {
        &self.clock
    }

    // ── Notes and direction ────────────────────────────────────────────

    /// Change direction and restart the step sequence.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.step = 0;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `Idle` with no notes held, otherwise the playing direction.
    pub fn state(&self) -> ArpState {
        if self.notes.is_empty() {
            return ArpState::Idle;
        }
        match self.direction {
            Direction::Forward => ArpState::Forward,
            Direction::Random => ArpState::Random,
            Direction::AsPlayed => ArpState::AsPlayed,
        }
    }

    /// `true` while at least one note is held.
    pub fn is_active(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Held notes in playback order.
    pub fn notes(&self) -> &NoteSet {
        &self.notes
    }

    /// Apply the pads that changed between two touch masks.
    ///
    /// Newly pressed pads are appended (if absent and there is room), newly
    /// released pads are removed with order preserved.
    pub fn update_held_notes(&mut self, current: u16, previous: u16) {
        let changed = (current ^ previous) & PAD_MASK;
        if changed == 0 {
            return;
        }
        for pad in 0..NUM_PADS as u8 {
            let bit = 1u16 << pad;
            if changed & bit == 0 {
                continue;
            }
            if current & bit != 0 {
                self.notes.insert(pad);
            } else {
                self.notes.remove(pad);
            }
        }
    }

    /// Drop every held note and restart the step sequence.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.step = 0;
    }

    /// Restart the clock so the next held note fires immediately.
    pub fn restart(&mut self) {
        self.clock.reset();
        self.step = 0;
    }

    /// Reseed the random-direction generator.
    pub fn reseed(&mut self, seed: u32) {
        self.rng = Xorshift32::new(seed);
    }

    // ── Scheduling ─────────────────────────────────────────────────────

    /// Advance the clock by `frames` samples and return the triggers due.
    ///
    /// Each deadline crossed within the advanced span yields one trigger.
    /// Triggers left unconsumed when the iterator is dropped stay due and are
    /// yielded by the next call. With no notes held this is a no-op and the
    /// clock does not move.
    pub fn advance(&mut self, frames: usize) -> Triggers<'_> {
        if !self.notes.is_empty() {
            self.clock.advance(frames);
        }
        Triggers { arp: self }
    }

    /// Select the next note according to the direction, without touching
    /// the clock. `None` with no notes held.
    pub fn trigger(&mut self) -> Option<NoteTrigger> {
        let count = self.notes.len();
        if count == 0 {
            return None;
        }
        let index = match self.direction {
            Direction::Random => (self.rng.next() % count as u32) as usize,
            Direction::Forward | Direction::AsPlayed => {
                let index = self.step % count;
                self.step = self.step.wrapping_add(1);
                index
            }
        };
        self.notes.get(index).map(|pad| NoteTrigger { pad })
    }
}

/// Triggers due after an [`Arpeggiator::advance`] call.
pub struct Triggers<'a> {
    arp: &'a mut Arpeggiator,
}

impl Iterator for Triggers<'_> {
    type Item = NoteTrigger;

    fn next(&mut self) -> Option<NoteTrigger> {
        if self.arp.notes.is_empty() || !self.arp.clock.is_due() {
            return None;
        }
        self.arp.clock.schedule_next();
        self.arp.trigger()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    const SR: f32 = 48_000.0;

    fn arp() -> Arpeggiator {
        Arpeggiator::new(SR, ArpConfig::default())
    }

    fn press(arp: &mut Arpeggiator, mask: &mut u16, pad: u8) {
        let next = *mask | (1 << pad);
        arp.update_held_notes(next, *mask);
        *mask = next;
    }

    fn release(arp: &mut Arpeggiator, mask: &mut u16, pad: u8) {
        let next = *mask & !(1 << pad);
        arp.update_held_notes(next, *mask);
        *mask = next;
    }

    fn count_triggers(arp: &mut Arpeggiator, frames: usize) -> usize {
        arp.advance(frames).count()
    }

    #[test]
    fn press_release_round_trip() {
        let mut arp = arp();
        arp.set_direction(Direction::AsPlayed);
        let mut mask = 0;
        press(&mut arp, &mut mask, 3);
        press(&mut arp, &mut mask, 1);
        press(&mut arp, &mut mask, 4);
        release(&mut arp, &mut mask, 1);
        assert_eq!(arp.notes().as_slice(), &[3, 4]);

        let fired: Vec<u8> = (0..3).filter_map(|_| arp.trigger()).map(|t| t.pad).collect();
        assert_eq!(fired, [3, 4, 3]);
    }

    #[test]
    fn forward_cycles_in_insertion_order() {
        let mut arp = arp();
        arp.set_direction(Direction::Forward);
        arp.update_held_notes(0b0000_1001_0100, 0); // pads 2, 4, 7 at once
        let fired: Vec<u8> = (0..6).filter_map(|_| arp.trigger()).map(|t| t.pad).collect();
        assert_eq!(fired, [2, 4, 7, 2, 4, 7]);
    }

    #[test]
    fn empty_set_is_idle_and_silent() {
        let mut arp = arp();
        assert_eq!(arp.state(), ArpState::Idle);
        assert_eq!(arp.trigger(), None);
        assert_eq!(count_triggers(&mut arp, 48_000), 0);
        assert_eq!(arp.clock().elapsed_secs(), 0.0);
    }

    #[test]
    fn state_follows_direction() {
        let mut arp = arp();
        arp.update_held_notes(1, 0);
        arp.set_direction(Direction::Random);
        assert_eq!(arp.state(), ArpState::Random);
        arp.set_direction(Direction::AsPlayed);
        assert_eq!(arp.state(), ArpState::AsPlayed);
        arp.set_direction(Direction::Forward);
        assert_eq!(arp.state(), ArpState::Forward);
    }

    #[test]
    fn random_is_deterministic_and_in_set() {
        let mut a = arp();
        let mut b = arp();
        for arp in [&mut a, &mut b] {
            arp.set_direction(Direction::Random);
            arp.update_held_notes(0b1010_1010, 0);
        }
        for _ in 0..100 {
            let ta = a.trigger().unwrap();
            let tb = b.trigger().unwrap();
            assert_eq!(ta, tb);
            assert!(a.notes().contains(ta.pad));
        }
    }

    #[test]
    fn reseed_changes_sequence() {
        let mut a = arp();
        let mut b = arp();
        for arp in [&mut a, &mut b] {
            arp.set_direction(Direction::Random);
            arp.update_held_notes(PAD_MASK, 0);
        }
        b.reseed(0xDEAD_BEEF);
        let sa: Vec<u8> = (0..16).map(|_| a.trigger().unwrap().pad).collect();
        let sb: Vec<u8> = (0..16).map(|_| b.trigger().unwrap().pad).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn tempo_knob_endpoints() {
        let mut arp = arp();
        arp.set_tempo_from_knob(0.0);
        assert!((arp.tempo_hz() - 1.0).abs() < 1e-5);
        arp.set_tempo_from_knob(1.0);
        assert!((arp.tempo_hz() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn tempo_knob_monotonic() {
        let mut arp = arp();
        let mut last = 0.0;
        for i in 0..=100 {
            arp.set_tempo_from_knob(i as f32 / 100.0);
            assert!(arp.tempo_hz() > last);
            last = arp.tempo_hz();
        }
    }

    #[test]
    fn polyrhythm_divides_interval() {
        let mut arp = arp();
        arp.set_tempo(2.0);
        arp.set_polyrhythm_ratio(4.0);
        assert!((arp.interval_secs() - 0.125).abs() < 1e-6);
        arp.set_polyrhythm_ratio(0.0);
        assert!((arp.interval_secs() - 0.5).abs() < 1e-6);
        arp.set_polyrhythm_ratio_from_knob(1.0);
        assert!((arp.polyrhythm_ratio() - 2.0).abs() < 1e-6);
        arp.set_polyrhythm_ratio_from_knob(0.0);
        assert!((arp.polyrhythm_ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn trigger_count_matches_elapsed_time() {
        let mut arp = arp();
        arp.update_held_notes(1, 0);
        arp.set_tempo(7.0);
        let seconds: f64 = 2.5;
        let frames = (seconds * SR as f64) as usize;
        let fired = count_triggers(&mut arp, frames);
        let expected = (seconds / arp.interval_secs() as f64).floor() as usize;
        assert!(
            fired.abs_diff(expected) <= 1,
            "fired {} expected {}",
            fired,
            expected
        );
    }

    #[test]
    fn trigger_count_independent_of_block_size() {
        let total = 48_000 * 2 + 17;
        let mut counts = Vec::new();
        for block in [1usize, 7, 32, 48, 1_000, total] {
            let mut arp = arp();
            arp.update_held_notes(0b11, 0);
            arp.set_tempo(13.0);
            arp.set_polyrhythm_ratio(1.5);
            let mut remaining = total;
            let mut fired = 0;
            while remaining > 0 {
                let n = block.min(remaining);
                fired += count_triggers(&mut arp, n);
                remaining -= n;
            }
            counts.push(fired);
        }
        assert!(counts.windows(2).all(|w| w[0] == w[1]), "counts: {:?}", counts);
    }

    #[test]
    fn multiple_crossings_in_one_block() {
        let mut arp = arp();
        arp.update_held_notes(0b111, 0);
        arp.set_tempo(1_000.0); // 48 samples per trigger
        let fired: Vec<u8> = arp.advance(48 * 4).map(|t| t.pad).collect();
        // Due at 0, 48, 96, 144 and 192.
        assert_eq!(fired, [0, 1, 2, 0, 1]);
    }

    #[test]
    fn unconsumed_triggers_stay_due() {
        let mut arp = arp();
        arp.update_held_notes(1, 0);
        arp.set_tempo(1_000.0);
        {
            let mut triggers = arp.advance(48 * 3);
            assert!(triggers.next().is_some());
        }
        assert_eq!(count_triggers(&mut arp, 0), 3);
    }

    #[test]
    fn clear_prevents_stale_replay() {
        let mut arp = arp();
        arp.update_held_notes(0b1100, 0);
        arp.trigger();
        arp.clear();
        assert!(!arp.is_active());
        assert_eq!(count_triggers(&mut arp, 48_000), 0);

        arp.update_held_notes(0b1_0000, 0);
        assert_eq!(arp.trigger(), Some(NoteTrigger { pad: 4 }));
    }

    #[test]
    fn restart_fires_immediately() {
        let mut arp = arp();
        arp.update_held_notes(1, 0);
        arp.set_tempo(1.0);
        assert_eq!(count_triggers(&mut arp, 10), 1);
        assert_eq!(count_triggers(&mut arp, 10), 0);
        arp.restart();
        assert_eq!(count_triggers(&mut arp, 1), 1);
    }

    #[test]
    fn held_notes_mirror_touch_mask() {
        let masks = [
            0b0000_0000_0001u16,
            0b0000_0000_0101,
            0b1000_0000_0100,
            0b1111_1111_1111,
            0b0101_0101_0101,
            0,
            0b0010_0000_0000,
        ];
        let mut arp = arp();
        let mut previous = 0;
        for &mask in &masks {
            arp.update_held_notes(mask, previous);
            assert_eq!(arp.notes().mask(), mask);
            previous = mask;
        }
    }

    #[test]
    fn bits_above_pads_ignored() {
        let mut arp = arp();
        arp.update_held_notes(0xF000, 0);
        assert!(!arp.is_active());
    }
}
