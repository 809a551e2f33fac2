//! Debouncers and timers for control affordances.
//!
//! - [`HysteresisLatch`]: two-threshold boolean latch for noisy analog pads.
//! - [`Toggle`]: flips a state once per press of a latch.
//! - [`HoldTrigger`]: fires once after a condition holds for a duration.
//! - [`BootCombo`]: the firmware-update gesture (three pads held ~1 s,
//!   ignored during a startup grace period).
//! - [`GatePulse`]: fixed-duration pulse against a millisecond clock.
//!
//! All timing is deadline comparison against a wrapping `u32` millisecond
//! counter; nothing here sleeps.

use crate::constants::{GATE_PULSE_MS, NUM_KNOBS};
use crate::snapshot::KnobFrame;

/// Latch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

/// On/off thresholds of a [`HysteresisLatch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleConfig {
    /// Input above this presses the latch.
    pub on: f32,
    /// Input below this releases it. Must be below `on`.
    pub off: f32,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { on: 0.30, off: 0.20 }
    }
}

/// Narrowest hysteresis band a [`HysteresisLatch`] runs with.
pub const MIN_BAND: f32 = 1e-3;

/// Boolean latch with a hysteresis band between `off` and `on`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisLatch {
    config: ToggleConfig,
    pressed: bool,
}

impl HysteresisLatch {
    /// Create a released latch. Inverted thresholds are swapped, and a band
    /// narrower than [`MIN_BAND`] is widened by lowering `off`, so `off` is
    /// always strictly below `on`.
    pub fn new(config: ToggleConfig) -> Self {
        let (on, off) = if config.off <= config.on {
            (config.on, config.off)
        } else {
            (config.off, config.on)
        };
        let off = if on - off < MIN_BAND { on - MIN_BAND } else { off };
        HysteresisLatch {
            config: ToggleConfig { on, off },
            pressed: false,
        }
    }

    pub fn config(&self) -> ToggleConfig {
        self.config
    }

    /// Feed one normalized reading. Returns the transition, if any.
    pub fn update(&mut self, input: f32) -> Option<Edge> {
        if !self.pressed && input > self.config.on {
            self.pressed = true;
            Some(Edge::Pressed)
        } else if self.pressed && input < self.config.off {
            self.pressed = false;
            Some(Edge::Released)
        } else {
            None
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

/// Flips a boolean once per latch press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Toggle {
    latch: HysteresisLatch,
    state: bool,
}

impl Toggle {
    pub fn new(config: ToggleConfig, initial: bool) -> Self {
        Toggle {
            latch: HysteresisLatch::new(config),
            state: initial,
        }
    }

    /// Feed one reading. Returns the new state when it flips.
    pub fn update(&mut self, input: f32) -> Option<bool> {
        match self.latch.update(input) {
            Some(Edge::Pressed) => {
                self.state = !self.state;
                Some(self.state)
            }
            _ => None,
        }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Force the state without touching the latch.
    pub fn set_state(&mut self, state: bool) {
        self.state = state;
    }
}

/// Fires once after its condition has held continuously for `hold_ms`.
///
/// Any poll with the condition false restarts the hold. After firing it stays
/// quiet until the condition drops and is held again. The hold is measured on
/// the millisecond clock, so the poll rate does not change its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTrigger {
    hold_ms: u32,
    since: Option<u32>,
    fired: bool,
}

impl HoldTrigger {
    pub const fn new(hold_ms: u32) -> Self {
        HoldTrigger {
            hold_ms,
            since: None,
            fired: false,
        }
    }

    /// Feed one poll taken at `now_ms`. Returns `true` on the poll that
    /// completes the hold.
    pub fn update(&mut self, now_ms: u32, condition: bool) -> bool {
        if !condition {
            self.reset();
            return false;
        }
        if self.fired {
            return false;
        }
        let start = *self.since.get_or_insert(now_ms);
        if now_ms.wrapping_sub(start) >= self.hold_ms {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.since = None;
        self.fired = false;
    }

    /// How long the condition has held at `now_ms`.
    pub fn held_ms(&self, now_ms: u32) -> u32 {
        self.since.map_or(0, |start| now_ms.wrapping_sub(start))
    }
}

/// Firmware-update gesture parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootComboConfig {
    /// ADC channels of the pads that must all be pressed.
    pub channels: [usize; 3],
    /// Raw reading above which a pad counts as pressed.
    pub threshold: f32,
    /// How long all pads must stay pressed.
    pub hold_ms: u32,
    /// Time after power-up during which the gesture is ignored.
    pub grace_ms: u32,
}

impl Default for BootComboConfig {
    fn default() -> Self {
        Self {
            channels: [8, 9, 10],
            threshold: 0.5,
            hold_ms: 1_000,
            grace_ms: 5_000,
        }
    }
}

/// Detects the sustained three-pad gesture that enters the bootloader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootCombo {
    config: BootComboConfig,
    hold: HoldTrigger,
}

impl BootCombo {
    pub fn new(config: BootComboConfig) -> Self {
        BootCombo {
            hold: HoldTrigger::new(config.hold_ms),
            config,
        }
    }

    /// `true` if every combo pad is above the threshold in `knobs`.
    pub fn is_pressed(&self, knobs: &KnobFrame) -> bool {
        self.config
            .channels
            .iter()
            .all(|&ch| ch < NUM_KNOBS && knobs[ch] > self.config.threshold)
    }

    /// Feed one poll taken at `now_ms` since power-up. Returns `true` once
    /// when the gesture completes.
    pub fn update(&mut self, now_ms: u32, knobs: &KnobFrame) -> bool {
        if now_ms < self.config.grace_ms {
            self.hold.reset();
            return false;
        }
        let pressed = self.is_pressed(knobs);
        self.hold.update(now_ms, pressed)
    }
}

/// Fixed-duration digital pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePulse {
    duration_ms: u32,
    started_at: Option<u32>,
}

impl GatePulse {
    pub const fn new(duration_ms: u32) -> Self {
        GatePulse {
            duration_ms,
            started_at: None,
        }
    }

    /// Start (or restart) the pulse at `now_ms`.
    pub fn fire(&mut self, now_ms: u32) {
        self.started_at = Some(now_ms);
    }

    /// Gate level at `now_ms`. Expired pulses are forgotten.
    pub fn is_high(&mut self, now_ms: u32) -> bool {
        match self.started_at {
            Some(start) if now_ms.wrapping_sub(start) < self.duration_ms => true,
            Some(_) => {
                self.started_at = None;
                false
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.started_at = None;
    }
}

impl Default for GatePulse {
    fn default() -> Self {
        Self::new(GATE_PULSE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_hysteresis_band() {
        let mut latch = HysteresisLatch::new(ToggleConfig { on: 0.30, off: 0.20 });
        assert_eq!(latch.update(0.35), Some(Edge::Pressed));
        assert_eq!(latch.update(0.25), None);
        assert!(latch.is_pressed());
        assert_eq!(latch.update(0.15), Some(Edge::Released));
    }

    #[test]
    fn toggle_flips_once_per_press() {
        let mut toggle = Toggle::new(ToggleConfig::default(), false);
        let flips: usize = [0.35, 0.25, 0.15]
            .iter()
            .filter_map(|&x| toggle.update(x))
            .count();
        assert_eq!(flips, 1);
        assert!(toggle.state());
    }

    #[test]
    fn toggle_ignores_chatter_in_band() {
        let mut toggle = Toggle::new(ToggleConfig::default(), false);
        let mut flips = 0;
        for x in [0.0, 0.31, 0.22, 0.29, 0.21, 0.33, 0.25, 1.0] {
            if toggle.update(x).is_some() {
                flips += 1;
            }
        }
        assert_eq!(flips, 1);
    }

    #[test]
    fn toggle_rising_sweep_flips_once() {
        let mut toggle = Toggle::new(ToggleConfig::default(), false);
        let flips = (0..=100)
            .filter_map(|i| toggle.update(i as f32 / 100.0))
            .count();
        assert_eq!(flips, 1);
    }

    #[test]
    fn second_press_flips_back() {
        let mut toggle = Toggle::new(ToggleConfig::default(), false);
        assert_eq!(toggle.update(0.5), Some(true));
        assert_eq!(toggle.update(0.1), None);
        assert_eq!(toggle.update(0.5), Some(false));
    }

    #[test]
    fn inverted_thresholds_swapped() {
        let mut latch = HysteresisLatch::new(ToggleConfig { on: 0.2, off: 0.3 });
        assert_eq!(latch.update(0.25), None);
        assert_eq!(latch.update(0.31), Some(Edge::Pressed));
    }

    #[test]
    fn equal_thresholds_keep_a_band() {
        let mut latch = HysteresisLatch::new(ToggleConfig { on: 0.3, off: 0.3 });
        assert!(latch.config().off < latch.config().on);
        let edges = [0.3005, 0.2995, 0.3005, 0.2995, 0.3005]
            .iter()
            .filter_map(|&x| latch.update(x))
            .count();
        assert_eq!(edges, 1);
        assert_eq!(latch.update(0.25), Some(Edge::Released));
    }

    #[test]
    fn hold_requires_continuous_condition() {
        let mut hold = HoldTrigger::new(10);
        assert!(!hold.update(0, true));
        assert!(!hold.update(6, true));
        assert!(!hold.update(8, false));
        assert_eq!(hold.held_ms(8), 0);
        assert!(!hold.update(9, true));
        assert!(!hold.update(18, true));
        assert!(hold.update(19, true));
        // One-shot while held.
        assert!(!hold.update(40, true));
        assert!(!hold.update(41, false));
        assert!(!hold.update(42, true));
    }

    #[test]
    fn hold_across_clock_wrap() {
        let mut hold = HoldTrigger::new(10);
        assert!(!hold.update(u32::MAX - 4, true));
        assert_eq!(hold.held_ms(3), 8);
        assert!(!hold.update(3, true));
        assert!(hold.update(5, true));
    }

    fn combo_knobs(pressed: bool) -> KnobFrame {
        let mut knobs = [0.0; NUM_KNOBS];
        if pressed {
            for ch in BootComboConfig::default().channels {
                knobs[ch] = 0.9;
            }
        }
        knobs
    }

    #[test]
    fn boot_combo_ignored_during_grace() {
        let mut combo = BootCombo::new(BootComboConfig::default());
        let knobs = combo_knobs(true);
        for t in 0..2_500u32 {
            assert!(!combo.update(t * 2, &knobs));
        }
    }

    fn boot_combo_fire_time(step_ms: u32) -> Option<u32> {
        let config = BootComboConfig::default();
        let mut combo = BootCombo::new(config);
        let knobs = combo_knobs(true);
        let mut now = config.grace_ms;
        while now < config.grace_ms + 3 * config.hold_ms {
            if combo.update(now, &knobs) {
                return Some(now - config.grace_ms);
            }
            now += step_ms;
        }
        None
    }

    #[test]
    fn boot_combo_fires_after_hold() {
        assert_eq!(boot_combo_fire_time(1), Some(1_000));
    }

    #[test]
    fn boot_combo_hold_independent_of_poll_rate() {
        for step in [1, 2, 5, 10] {
            assert_eq!(boot_combo_fire_time(step), Some(1_000), "step {} ms", step);
        }
    }

    #[test]
    fn boot_combo_resets_on_release() {
        let config = BootComboConfig::default();
        let mut combo = BootCombo::new(config);
        let mut now = config.grace_ms;
        while now < config.grace_ms + config.hold_ms - 1 {
            assert!(!combo.update(now, &combo_knobs(true)));
            now += 1;
        }
        assert!(!combo.update(now, &combo_knobs(false)));
        now += 1;
        let restart = now;
        while now < restart + config.hold_ms {
            assert!(!combo.update(now, &combo_knobs(true)));
            now += 1;
        }
        assert!(combo.update(now, &combo_knobs(true)));
    }

    #[test]
    fn partial_combo_not_pressed() {
        let combo = BootCombo::new(BootComboConfig::default());
        let mut knobs = combo_knobs(true);
        knobs[9] = 0.1;
        assert!(!combo.is_pressed(&knobs));
    }

    #[test]
    fn gate_pulse_duration() {
        let mut gate = GatePulse::new(10);
        assert!(!gate.is_high(0));
        gate.fire(100);
        assert!(gate.is_high(100));
        assert!(gate.is_high(109));
        assert!(!gate.is_high(110));
        assert!(!gate.is_high(105));
    }

    #[test]
    fn gate_pulse_across_wrap() {
        let mut gate = GatePulse::new(10);
        gate.fire(u32::MAX - 3);
        assert!(gate.is_high(2));
        assert!(!gate.is_high(7));
    }

    #[test]
    fn gate_refire_extends() {
        let mut gate = GatePulse::new(10);
        gate.fire(0);
        gate.fire(8);
        assert!(gate.is_high(15));
        gate.cancel();
        assert!(!gate.is_high(15));
    }
}
