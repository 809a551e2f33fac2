//! Pad-to-voltage and pad-to-LED mappings.
//!
//! Both are pure lookups. Product variants differ only in the tables, so the
//! tables are configuration.

use crate::constants::NUM_PADS;

/// Twelve-step maqam-flavoured scale, in semitones from the lowest pad.
pub const MAQAM_SCALE: [f32; NUM_PADS] = [
    0.0, 2.0, 4.0, 7.0, 9.0, 12.0, 14.0, 16.0, 19.0, 21.0, 24.0, 26.0,
];

/// Maps a pad index to a 1 V/octave control voltage along a fixed scale.
///
/// `voltage(pad) = base + (scale[pad] - scale[center]) / 12`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadVoltageMap {
    pub scale: [f32; NUM_PADS],
    /// Pad that produces exactly `base_voltage`.
    pub center: usize,
    pub base_voltage: f32,
}

impl Default for PadVoltageMap {
    fn default() -> Self {
        Self {
            scale: MAQAM_SCALE,
            center: 6,
            base_voltage: 2.5,
        }
    }
}

impl PadVoltageMap {
    /// Voltage for `pad`; `None` (no pad held) or an unknown pad gives 0 V.
    pub fn voltage(&self, pad: Option<usize>) -> f32 {
        let (Some(note), Some(center)) = (
            pad.and_then(|p| self.scale.get(p)),
            self.scale.get(self.center),
        ) else {
            return 0.0;
        };
        self.base_voltage + (note - center) / 12.0
    }
}

/// Permutation from pad index to LED index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedLayout {
    pub pad_to_led: [u8; NUM_PADS],
}

impl LedLayout {
    /// LED `i` sits under pad `i`.
    pub const fn identity() -> Self {
        let mut pad_to_led = [0u8; NUM_PADS];
        let mut i = 0;
        while i < NUM_PADS {
            pad_to_led[i] = i as u8;
            i += 1;
        }
        LedLayout { pad_to_led }
    }

    /// LEDs wired in reverse: pad `i` lights LED `11 - i`.
    pub const fn reversed() -> Self {
        let mut pad_to_led = [0u8; NUM_PADS];
        let mut i = 0;
        while i < NUM_PADS {
            pad_to_led[i] = (NUM_PADS - 1 - i) as u8;
            i += 1;
        }
        LedLayout { pad_to_led }
    }

    /// Board wiring of the Kymatikos touch panel.
    pub const fn kymatikos() -> Self {
        LedLayout {
            pad_to_led: [9, 8, 7, 6, 3, 4, 5, 2, 1, 0, 10, 11],
        }
    }

    /// LED index for `pad`, or `None` for an unknown pad.
    pub fn led(&self, pad: usize) -> Option<usize> {
        self.pad_to_led
            .get(pad)
            .map(|&led| led as usize)
            .filter(|&led| led < NUM_PADS)
    }
}

impl Default for LedLayout {
    fn default() -> Self {
        Self::reversed()
    }
}
