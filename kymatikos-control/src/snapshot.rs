//! Control parameter snapshot and the knob-to-parameter mapping.
//!
//! A [`ParameterSnapshot`] is built once per control tick from the
//! normalized ADC readings and handed to the audio context through the
//! [`exchange`](crate::exchange). Every field is clamped here, before
//! publication; the audio context never clamps.

use crate::constants::NUM_KNOBS;

/// One tick's worth of normalized analog readings, indexed by ADC channel.
pub type KnobFrame = [f32; NUM_KNOBS];

/// Symmetric range of the granular pitch shift, in semitones.
pub const PITCH_SHIFT_RANGE: f32 = 24.0;

/// Clamp `value` into `[min, max]`. NaN maps to `min`.
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        max
    } else if value >= min {
        value
    } else {
        min
    }
}

/// Clamp `value` into `[0, 1]`.
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    clamp(value, 0.0, 1.0)
}

/// All derived control parameters for one control tick.
///
/// Unless stated otherwise a field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterSnapshot {
    /// Pitch knob position.
    pub pitch: f32,
    /// Grain position in the record buffer.
    pub position: f32,
    /// Grain size.
    pub size: f32,
    /// Grain density.
    pub density: f32,
    /// Grain texture / window shape.
    pub texture: f32,
    /// Feedback amount.
    pub feedback: f32,
    /// Reverb amount.
    pub reverb: f32,
    /// Dry/wet balance (0 = dry).
    pub dry_wet: f32,
    /// Pitch shift in semitones, `[-PITCH_SHIFT_RANGE, PITCH_SHIFT_RANGE]`.
    pub pitch_shift: f32,
    /// Stereo spread of grains.
    pub stereo_spread: f32,
    /// Mod wheel position.
    pub mod_wheel: f32,
    /// Master output volume.
    pub master_volume: f32,
    /// Arpeggiator rate knob, mapped to tempo by the audio context.
    pub arp_rate: f32,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ParameterSnapshot {
    /// Power-on parameter set.
    pub const DEFAULT: Self = Self {
        pitch: 0.0,
        position: 0.0,
        size: 0.5,
        density: 0.0,
        texture: 0.0,
        feedback: 0.0,
        reverb: 0.0,
        dry_wet: 1.0,
        pitch_shift: 0.0,
        stereo_spread: 0.5,
        mod_wheel: 0.0,
        master_volume: 1.0,
        arp_rate: 0.0,
    };

    /// Return a copy with every field clamped into its domain.
    pub fn clamped(self) -> Self {
        Self {
            pitch: clamp_unit(self.pitch),
            position: clamp_unit(self.position),
            size: clamp_unit(self.size),
            density: clamp_unit(self.density),
            texture: clamp_unit(self.texture),
            feedback: clamp_unit(self.feedback),
            reverb: clamp_unit(self.reverb),
            dry_wet: clamp_unit(self.dry_wet),
            pitch_shift: clamp(self.pitch_shift, -PITCH_SHIFT_RANGE, PITCH_SHIFT_RANGE),
            stereo_spread: clamp_unit(self.stereo_spread),
            mod_wheel: clamp_unit(self.mod_wheel),
            master_volume: clamp_unit(self.master_volume),
            arp_rate: clamp_unit(self.arp_rate),
        }
    }

    /// `true` if every field already lies in its domain.
    pub fn is_clamped(&self) -> bool {
        self.clamped() == *self
    }
}

/// Physical travel of a potentiometer that does not reach full scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobTravel {
    pub min: f32,
    pub max: f32,
}

impl KnobTravel {
    /// Rescale a raw reading from `[min, max]` to `[0, 1]`.
    pub fn rescale(&self, raw: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        clamp_unit((raw - self.min) / span)
    }
}

/// Mapping from ADC channels to snapshot parameters.
///
/// Product variants differ only in this table, so it is configuration rather
/// than code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobMap {
    /// Channel of the grain position knob (also drives the arp rate).
    pub position: usize,
    /// Channel of the grain size knob.
    pub size: usize,
    /// Channel of the blend knob (density, feedback and reverb).
    pub blend: usize,
    /// Channel of the pitch knob.
    pub pitch: usize,
    /// Channel of the mod wheel.
    pub mod_wheel: usize,
    /// Channel read as the arpeggiator rate.
    pub arp_rate: usize,
    /// Travel shared by the position, size and blend knobs.
    pub travel: KnobTravel,
    /// Feedback at full blend.
    pub max_feedback: f32,
    /// Reverb at full blend.
    pub max_reverb: f32,
    /// Fixed texture passed to the engine.
    pub texture: f32,
    /// Fixed dry/wet mix.
    pub dry_wet: f32,
    /// Fixed pitch shift, in semitones.
    pub pitch_shift: f32,
    /// Fixed stereo spread.
    pub stereo_spread: f32,
    /// Fixed master volume, scaling the output gain.
    pub master_volume: f32,
}

impl Default for KnobMap {
    fn default() -> Self {
        Self {
            position: 4,
            size: 5,
            blend: 6,
            pitch: 7,
            mod_wheel: 11,
            arp_rate: 4,
            travel: KnobTravel { min: 0.0, max: 0.5 },
            max_feedback: 0.7,
            max_reverb: 0.5,
            texture: 0.3,
            dry_wet: 0.8,
            pitch_shift: 0.0,
            stereo_spread: 0.5,
            master_volume: 1.0,
        }
    }
}

impl KnobMap {
    /// Read channel `index`, clamped to `[0, 1]`. Out-of-range channels read as 0.
    fn read(knobs: &KnobFrame, index: usize) -> f32 {
        knobs.get(index).copied().map(clamp_unit).unwrap_or(0.0)
    }

    /// Derive a clamped snapshot from one frame of knob readings.
    pub fn snapshot(&self, knobs: &KnobFrame) -> ParameterSnapshot {
        let position = self.travel.rescale(Self::read(knobs, self.position));
        let size = self.travel.rescale(Self::read(knobs, self.size));
        // Blend is inverted: knob fully up is fully dry.
        let blend = 1.0 - self.travel.rescale(Self::read(knobs, self.blend));

        ParameterSnapshot {
            pitch: Self::read(knobs, self.pitch),
            position,
            size,
            density: blend,
            texture: self.texture,
            feedback: blend * self.max_feedback,
            reverb: blend * self.max_reverb,
            dry_wet: self.dry_wet,
            pitch_shift: self.pitch_shift,
            stereo_spread: self.stereo_spread,
            mod_wheel: Self::read(knobs, self.mod_wheel),
            master_volume: self.master_volume,
            arp_rate: self.travel.rescale(Self::read(knobs, self.arp_rate)),
        }
        .clamped()
    }
}
