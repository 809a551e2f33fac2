//! Seam between the audio context and the synthesis engine.
//!
//! The engine itself lives outside this crate. [`GranularEngine`] is all the
//! audio context needs from it: a parameter update per block, then one
//! stereo render call over at most one block of [`Frame`]s.

use crate::snapshot::ParameterSnapshot;

/// One stereo sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Both channels at zero.
    pub const SILENCE: Frame = Frame { left: 0.0, right: 0.0 };

    pub const fn new(left: f32, right: f32) -> Self {
        Frame { left, right }
    }
}

/// The synthesis engine driven by the audio context.
///
/// Both calls run inside the audio callback and must not block or allocate.
pub trait GranularEngine {
    /// Apply the parameters for the coming block.
    fn set_parameters(&mut self, parameters: &ParameterSnapshot);

    /// Render `output.len()` frames. `input` has the same length.
    fn process(&mut self, input: &[Frame], output: &mut [Frame]);
}
