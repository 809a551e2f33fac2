//! The audio context: one call per audio block.
//!
//! Per block, [`AudioContext::process_block`]:
//!
//! 1. syncs the newest published snapshot into its private copy,
//! 2. services arp clear/restart requests and applies the tempo knob,
//! 3. feeds the touch mask to the arpeggiator and queues its triggers,
//! 4. conditions the input, runs the engine on one [`AUDIO_BLOCK_FRAMES`]
//!    block and writes the output, zeroing any frames past that block.
//!
//! Nothing here blocks, allocates or logs.

use crate::arp::{ArpConfig, Arpeggiator, Direction};
use crate::constants::{AUDIO_BLOCK_FRAMES, AUDIO_SAMPLE_RATE};
use crate::engine::{Frame, GranularEngine};
use crate::exchange::SnapshotReader;
use crate::shared::SharedControls;
use crate::snapshot::{clamp, ParameterSnapshot};
use crate::trigger_queue::TriggerQueue;

/// Gain staging of the audio path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub sample_rate: f32,
    /// Applied to the codec input before clamping to `[-1, 1]`.
    pub input_gain: f32,
    /// Applied to the engine output together with the master volume.
    pub output_gain: f32,
    /// Left channel only, right channel silenced.
    pub mono_left: bool,
    /// One-pole coefficient of the published output level, applied once
    /// per block.
    pub level_smoothing: f32,
    pub arp: ArpConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: AUDIO_SAMPLE_RATE,
            input_gain: 2.0,
            output_gain: 2.0,
            mono_left: true,
            level_smoothing: 0.99,
            arp: ArpConfig::default(),
        }
    }
}

/// Everything the audio callback owns.
pub struct AudioContext<'a, E> {
    config: AudioConfig,
    reader: SnapshotReader<'a>,
    shared: &'a SharedControls,
    triggers: &'a TriggerQueue,
    arp: Arpeggiator,
    engine: E,
    /// Touch mask last applied to the arpeggiator.
    held: u16,
    level: f32,
    input: [Frame; AUDIO_BLOCK_FRAMES],
    rendered: [Frame; AUDIO_BLOCK_FRAMES],
}

impl<'a, E: GranularEngine> AudioContext<'a, E> {
    pub fn new(
        config: AudioConfig,
        reader: SnapshotReader<'a>,
        shared: &'a SharedControls,
        triggers: &'a TriggerQueue,
        engine: E,
    ) -> Self {
        AudioContext {
            arp: Arpeggiator::new(config.sample_rate, config.arp),
            config,
            reader,
            shared,
            triggers,
            engine,
            held: 0,
            level: 0.0,
            input: [Frame::SILENCE; AUDIO_BLOCK_FRAMES],
            rendered: [Frame::SILENCE; AUDIO_BLOCK_FRAMES],
        }
    }

    pub fn arp(&self) -> &Arpeggiator {
        &self.arp
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Snapshot in effect for the last block.
    pub fn parameters(&self) -> &ParameterSnapshot {
        self.reader.current()
    }

    /// Process one block.
    ///
    /// At most [`AUDIO_BLOCK_FRAMES`] frames go through the engine and the
    /// arpeggiator clock; output frames past that are zeroed. Input frames
    /// past the end of `input` are treated as silence.
    pub fn process_block(&mut self, input: &[Frame], output: &mut [Frame]) {
        self.reader.sync_to_local();
        let parameters = *self.reader.current();

        let n = output.len().min(AUDIO_BLOCK_FRAMES);
        self.update_arp(&parameters, n);
        self.engine.set_parameters(&parameters);

        // Peak is taken after gain, before the clamp, so overdrive shows.
        let mut peak = 0.0f32;
        for (i, frame) in self.input[..n].iter_mut().enumerate() {
            let raw = input.get(i).copied().unwrap_or(Frame::SILENCE);
            let left = raw.left * self.config.input_gain;
            let right = raw.right * self.config.input_gain;
            peak = peak.max(libm::fabsf(left)).max(libm::fabsf(right));
            *frame = Frame::new(clamp(left, -1.0, 1.0), clamp(right, -1.0, 1.0));
        }

        self.engine.process(&self.input[..n], &mut self.rendered[..n]);

        let gain = self.config.output_gain * parameters.master_volume;
        let (body, tail) = output.split_at_mut(n);
        for (out, rendered) in body.iter_mut().zip(self.rendered[..n].iter()) {
            let left = rendered.left * gain;
            let right = if self.config.mono_left { 0.0 } else { rendered.right * gain };
            *out = Frame::new(left, right);
        }
        tail.fill(Frame::SILENCE);

        // One level update per block, from its first frame.
        if let Some(first) = body.first() {
            let s = self.config.level_smoothing;
            self.level = self.level * s + libm::fabsf(first.left) * (1.0 - s);
        }

        self.shared.set_input_peak(peak);
        self.shared.set_output_level(self.level);
    }

    fn update_arp(&mut self, parameters: &ParameterSnapshot, frames: usize) {
        if self.shared.consume_arp_clear() {
            self.arp.clear();
            self.held = 0;
        }
        if self.shared.consume_arp_restart() {
            self.arp.clear();
            self.held = 0;
            self.arp.set_direction(Direction::AsPlayed);
            self.arp.restart();
        }
        self.arp.set_tempo_from_knob(parameters.arp_rate);

        if !self.shared.arp_enabled() {
            return;
        }

        let mask = self.shared.touch_mask();
        self.arp.update_held_notes(mask, self.held);
        self.held = mask;

        let triggers = self.triggers;
        for trigger in self.arp.advance(frames) {
            triggers.push(trigger);
        }
    }
}
