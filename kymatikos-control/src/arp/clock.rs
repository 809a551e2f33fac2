//! Sample-accurate trigger clock.

/// Counts elapsed samples and the deadline of the next trigger.
///
/// Deadlines advance by whole intervals from the previous deadline, never
/// from "now", so jitter in block timing does not accumulate into drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpClock {
    sample_rate: f32,
    tempo_hz: f32,
    ratio: f32,
    tempo_floor_hz: f32,
    /// Current inter-trigger interval, in samples.
    interval: f64,
    /// Samples advanced since the last reset.
    elapsed: u64,
    /// Sample position of the next trigger.
    deadline: f64,
}

impl ArpClock {
    /// A clock at 1 Hz, ratio 1, with its first trigger due immediately.
    pub fn new(sample_rate: f32, tempo_floor_hz: f32) -> Self {
        let mut clock = ArpClock {
            sample_rate: if sample_rate > 0.0 { sample_rate } else { 1.0 },
            tempo_hz: 1.0,
            ratio: 1.0,
            tempo_floor_hz: if tempo_floor_hz > 0.0 { tempo_floor_hz } else { f32::MIN_POSITIVE },
            interval: 0.0,
            elapsed: 0,
            deadline: 0.0,
        };
        clock.update_interval();
        clock
    }

    fn update_interval(&mut self) {
        self.interval = self.sample_rate as f64 / (self.tempo_hz as f64 * self.ratio as f64);
    }

    /// Set the base tempo, clamped to the floor.
    pub fn set_tempo(&mut self, hz: f32) {
        // NaN fails the comparison and lands on the floor too.
        self.tempo_hz = if hz >= self.tempo_floor_hz { hz } else { self.tempo_floor_hz };
        self.update_interval();
    }

    /// Set the polyrhythm ratio; non-positive ratios fall back to 1.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = if ratio > 0.0 { ratio } else { 1.0 };
        self.update_interval();
    }

    pub fn tempo_hz(&self) -> f32 {
        self.tempo_hz
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Effective interval between triggers, in seconds.
    pub fn interval_secs(&self) -> f32 {
        (self.interval / self.sample_rate as f64) as f32
    }

    /// Effective interval between triggers, in samples.
    pub fn interval_samples(&self) -> f64 {
        self.interval
    }

    /// Elapsed time since the last reset, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed as f64 / self.sample_rate as f64
    }

    pub fn advance(&mut self, frames: usize) {
        self.elapsed = self.elapsed.wrapping_add(frames as u64);
    }

    /// `true` if the next trigger deadline has been reached.
    pub fn is_due(&self) -> bool {
        self.elapsed as f64 >= self.deadline
    }

    /// Push the deadline one interval further.
    pub fn schedule_next(&mut self) {
        self.deadline += self.interval;
    }

    /// Restart time at zero with a trigger due immediately.
    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.deadline = 0.0;
    }
}
