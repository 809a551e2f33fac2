//! Capacitive touch input and pressure estimation.
//!
//! A [`TouchSensor`] reports a 12-bit touch mask and per-pad baseline
//! deviations. [`TouchPressureEstimator`] turns those into a smoothed
//! pressure value in `[0, 1]`, detects touch onsets, and recovers from
//! transport faults by reinitializing the sensor once per fault.
//!
//! ## Pressure pipeline (per poll)
//!
//! 1. No pad touched: pressure decays by [`PressureConfig::release_decay`].
//! 2. Otherwise the deviations of the touched pads are reduced
//!    ([`Reducer`]), divided by [`PressureConfig::sensitivity`], clamped to
//!    `[0, 1]` and shaped ([`Curve`]).
//! 3. Adaptive one-pole smoothing:
//!    `s = max(floor, ceiling - slope * |new - old|)`,
//!    `pressure = old * s + new * (1 - s)`.
//!
//! A poll whose mask read fails repeats the previous mask with decayed
//! pressure. Only a sensor that cannot be reinitialized reports an empty
//! mask from then on.

#[cfg(feature = "mpr121")]
pub mod mpr121;
#[cfg(feature = "mpr121")]
mod registers;

use crate::constants::{NUM_PADS, PAD_MASK};
use crate::snapshot::clamp_unit;

/// A 12-pad capacitive touch controller.
pub trait TouchSensor {
    /// Transport error type.
    type Error;

    /// Read the touch mask, one bit per pad.
    fn touched(&mut self) -> Result<u16, Self::Error>;

    /// Read how far `pad`'s filtered signal sits from its baseline.
    fn baseline_deviation(&mut self, pad: u8) -> Result<i16, Self::Error>;

    /// `true` if a transfer has failed since the last [`clear_error()`].
    ///
    /// [`clear_error()`]: TouchSensor::clear_error
    fn has_error(&self) -> bool;

    /// Clear the latched transport error.
    fn clear_error(&mut self);

    /// Reinitialize the controller with its default configuration.
    fn reinit(&mut self) -> Result<(), Self::Error>;
}

/// How the deviations of several touched pads combine into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reducer {
    /// Mean deviation of the touched pads.
    Average,
    /// Largest deviation among the touched pads.
    Maximum,
}

/// Concave shaping applied to the normalized pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Curve {
    /// `x²`: stable at light touch.
    Square,
    /// `√x`: responsive at light touch.
    SquareRoot,
}

impl Curve {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Curve::Square => x * x,
            Curve::SquareRoot => libm::sqrtf(x),
        }
    }
}

/// Pressure estimation policy and constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureConfig {
    pub reducer: Reducer,
    pub curve: Curve,
    /// Deviation that maps to full pressure.
    pub sensitivity: f32,
    /// Multiplier applied per poll while nothing is touched.
    pub release_decay: f32,
    /// Least smoothing, used for large jumps.
    pub smoothing_floor: f32,
    /// Most smoothing, used when the value is steady.
    pub smoothing_ceiling: f32,
    /// How fast smoothing falls off with the size of the jump.
    pub smoothing_slope: f32,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            reducer: Reducer::Average,
            curve: Curve::Square,
            sensitivity: 150.0,
            release_decay: 0.95,
            smoothing_floor: 0.5,
            smoothing_ceiling: 0.95,
            smoothing_slope: 2.0,
        }
    }
}

impl PressureConfig {
    /// Smoothing factor for a jump of `delta`.
    pub fn smoothing(&self, delta: f32) -> f32 {
        let s = self.smoothing_ceiling - self.smoothing_slope * libm::fabsf(delta);
        if s > self.smoothing_floor {
            s
        } else {
            self.smoothing_floor
        }
    }

    /// Normalize and shape a reduced deviation.
    pub fn shape(&self, deviation: f32) -> f32 {
        let normalized = if self.sensitivity > 0.0 {
            clamp_unit(deviation / self.sensitivity)
        } else {
            0.0
        };
        self.curve.apply(normalized)
    }
}

/// Health of the touch sensor as seen by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorStatus {
    /// Mask and deviations read normally.
    Ok,
    /// A fault was detected and the sensor reinitialized this poll.
    Recovered,
    /// A transfer failed this poll and the previous mask is repeated.
    /// Recovery runs on the next poll.
    Faulted,
    /// Reinitialization failed; touch input is disabled.
    Absent,
}

/// Result of one touch poll.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchReading {
    /// Touched pads.
    pub mask: u16,
    /// The mask went from empty to non-empty on this poll.
    pub onset: bool,
    /// Smoothed pressure in `[0, 1]`.
    pub pressure: f32,
    /// Highest touched pad, held after release until the sensor goes away.
    pub pad: Option<u8>,
    pub status: SensorStatus,
}

/// Debounced, smoothed pressure from touch deviations.
pub struct TouchPressureEstimator {
    config: PressureConfig,
    present: bool,
    pressure: f32,
    last_mask: u16,
    last_pad: Option<u8>,
}

impl TouchPressureEstimator {
    pub fn new(config: PressureConfig) -> Self {
        TouchPressureEstimator {
            config,
            present: true,
            pressure: 0.0,
            last_mask: 0,
            last_pad: None,
        }
    }

    /// Estimator for a sensor that failed to come up at boot.
    pub fn absent(config: PressureConfig) -> Self {
        let mut estimator = Self::new(config);
        estimator.present = false;
        estimator
    }

    pub fn config(&self) -> &PressureConfig {
        &self.config
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Run one poll against `sensor`.
    pub fn poll<S: TouchSensor>(&mut self, sensor: &mut S) -> TouchReading {
        if !self.present {
            return self.absent_reading();
        }

        let mut status = SensorStatus::Ok;
        if sensor.has_error() {
            sensor.clear_error();
            if sensor.reinit().is_err() {
                log::warn!("touch sensor reinit failed, disabling touch input");
                self.present = false;
                return self.absent_reading();
            }
            log::warn!("touch sensor fault cleared, controller reinitialized");
            status = SensorStatus::Recovered;
        }

        let mask = match sensor.touched() {
            Ok(mask) => mask & PAD_MASK,
            Err(_) => return self.hold_reading(),
        };

        let onset = self.last_mask == 0 && mask != 0;
        self.last_mask = mask;

        if mask == 0 {
            self.pressure *= self.config.release_decay;
            return self.reading(mask, onset, status);
        }

        self.last_pad = highest_pad(mask);
        match self.reduce(sensor, mask) {
            Some(deviation) => self.smooth(self.config.shape(deviation)),
            None => status = SensorStatus::Faulted,
        }
        self.reading(mask, onset, status)
    }

    /// Combine the deviations of the touched pads. `None` on a transfer error.
    fn reduce<S: TouchSensor>(&self, sensor: &mut S, mask: u16) -> Option<f32> {
        let mut total = 0.0f32;
        let mut max = f32::MIN;
        let mut count = 0u32;
        for pad in 0..NUM_PADS as u8 {
            if mask & (1 << pad) == 0 {
                continue;
            }
            let deviation = sensor.baseline_deviation(pad).ok()? as f32;
            total += deviation;
            if deviation > max {
                max = deviation;
            }
            count += 1;
        }
        if count == 0 {
            return Some(0.0);
        }
        Some(match self.config.reducer {
            Reducer::Average => total / count as f32,
            Reducer::Maximum => max,
        })
    }

    fn smooth(&mut self, target: f32) {
        let s = self.config.smoothing(target - self.pressure);
        self.pressure = self.pressure * s + target * (1.0 - s);
    }

    /// The mask could not be read: keep reporting the last one so a single
    /// bad transfer neither releases held pads nor raises an onset.
    fn hold_reading(&mut self) -> TouchReading {
        self.pressure *= self.config.release_decay;
        self.reading(self.last_mask, false, SensorStatus::Faulted)
    }

    /// Touch input is gone: decay and report nothing touched.
    fn absent_reading(&mut self) -> TouchReading {
        self.pressure *= self.config.release_decay;
        self.last_mask = 0;
        self.last_pad = None;
        self.reading(0, false, SensorStatus::Absent)
    }

    fn reading(&self, mask: u16, onset: bool, status: SensorStatus) -> TouchReading {
        TouchReading {
            mask,
            onset,
            pressure: self.pressure,
            pad: self.last_pad,
            status,
        }
    }
}

/// Index of the highest set pad bit.
pub fn highest_pad(mask: u16) -> Option<u8> {
    let mask = mask & PAD_MASK;
    if mask == 0 {
        None
    } else {
        Some(15 - mask.leading_zeros() as u8)
    }
}
