//! MPR121 capacitive touch controller driver.
//!
//! Generic over any [`embedded_hal::i2c::I2c`] and
//! [`embedded_hal::delay::DelayNs`] implementation. Transfer failures are
//! returned and also latched in an error flag, which
//! [`TouchPressureEstimator`](super::TouchPressureEstimator) uses to trigger
//! a single reinitialization.
//!
//! # Example
//!
//! ```ignore
//! let mut touch = Mpr121::new(i2c, delay, Mpr121Config::default());
//! touch.init()?;                 // soft reset, thresholds, filters, run mode
//! let mask = touch.touched()?;   // one bit per electrode
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::registers as reg;
use super::TouchSensor;
use crate::constants::{NUM_PADS, PAD_MASK};

// ── Errors ─────────────────────────────────────────────────────────────────

/// MPR121 driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mpr121Error<E> {
    /// Bus transfer failed.
    I2c(E),
    /// No MPR121 answered with the expected post-reset CONFIG2 value.
    NotDetected { address: u8, config2: u8 },
    /// Electrode index out of range.
    InvalidPad(u8),
}

impl<E: fmt::Debug> fmt::Display for Mpr121Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mpr121Error::I2c(e) => write!(f, "i2c transfer failed: {:?}", e),
            Mpr121Error::NotDetected { address, config2 } => write!(
                f,
                "no mpr121 at {:#04x} (config2 = {:#04x})",
                address, config2
            ),
            Mpr121Error::InvalidPad(pad) => write!(f, "electrode {} out of range", pad),
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Bring-up parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpr121Config {
    pub address: u8,
    /// Tried once if `address` does not answer.
    pub fallback_address: Option<u8>,
    pub touch_threshold: u8,
    pub release_threshold: u8,
}

impl Default for Mpr121Config {
    fn default() -> Self {
        Self {
            address: reg::I2C_ADDR_GND,
            fallback_address: Some(reg::I2C_ADDR_VDD),
            touch_threshold: 6,
            release_threshold: 3,
        }
    }
}

// ── Driver struct ──────────────────────────────────────────────────────────

/// MPR121 driver.
pub struct Mpr121<I2C, D> {
    i2c: I2C,
    delay: D,
    config: Mpr121Config,
    /// Address that answered the last successful bring-up.
    address: u8,
    error: bool,
}

impl<I2C, D> Mpr121<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub const DEFAULT_ADDRESS: u8 = reg::I2C_ADDR_GND;
    pub const ALT_ADDRESS: u8 = reg::I2C_ADDR_VDD;

    pub fn new(i2c: I2C, delay: D, config: Mpr121Config) -> Self {
        Self {
            i2c,
            delay,
            address: config.address,
            config,
            error: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &Mpr121Config {
        &self.config
    }

    // ── Low-level I2C helpers ──────────────────────────────────────────

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Mpr121Error<I2C::Error>> {
        let result = self.i2c.write(self.address, &[register, value]);
        self.check(result)
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, Mpr121Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        let result = self.i2c.write_read(self.address, &[register], &mut buf);
        self.check(result)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self, register: u8) -> Result<u16, Mpr121Error<I2C::Error>> {
        let mut buf = [0u8; 2];
        let result = self.i2c.write_read(self.address, &[register], &mut buf);
        self.check(result)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn check(&mut self, result: Result<(), I2C::Error>) -> Result<(), Mpr121Error<I2C::Error>> {
        result.map_err(|e| {
            self.error = true;
            Mpr121Error::I2c(e)
        })
    }

    // ── Bring-up ───────────────────────────────────────────────────────

    /// Bring the part up at the configured address, falling back to the
    /// alternate address once.
    pub fn init(&mut self) -> Result<(), Mpr121Error<I2C::Error>> {
        let primary = self.config.address;
        match self.init_at(primary) {
            Ok(()) => Ok(()),
            Err(e) => match self.config.fallback_address {
                Some(fallback) if fallback != primary => {
                    log::info!("mpr121 not found at {:#04x}, trying {:#04x}", primary, fallback);
                    self.error = false;
                    self.init_at(fallback)
                }
                _ => Err(e),
            },
        }
    }

    fn init_at(&mut self, address: u8) -> Result<(), Mpr121Error<I2C::Error>> {
        self.address = address;

        self.write_register(reg::SOFT_RESET, reg::SOFT_RESET_MAGIC)?;
        self.delay.delay_ms(1);
        // Stop mode: configuration registers are only writable here.
        self.write_register(reg::ECR, 0x00)?;

        let config2 = self.read_register(reg::CONFIG2)?;
        if config2 != reg::CONFIG2_RESET_VALUE {
            return Err(Mpr121Error::NotDetected { address, config2 });
        }

        self.set_thresholds(self.config.touch_threshold, self.config.release_threshold)?;

        for (register, value) in [
            (reg::MHDR, 0x01),
            (reg::NHDR, 0x01),
            (reg::NCLR, 0x0E),
            (reg::FDLR, 0x00),
            (reg::MHDF, 0x01),
            (reg::NHDF, 0x05),
            (reg::NCLF, 0x01),
            (reg::FDLF, 0x00),
            (reg::NHDT, 0x00),
            (reg::NCLT, 0x00),
            (reg::FDLT, 0x00),
        ] {
            self.write_register(register, value)?;
        }

        self.write_register(reg::DEBOUNCE, 0x00)?;
        // 16 µA charge current, 6 samples.
        self.write_register(reg::CONFIG1, 0x10)?;
        // 0.5 µs charge time, 1 ms sample interval.
        self.write_register(reg::CONFIG2, 0x20)?;
        // Run mode: baseline tracking on, all 12 electrodes.
        self.write_register(reg::ECR, 0x8F)?;

        log::info!("mpr121 up at {:#04x}", address);
        Ok(())
    }

    /// Write the same touch/release thresholds to every electrode.
    pub fn set_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Mpr121Error<I2C::Error>> {
        for pad in 0..NUM_PADS as u8 {
            self.write_register(reg::TOUCH_THRESHOLD_0 + 2 * pad, touch)?;
            self.write_register(reg::RELEASE_THRESHOLD_0 + 2 * pad, release)?;
        }
        Ok(())
    }

    // ── Electrode data ─────────────────────────────────────────────────

    /// 10-bit filtered electrode signal.
    pub fn filtered_data(&mut self, pad: u8) -> Result<u16, Mpr121Error<I2C::Error>> {
        if pad as usize >= NUM_PADS {
            return Err(Mpr121Error::InvalidPad(pad));
        }
        Ok(self.read_u16(reg::FILTERED_DATA_0L + 2 * pad)? & 0x03FF)
    }

    /// 10-bit baseline (the register holds the upper 8 bits).
    pub fn baseline_data(&mut self, pad: u8) -> Result<u16, Mpr121Error<I2C::Error>> {
        if pad as usize >= NUM_PADS {
            return Err(Mpr121Error::InvalidPad(pad));
        }
        Ok((self.read_register(reg::BASELINE_0 + pad)? as u16) << 2)
    }

    /// Release the I2C bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

// ── TouchSensor trait implementation ───────────────────────────────────────

impl<I2C, D> TouchSensor for Mpr121<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = Mpr121Error<I2C::Error>;

    fn touched(&mut self) -> Result<u16, Self::Error> {
        Ok(self.read_u16(reg::TOUCH_STATUS_L)? & PAD_MASK)
    }

    /// Baseline minus filtered: positive while a finger is on the pad.
    fn baseline_deviation(&mut self, pad: u8) -> Result<i16, Self::Error> {
        let filtered = self.filtered_data(pad)?;
        let baseline = self.baseline_data(pad)?;
        Ok(baseline as i16 - filtered as i16)
    }

    fn has_error(&self) -> bool {
        self.error
    }

    fn clear_error(&mut self) {
        self.error = false;
    }

    fn reinit(&mut self) -> Result<(), Self::Error> {
        self.init()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
