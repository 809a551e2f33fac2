//! MPR121 register map.
//!
//! Registers are 8-bit addresses holding 8-bit values; multi-byte values are
//! little-endian and auto-increment on read.

// ── I2C addresses ──────────────────────────────────────────────────────────

/// ADDR pin tied to ground.
pub const I2C_ADDR_GND: u8 = 0x5A;

/// ADDR pin tied to VDD.
pub const I2C_ADDR_VDD: u8 = 0x5B;

// ── Status and data ────────────────────────────────────────────────────────

/// Touch status, electrodes 0-7 (bits 0-7) then 8-11 (bits 8-11).
/// - Bit 15: OVCF (over-current flag)
pub const TOUCH_STATUS_L: u8 = 0x00;

/// Electrode 0 filtered data, 10-bit, two bytes per electrode.
pub const FILTERED_DATA_0L: u8 = 0x04;

/// Electrode 0 baseline, upper 8 of 10 bits, one byte per electrode.
pub const BASELINE_0: u8 = 0x1E;

// ── Baseline filter ────────────────────────────────────────────────────────

/// Max half delta, rising.
pub const MHDR: u8 = 0x2B;
/// Noise half delta, rising.
pub const NHDR: u8 = 0x2C;
/// Noise count limit, rising.
pub const NCLR: u8 = 0x2D;
/// Filter delay count limit, rising.
pub const FDLR: u8 = 0x2E;
/// Max half delta, falling.
pub const MHDF: u8 = 0x2F;
/// Noise half delta, falling.
pub const NHDF: u8 = 0x30;
/// Noise count limit, falling.
pub const NCLF: u8 = 0x31;
/// Filter delay count limit, falling.
pub const FDLF: u8 = 0x32;
/// Noise half delta, touched.
pub const NHDT: u8 = 0x33;
/// Noise count limit, touched.
pub const NCLT: u8 = 0x34;
/// Filter delay count limit, touched.
pub const FDLT: u8 = 0x35;

// ── Thresholds ─────────────────────────────────────────────────────────────

/// Electrode 0 touch threshold. Electrode `n` is at `+ 2n`.
pub const TOUCH_THRESHOLD_0: u8 = 0x41;

/// Electrode 0 release threshold. Electrode `n` is at `+ 2n`.
pub const RELEASE_THRESHOLD_0: u8 = 0x42;

// ── Configuration ──────────────────────────────────────────────────────────

/// Debounce.
/// - Bits 6:4: DR (release debounce)
/// - Bits 2:0: DT (touch debounce)
pub const DEBOUNCE: u8 = 0x5B;

/// AFE configuration 1.
/// - Bits 7:6: FFI (first filter iterations)
/// - Bits 5:0: CDC (charge current, µA)
pub const CONFIG1: u8 = 0x5C;

/// AFE configuration 2.
/// - Bits 7:5: CDT (charge time)
/// - Bits 4:3: SFI (second filter iterations)
/// - Bits 2:0: ESI (electrode sample interval)
pub const CONFIG2: u8 = 0x5D;

/// CONFIG2 value after soft reset, used to detect the part.
pub const CONFIG2_RESET_VALUE: u8 = 0x24;

/// Electrode configuration.
/// - Bits 7:6: CL (baseline tracking)
/// - Bits 5:4: ELEPROX_EN
/// - Bits 3:0: ELE_EN (number of enabled electrodes)
pub const ECR: u8 = 0x5E;

/// Writing [`SOFT_RESET_MAGIC`] here resets the part.
pub const SOFT_RESET: u8 = 0x80;
pub const SOFT_RESET_MAGIC: u8 = 0x63;
