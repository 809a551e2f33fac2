//! Scalar state shared between the control and audio contexts.
//!
//! Every field is a single atomic word with one writer. Nothing here needs a
//! multi-word transaction; that is what the [`exchange`](crate::exchange) is
//! for.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::constants::PAD_MASK;

/// An `f32` stored as its bit pattern in an [`AtomicU32`].
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    /// `0.0`, usable in `const` and `static` initializers.
    pub const fn zero() -> Self {
        AtomicF32(AtomicU32::new(0))
    }

    pub fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }
}

/// One-shot request raised by one context and consumed by the other.
///
/// Raising an already-pending request is idempotent; [`consume()`] returns
/// `true` exactly once per pending request.
///
/// [`consume()`]: RequestFlag::consume
pub struct RequestFlag(AtomicBool);

impl RequestFlag {
    pub const fn new() -> Self {
        RequestFlag(AtomicBool::new(false))
    }

    /// Raise the request (requesting side).
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Take the request if pending (servicing side).
    pub fn consume(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for RequestFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Cross-context flags and levels.
///
/// | Field | Writer | Reader |
/// |-------|--------|--------|
/// | touch mask | control | audio |
/// | pressure | control | control (CV out), status |
/// | arp enabled | control | audio |
/// | clear / restart requests | control | audio |
/// | input peak, output level | audio | control |
pub struct SharedControls {
    touch_mask: AtomicU16,
    pressure: AtomicF32,
    arp_enabled: AtomicBool,
    arp_clear: RequestFlag,
    arp_restart: RequestFlag,
    input_peak: AtomicF32,
    output_level: AtomicF32,
}

impl SharedControls {
    pub const fn new() -> Self {
        SharedControls {
            touch_mask: AtomicU16::new(0),
            pressure: AtomicF32::zero(),
            arp_enabled: AtomicBool::new(false),
            arp_clear: RequestFlag::new(),
            arp_restart: RequestFlag::new(),
            input_peak: AtomicF32::zero(),
            output_level: AtomicF32::zero(),
        }
    }

    pub fn touch_mask(&self) -> u16 {
        self.touch_mask.load(Ordering::Acquire)
    }

    pub fn set_touch_mask(&self, mask: u16) {
        self.touch_mask.store(mask & PAD_MASK, Ordering::Release);
    }

    pub fn pressure(&self) -> f32 {
        self.pressure.load(Ordering::Relaxed)
    }

    pub fn set_pressure(&self, value: f32) {
        self.pressure.store(value, Ordering::Relaxed);
    }

    pub fn arp_enabled(&self) -> bool {
        self.arp_enabled.load(Ordering::Acquire)
    }

    /// Enable or disable the arpeggiator.
    ///
    /// Disabling requests a note clear so nothing stale replays later;
    /// enabling requests a clock restart so the first held note fires at once.
    pub fn set_arp_enabled(&self, enabled: bool) {
        self.arp_enabled.store(enabled, Ordering::Release);
        if enabled {
            self.arp_restart.request();
        } else {
            self.arp_clear.request();
        }
    }

    /// Audio side: take a pending note-clear request.
    pub fn consume_arp_clear(&self) -> bool {
        self.arp_clear.consume()
    }

    /// Audio side: take a pending clock-restart request.
    pub fn consume_arp_restart(&self) -> bool {
        self.arp_restart.consume()
    }

    pub fn input_peak(&self) -> f32 {
        self.input_peak.load(Ordering::Relaxed)
    }

    pub fn set_input_peak(&self, level: f32) {
        self.input_peak.store(level, Ordering::Relaxed);
    }

    pub fn output_level(&self) -> f32 {
        self.output_level.load(Ordering::Relaxed)
    }

    pub fn set_output_level(&self, level: f32) {
        self.output_level.store(level, Ordering::Relaxed);
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new()
    }
}
