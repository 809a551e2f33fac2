/// Number of stereo frames per audio block.
pub const AUDIO_BLOCK_FRAMES: usize = 32;

/// Audio sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: f32 = 48_000.0;

/// Number of capacitive touch pads (and pad LEDs).
pub const NUM_PADS: usize = 12;

/// Number of analog control channels sampled by the ADC.
pub const NUM_KNOBS: usize = 12;

/// Mask with one bit set per touch pad.
pub const PAD_MASK: u16 = (1 << NUM_PADS) - 1;

/// Control tick period in milliseconds (1 kHz).
pub const CONTROL_TICK_MS: u32 = 1;

/// Touch sensor poll period in milliseconds (200 Hz).
pub const TOUCH_POLL_MS: u32 = 5;

/// Duration of an arpeggiator LED blink in milliseconds.
pub const ARP_LED_BLINK_MS: u32 = 100;

/// Duration of a gate pulse in milliseconds.
pub const GATE_PULSE_MS: u32 = 10;

/// Period of the status LED heartbeat in milliseconds.
pub const HEARTBEAT_PERIOD_MS: u32 = 1_000;

/// Interval between status log lines in milliseconds.
pub const STATUS_LOG_INTERVAL_MS: u32 = 3_000;

/// Upper bound of the control-voltage outputs, in volts.
pub const CV_MAX_VOLTS: f32 = 5.0;
