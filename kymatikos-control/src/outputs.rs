//! Panel outputs: pad LEDs, status LED, pitch CV and gate.

/// Indicator and CV/gate outputs written by the control context.
///
/// Implementations wrap GPIO pins and the CV DAC. Writes are infallible from
/// the caller's point of view; a driver that can fail should latch the fault
/// and report it through its own channel.
pub trait ControlOutputs {
    /// Drive the LED at `led` (0..12).
    fn set_pad_led(&mut self, led: usize, on: bool);

    /// Drive the status (heartbeat) LED.
    fn set_status_led(&mut self, on: bool);

    /// Pitch control voltage, already clamped to `[0, CV_MAX_VOLTS]`.
    fn set_pitch_cv(&mut self, volts: f32);

    /// Drive the gate output.
    fn set_gate(&mut self, high: bool);
}
