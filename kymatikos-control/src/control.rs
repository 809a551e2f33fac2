//! The control context: knob tick, touch poll, indicator rendering.
//!
//! [`ControlContext`] is driven by the firmware's main loop. It owns the
//! publishing half of the snapshot exchange and everything that only the
//! control loop touches (debouncers, touch estimator, LED blink timers).
//! State shared with the audio context goes through [`SharedControls`] and
//! the [`TriggerQueue`].
//!
//! ```ignore
//! loop {
//!     let now = millis();
//!     let events = control.tick(now, &adc.read_normalized());
//!     if events.enter_bootloader {
//!         reset_to_bootloader();
//!     }
//!     control.poll_touch(&mut mpr121, now);
//!     control.render(&mut panel, now);
//!     delay.delay_ms(CONTROL_TICK_MS);
//! }
//! ```

use crate::constants::{
    ARP_LED_BLINK_MS, CV_MAX_VOLTS, GATE_PULSE_MS, HEARTBEAT_PERIOD_MS, NUM_KNOBS, NUM_PADS,
    STATUS_LOG_INTERVAL_MS, TOUCH_POLL_MS,
};
use crate::debounce::{BootCombo, BootComboConfig, GatePulse, Toggle, ToggleConfig};
use crate::exchange::SnapshotPublisher;
use crate::outputs::ControlOutputs;
use crate::pitch::{LedLayout, PadVoltageMap};
use crate::shared::SharedControls;
use crate::snapshot::{clamp, KnobFrame, KnobMap};
use crate::touch::{PressureConfig, SensorStatus, TouchPressureEstimator, TouchReading, TouchSensor};
use crate::trigger_queue::TriggerQueue;

/// Control-context configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    pub knobs: KnobMap,
    /// Knob channel whose latch toggles the arpeggiator.
    pub arp_toggle_channel: usize,
    pub arp_toggle: ToggleConfig,
    pub boot_combo: BootComboConfig,
    pub pressure: PressureConfig,
    pub voltage: PadVoltageMap,
    pub leds: LedLayout,
    pub touch_poll_ms: u32,
    pub blink_ms: u32,
    pub gate_ms: u32,
    pub heartbeat_ms: u32,
    pub status_interval_ms: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            knobs: KnobMap::default(),
            arp_toggle_channel: 8,
            arp_toggle: ToggleConfig::default(),
            boot_combo: BootComboConfig::default(),
            pressure: PressureConfig::default(),
            voltage: PadVoltageMap::default(),
            leds: LedLayout::default(),
            touch_poll_ms: TOUCH_POLL_MS,
            blink_ms: ARP_LED_BLINK_MS,
            gate_ms: GATE_PULSE_MS,
            heartbeat_ms: HEARTBEAT_PERIOD_MS,
            status_interval_ms: STATUS_LOG_INTERVAL_MS,
        }
    }
}

/// What happened during one [`ControlContext::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlEvents {
    /// New arpeggiator state if the toggle flipped.
    pub arp_toggled: Option<bool>,
    /// The firmware-update gesture completed.
    pub enter_bootloader: bool,
}

/// Everything the control loop owns.
pub struct ControlContext<'a> {
    config: ControlConfig,
    publisher: SnapshotPublisher<'a>,
    shared: &'a SharedControls,
    triggers: &'a TriggerQueue,
    estimator: TouchPressureEstimator,
    arp_toggle: Toggle,
    boot_combo: BootCombo,
    gate: GatePulse,
    /// Blink start time per LED.
    blinks: [Option<u32>; NUM_PADS],
    pitch_cv: f32,
    last_touch_poll: Option<u32>,
    last_status: u32,
    fired: u32,
    dropped: u32,
}

impl<'a> ControlContext<'a> {
    /// `touch_present` is the outcome of the sensor bring-up at boot.
    pub fn new(
        config: ControlConfig,
        publisher: SnapshotPublisher<'a>,
        shared: &'a SharedControls,
        triggers: &'a TriggerQueue,
        touch_present: bool,
    ) -> Self {
        let estimator = if touch_present {
            TouchPressureEstimator::new(config.pressure)
        } else {
            log::warn!("touch sensor absent, touch input disabled");
            TouchPressureEstimator::absent(config.pressure)
        };
        ControlContext {
            arp_toggle: Toggle::new(config.arp_toggle, shared.arp_enabled()),
            boot_combo: BootCombo::new(config.boot_combo),
            gate: GatePulse::new(config.gate_ms),
            config,
            publisher,
            shared,
            triggers,
            estimator,
            blinks: [None; NUM_PADS],
            pitch_cv: 0.0,
            last_touch_poll: None,
            last_status: 0,
            fired: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn publisher(&self) -> &SnapshotPublisher<'a> {
        &self.publisher
    }

    pub fn estimator(&self) -> &TouchPressureEstimator {
        &self.estimator
    }

    /// Current pitch CV, clamped to the DAC range.
    pub fn pitch_cv(&self) -> f32 {
        clamp(self.pitch_cv, 0.0, CV_MAX_VOLTS)
    }

    /// Arp triggers dispatched so far.
    pub fn triggers_fired(&self) -> u32 {
        self.fired
    }

    // ── Control tick ───────────────────────────────────────────────────

    /// Run one control tick: debounce the arp toggle, publish a snapshot,
    /// watch for the bootloader gesture and dispatch pending arp triggers.
    pub fn tick(&mut self, now_ms: u32, knobs: &KnobFrame) -> ControlEvents {
        let mut events = ControlEvents::default();

        let channel = self.config.arp_toggle_channel;
        if channel < NUM_KNOBS {
            if let Some(enabled) = self.arp_toggle.update(knobs[channel]) {
                self.shared.set_arp_enabled(enabled);
                log::info!("arpeggiator {}", if enabled { "on" } else { "off" });
                events.arp_toggled = Some(enabled);
            }
        }

        self.publisher.publish(self.config.knobs.snapshot(knobs));

        if self.boot_combo.update(now_ms, knobs) {
            log::info!("bootloader gesture held, entering update mode");
            events.enter_bootloader = true;
        }

        self.drain_triggers(now_ms);

        if now_ms.wrapping_sub(self.last_status) >= self.config.status_interval_ms {
            self.last_status = now_ms;
            self.log_status();
        }

        events
    }

    /// Pull every pending arp trigger: blink its LED, fire the gate and move
    /// the pitch CV to its pad.
    pub fn drain_triggers(&mut self, now_ms: u32) {
        while let Some(trigger) = self.triggers.pop() {
            let pad = trigger.pad as usize;
            if let Some(led) = self.config.leds.led(pad) {
                self.blinks[led] = Some(now_ms);
            }
            self.pitch_cv = self.config.voltage.voltage(Some(pad));
            self.gate.fire(now_ms);
            self.fired = self.fired.wrapping_add(1);
        }
        self.dropped = self.dropped.wrapping_add(self.triggers.take_dropped());
    }

    fn log_status(&self) {
        let snapshot = self.publisher.latest();
        log::debug!(
            "touch {:03x} pressure {:.2} cv {:.2} arp {} fired {} dropped {} peak {:.2} out {:.3} vol {:.2}",
            self.shared.touch_mask(),
            self.shared.pressure(),
            self.pitch_cv(),
            self.shared.arp_enabled(),
            self.fired,
            self.dropped,
            self.shared.input_peak(),
            self.shared.output_level(),
            snapshot.master_volume,
        );
    }

    // ── Touch poll ─────────────────────────────────────────────────────

    /// Poll the touch sensor if the poll period has elapsed.
    ///
    /// Publishes the mask and pressure for the audio context, moves the
    /// pitch CV to the highest touched pad and fires the gate on onset.
    pub fn poll_touch<S: TouchSensor>(&mut self, sensor: &mut S, now_ms: u32) -> Option<TouchReading> {
        if let Some(last) = self.last_touch_poll {
            if now_ms.wrapping_sub(last) < self.config.touch_poll_ms {
                return None;
            }
        }
        self.last_touch_poll = Some(now_ms);

        let reading = self.estimator.poll(sensor);
        self.shared.set_touch_mask(reading.mask);
        self.shared.set_pressure(reading.pressure);

        if reading.status == SensorStatus::Absent {
            self.gate.cancel();
            return Some(reading);
        }
        if let Some(pad) = reading.pad {
            self.pitch_cv = self.config.voltage.voltage(Some(pad as usize));
        }
        if reading.onset {
            self.gate.fire(now_ms);
        }
        Some(reading)
    }

    // ── Indicators ─────────────────────────────────────────────────────

    fn heartbeat(&self, now_ms: u32) -> bool {
        let period = self.config.heartbeat_ms.max(2);
        now_ms % period < period / 2
    }

    fn blink_active(&mut self, led: usize, now_ms: u32) -> bool {
        match self.blinks[led] {
            Some(start) if now_ms.wrapping_sub(start) < self.config.blink_ms => true,
            Some(_) => {
                self.blinks[led] = None;
                false
            }
            None => false,
        }
    }

    /// LED levels at `now_ms`, indexed by LED.
    pub fn led_states(&mut self, now_ms: u32) -> [bool; NUM_PADS] {
        if !self.estimator.is_present() {
            return [self.heartbeat(now_ms); NUM_PADS];
        }

        let mut leds = [false; NUM_PADS];
        // With the arp on, held pads are notes; only blinks show.
        let show_touch = !self.shared.arp_enabled();
        let mask = self.shared.touch_mask();
        for pad in 0..NUM_PADS {
            if let Some(led) = self.config.leds.led(pad) {
                leds[led] = show_touch && mask & (1 << pad) != 0;
            }
        }
        for (led, lit) in leds.iter_mut().enumerate() {
            if self.blink_active(led, now_ms) {
                *lit = true;
            }
        }
        leds
    }

    /// Write every output for `now_ms`.
    pub fn render<O: ControlOutputs>(&mut self, outputs: &mut O, now_ms: u32) {
        let leds = self.led_states(now_ms);
        for (led, &on) in leds.iter().enumerate() {
            outputs.set_pad_led(led, on);
        }
        outputs.set_status_led(self.heartbeat(now_ms));
        outputs.set_gate(self.gate.is_high(now_ms));
        outputs.set_pitch_cv(self.pitch_cv());
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::arp::NoteTrigger;
    use crate::exchange::SnapshotExchange;
    use std::vec::Vec;

    struct Panel {
        leds: [bool; NUM_PADS],
        status: bool,
        cv: f32,
        gate: bool,
    }

    impl Panel {
        fn new() -> Self {
            Panel { leds: [false; NUM_PADS], status: false, cv: -1.0, gate: false }
        }
    }

    impl ControlOutputs for Panel {
        fn set_pad_led(&mut self, led: usize, on: bool) {
            self.leds[led] = on;
        }
        fn set_status_led(&mut self, on: bool) {
            self.status = on;
        }
        fn set_pitch_cv(&mut self, volts: f32) {
            self.cv = volts;
        }
        fn set_gate(&mut self, high: bool) {
            self.gate = high;
        }
    }

    struct FixedTouch {
        mask: u16,
        dead: bool,
    }

    impl TouchSensor for FixedTouch {
        type Error = ();

        fn touched(&mut self) -> Result<u16, ()> {
            if self.dead {
                Err(())
            } else {
                Ok(self.mask)
            }
        }
        fn baseline_deviation(&mut self, _pad: u8) -> Result<i16, ()> {
            Ok(75)
        }
        fn has_error(&self) -> bool {
            self.dead
        }
        fn clear_error(&mut self) {}
        fn reinit(&mut self) -> Result<(), ()> {
            if self.dead {
                Err(())
            } else {
                Ok(())
            }
        }
    }

    fn knobs_with(channel: usize, value: f32) -> KnobFrame {
        let mut knobs = [0.0; NUM_KNOBS];
        knobs[channel] = value;
        knobs
    }

    #[test]
    fn tick_publishes_snapshot() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, mut reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let mut ctl = ControlContext::new(ControlConfig::default(), publisher, &shared, &queue, true);

        let knobs = knobs_with(ControlConfig::default().knobs.position, 0.25);
        ctl.tick(0, &knobs);
        assert!(reader.sync_to_local());
        assert!((reader.current().position - 0.5).abs() < 1e-6);
        assert!(reader.current().is_clamped());
    }

    #[test]
    fn toggle_knob_flips_arp_and_requests() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let mut ctl = ControlContext::new(ControlConfig::default(), publisher, &shared, &queue, true);

        let on = ctl.tick(0, &knobs_with(8, 0.35)).arp_toggled;
        assert_eq!(on, Some(true));
        assert!(shared.arp_enabled());
        assert!(shared.consume_arp_restart());
        assert_eq!(ctl.tick(1, &knobs_with(8, 0.25)).arp_toggled, None);
        assert_eq!(ctl.tick(2, &knobs_with(8, 0.15)).arp_toggled, None);
        assert_eq!(ctl.tick(3, &knobs_with(8, 0.9)).arp_toggled, Some(false));
        assert!(!shared.arp_enabled());
        assert!(shared.consume_arp_clear());
    }

    #[test]
    fn boot_gesture_reported_once() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let config = ControlConfig::default();
        let mut ctl = ControlContext::new(config, publisher, &shared, &queue, true);

        let mut knobs = [0.0; NUM_KNOBS];
        for ch in config.boot_combo.channels {
            knobs[ch] = 0.9;
        }
        let start = config.boot_combo.grace_ms;
        let mut fired = Vec::new();
        for now in start..start + 3 * config.boot_combo.hold_ms {
            if ctl.tick(now, &knobs).enter_bootloader {
                fired.push(now - start);
            }
        }
        assert_eq!(fired, [config.boot_combo.hold_ms]);
        assert_eq!(config.boot_combo.hold_ms, 1_000);
    }

    #[test]
    fn triggers_blink_gate_and_cv() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let config = ControlConfig::default();
        let mut ctl = ControlContext::new(config, publisher, &shared, &queue, true);
        let mut panel = Panel::new();

        assert!(queue.push(NoteTrigger { pad: 6 }));
        ctl.drain_triggers(1_000);
        ctl.render(&mut panel, 1_000);
        let led = config.leds.led(6).unwrap();
        assert!(panel.leds[led]);
        assert!(panel.gate);
        assert!((panel.cv - config.voltage.base_voltage).abs() < 1e-6);
        assert_eq!(ctl.triggers_fired(), 1);

        ctl.render(&mut panel, 1_000 + config.gate_ms);
        assert!(!panel.gate);
        assert!(panel.leds[led]);
        ctl.render(&mut panel, 1_000 + config.blink_ms);
        assert!(!panel.leds[led]);
    }

    #[test]
    fn touch_poll_sets_shared_state_and_gate() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let config = ControlConfig::default();
        let mut ctl = ControlContext::new(config, publisher, &shared, &queue, true);
        let mut sensor = FixedTouch { mask: 0b0000_0001_0010, dead: false };
        let mut panel = Panel::new();

        let reading = ctl.poll_touch(&mut sensor, 0).unwrap();
        assert!(reading.onset);
        assert_eq!(shared.touch_mask(), 0b1_0010);
        assert!(shared.pressure() > 0.0);
        // Too soon for the next poll.
        assert!(ctl.poll_touch(&mut sensor, 1).is_none());

        ctl.render(&mut panel, 0);
        assert!(panel.gate);
        assert!((panel.cv - config.voltage.voltage(Some(4))).abs() < 1e-6);
        assert!(panel.leds[config.leds.led(4).unwrap()]);
        assert!(panel.leds[config.leds.led(1).unwrap()]);
        assert!(!panel.leds[config.leds.led(0).unwrap()]);

        // Held pads show no LEDs while the arp is on.
        shared.set_arp_enabled(true);
        ctl.render(&mut panel, 2);
        assert!(panel.leds.iter().all(|&on| !on));
    }

    #[test]
    fn absent_sensor_blinks_with_heartbeat() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let mut ctl = ControlContext::new(ControlConfig::default(), publisher, &shared, &queue, true);
        let mut sensor = FixedTouch { mask: 1, dead: true };
        let mut panel = Panel::new();

        let reading = ctl.poll_touch(&mut sensor, 0).unwrap();
        assert_eq!(reading.status, SensorStatus::Absent);
        assert_eq!(shared.touch_mask(), 0);

        ctl.render(&mut panel, 100);
        assert!(panel.status);
        assert!(panel.leds.iter().all(|&on| on));
        assert!(!panel.gate);
        ctl.render(&mut panel, 600);
        assert!(!panel.status);
        assert!(panel.leds.iter().all(|&on| !on));
    }

    #[test]
    fn pitch_cv_clamped() {
        let mut exchange = SnapshotExchange::new();
        let (publisher, _reader) = exchange.split();
        let shared = SharedControls::new();
        let queue = TriggerQueue::new();
        let config = ControlConfig {
            voltage: PadVoltageMap { base_voltage: 4.5, ..PadVoltageMap::default() },
            ..ControlConfig::default()
        };
        let mut ctl = ControlContext::new(config, publisher, &shared, &queue, true);
        assert!(queue.push(NoteTrigger { pad: 11 }));
        ctl.drain_triggers(0);
        assert_eq!(ctl.pitch_cv(), CV_MAX_VOLTS);
    }
}
