//! # kymatikos-control
//!
//! A `no_std`, allocation-free control and scheduling core for a touch-pad
//! granular instrument. It turns knob and capacitive-touch readings into a
//! race-free parameter set for the synthesis engine, runs a sample-clocked
//! arpeggiator inside the audio callback, and drives the panel LEDs and the
//! pitch CV / gate outputs.
//!
//! ## Architecture
//!
//! Two contexts share state without locks:
//!
//! | Context | Rate | Owns |
//! |---------|------|------|
//! | Control ([`control`]) | ~1 kHz loop, touch at 200 Hz | debouncers, touch estimator, LEDs, CV/gate |
//! | Audio ([`audio`]) | once per block | arpeggiator, engine, private snapshot copy |
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Data | [`snapshot`] | `ParameterSnapshot` and the knob-to-parameter map |
//! | Handoff | [`exchange`] / [`shared`] / [`trigger_queue`] | Double buffer, atomic flags, trigger SPSC queue |
//! | Scheduling | [`arp`] | Note set, sample clock, trigger selection |
//! | Input | [`touch`] / [`debounce`] | Pressure estimation, MPR121 driver, hysteresis and hold timers |
//! | Mapping | [`pitch`] | Pad → voltage, pad → LED |
//! | Traits | [`engine`] / [`outputs`] | `GranularEngine` and `ControlOutputs` |
//!
//! ## Wiring
//!
//! ```ignore
//! static SHARED: SharedControls = SharedControls::new();
//! static TRIGGERS: TriggerQueue = TriggerQueue::new();
//!
//! let exchange = EXCHANGE.init(SnapshotExchange::new());
//! let (publisher, reader) = exchange.split();
//!
//! let present = mpr121.init().is_ok();
//! let mut control = ControlContext::new(ControlConfig::default(), publisher, &SHARED, &TRIGGERS, present);
//! let audio = AudioContext::new(AudioConfig::default(), reader, &SHARED, &TRIGGERS, engine);
//!
//! // In the audio interrupt:
//! audio.process_block(&input, &mut output);
//!
//! // In the main loop:
//! control.tick(now, &knobs);
//! control.poll_touch(&mut mpr121, now);
//! control.render(&mut panel, now);
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `mpr121` | yes | MPR121 touch controller driver (requires `embedded-hal`) |
//! | `defmt` | no | `defmt::Format` on public value types |
//!
//! ## Audio parameters
//!
//! - **Block size:** 32 frames ([`constants::AUDIO_BLOCK_FRAMES`])
//! - **Sample rate:** 48 kHz ([`constants::AUDIO_SAMPLE_RATE`])
//! - **Sample format:** stereo `f32` ([`engine::Frame`])

#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod snapshot;
pub mod exchange;
pub mod shared;
pub mod trigger_queue;
pub mod arp;
pub mod touch;
pub mod pitch;
pub mod debounce;
pub mod engine;
pub mod outputs;
pub mod control;
pub mod audio;
