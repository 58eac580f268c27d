#![warn(missing_docs)]

//! First-person character controllers on top of a rigid-body engine.
//!
//! Two controllers share one intent latch:
//!
//! - [`LocomotionController`] probes for ground, writes horizontal velocity,
//!   jumps and runs a fuel-gated jetpack that refills after landing.
//! - [`GrabController`] picks up dynamic bodies in front of the camera,
//!   carries them at a scrollable distance and throws them on release.
//!
//! Both split work between a variable-rate `frame` (probes, timers, UI) and
//! a `fixed_step` (every write to the engine). [`Player`] composes them and
//! [`FixedStepper`] decides how many fixed steps each frame runs.
//!
//! # Example
//!
//! ```ignore
//! use kinesis_controller::{ControllerConfig, FixedStepper, FuelGauge, Heading, Player, ViewPose};
//!
//! let config = ControllerConfig::load("kinesis.toml")?;
//! let mut player = Player::new(&config, body);
//! let mut stepper = FixedStepper::from_config(&config.simulation);
//! let mut gauge = FuelGauge::default();
//!
//! loop {
//!     let input = source.poll(frame_dt);
//!     player.frame(frame_dt, &input, Heading::from_yaw(yaw), view, &mut world, &mut gauge);
//!     for _ in 0..stepper.advance(frame_dt) {
//!         player.fixed_step(stepper.fixed_dt(), &mut world);
//!         world.step(stepper.fixed_dt());
//!     }
//! }
//! ```

mod config;
mod display;
mod error;
mod grab;
mod input;
mod locomotion;
mod player;
mod probe;
mod schedule;

#[cfg(test)]
mod testing;

pub use config::{ControllerConfig, GrabConfig, LocomotionConfig, SimulationConfig};
pub use display::{FuelDisplay, FuelGauge};
pub use error::{ConfigError, Result};
pub use grab::{GrabController, GrabEvent, ViewPose};
pub use input::{InputEvent, InputKeyframe, InputSample, InputSource, IntentLatch, ScriptedInput};
pub use locomotion::{
    horizontal_velocity, speed_multiplier, Heading, LocomotionController, LocomotionState, StepReport,
};
pub use player::{FrameReport, Player};
pub use probe::ProbeTrace;
pub use schedule::{FixedStepper, MIN_FIXED_DT};
