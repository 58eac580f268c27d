//! Tuning parameters for the controllers, loadable from TOML.

use std::path::Path;

use kinesis_physics::CollisionMask;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Movement, jump and jetpack tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Base horizontal speed (m/s).
    pub move_speed: f32,
    /// Upward impulse applied on jump (N·s).
    pub jump_force: f32,
    /// Length of the downward ground probe from the body origin (m).
    pub ground_probe_distance: f32,
    /// Layers that count as ground.
    pub ground_mask: CollisionMask,
    /// Multiplier for pure strafing.
    pub side_multiplier: f32,
    /// Multiplier for any backward movement.
    pub back_multiplier: f32,
    /// Multiplier while airborne.
    pub air_multiplier: f32,
    /// Multiplier for grounded forward sprinting.
    pub sprint_multiplier: f32,
    /// Jetpack acceleration (m/s²), mass independent.
    pub thrust_acceleration: f32,
    /// Seconds of continuous thrust a full tank provides.
    pub fuel_duration: f32,
    /// Seconds to refill an empty tank while grounded.
    pub refill_time: f32,
    /// Penalty (s) before refill starts after landing on an empty tank.
    pub refill_delay: f32,
    /// Also steer horizontally while airborne.
    pub air_control: bool,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_force: 5.0,
            ground_probe_distance: 1.1,
            ground_mask: CollisionMask::ALL,
            side_multiplier: 0.75,
            back_multiplier: 0.5,
            air_multiplier: 0.5,
            sprint_multiplier: 2.0,
            thrust_acceleration: 6.0,
            fuel_duration: 1.0,
            refill_time: 0.5,
            refill_delay: 0.5,
            air_control: false,
        }
    }
}

impl LocomotionConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        non_negative("locomotion.move_speed", self.move_speed)?;
        non_negative("locomotion.jump_force", self.jump_force)?;
        positive("locomotion.ground_probe_distance", self.ground_probe_distance)?;
        non_negative("locomotion.side_multiplier", self.side_multiplier)?;
        non_negative("locomotion.back_multiplier", self.back_multiplier)?;
        non_negative("locomotion.air_multiplier", self.air_multiplier)?;
        non_negative("locomotion.sprint_multiplier", self.sprint_multiplier)?;
        non_negative("locomotion.thrust_acceleration", self.thrust_acceleration)?;
        positive("locomotion.fuel_duration", self.fuel_duration)?;
        positive("locomotion.refill_time", self.refill_time)?;
        non_negative("locomotion.refill_delay", self.refill_delay)?;
        Ok(())
    }
}

/// Pickup, carry and throw tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Reach of the pickup probe (m).
    pub pickup_distance: f32,
    /// Layers eligible for pickup.
    pub pickup_mask: CollisionMask,
    /// Approach rate toward the hold point (1/s).
    pub hold_smoothness: f32,
    /// Closest the held object can be scrolled in (m).
    pub min_hold_distance: f32,
    /// Farthest the held object can be scrolled out (m).
    pub max_hold_distance: f32,
    /// Hold distance change per unit of scroll per second.
    pub scroll_speed: f32,
    /// Scale from hand motion velocity to throw velocity.
    pub throw_multiplier: f32,
    /// Linear damping applied to the held object.
    pub held_linear_damping: f32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            pickup_distance: 2.0,
            pickup_mask: CollisionMask::ALL,
            hold_smoothness: 10.0,
            min_hold_distance: 1.0,
            max_hold_distance: 4.0,
            scroll_speed: 20.0,
            throw_multiplier: 2.0,
            held_linear_damping: 10.0,
        }
    }
}

impl GrabConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        positive("grab.pickup_distance", self.pickup_distance)?;
        positive("grab.hold_smoothness", self.hold_smoothness)?;
        non_negative("grab.min_hold_distance", self.min_hold_distance)?;
        positive("grab.max_hold_distance", self.max_hold_distance)?;
        if self.min_hold_distance > self.max_hold_distance {
            return Err(ConfigError::Invalid {
                field: "grab.min_hold_distance",
                reason: format!(
                    "must not exceed max_hold_distance ({} > {})",
                    self.min_hold_distance, self.max_hold_distance
                ),
            });
        }
        non_negative("grab.scroll_speed", self.scroll_speed)?;
        non_negative("grab.throw_multiplier", self.throw_multiplier)?;
        non_negative("grab.held_linear_damping", self.held_linear_damping)?;
        Ok(())
    }
}

/// Cadence of the fixed simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed steps per second.
    pub fixed_rate_hz: f32,
    /// Cap on fixed steps run for a single frame; older backlog is dropped.
    pub max_steps_per_frame: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_rate_hz: 50.0,
            max_steps_per_frame: 8,
        }
    }
}

impl SimulationConfig {
    /// Length of one fixed step (s).
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.fixed_rate_hz
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        positive("simulation.fixed_rate_hz", self.fixed_rate_hz)?;
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.max_steps_per_frame",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Movement and jetpack.
    pub locomotion: LocomotionConfig,
    /// Pickup and throw.
    pub grab: GrabConfig,
    /// Step cadence.
    pub simulation: SimulationConfig,
}

impl ControllerConfig {
    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.locomotion.validate()?;
        self.grab.validate()?;
        self.simulation.validate()
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be >= 0, got {value}"),
        })
    }
}
