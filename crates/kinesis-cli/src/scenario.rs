//! Scenario files: the scene to build and the input timeline to replay.

use std::path::Path;

use anyhow::{bail, Context, Result};
use kinesis_controller::InputKeyframe;
use kinesis_physics::BodyShape;
use serde::{Deserialize, Serialize};

/// Shortest frame time accepted (s). Smaller values would leave the input
/// clock stuck.
const MIN_FRAME_TIME: f32 = 1e-5;

/// A scripted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Seconds to simulate.
    pub duration: f32,
    /// Frame lengths (s), cycled. Uneven values exercise the fixed-step
    /// accumulator the way a real render loop would.
    pub frame_times: Vec<f32>,
    pub player: PlayerSpawn,
    pub props: Vec<PropSpawn>,
    pub keyframes: Vec<InputKeyframe>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            duration: 5.0,
            frame_times: vec![1.0 / 60.0],
            player: PlayerSpawn::default(),
            props: vec![PropSpawn::default()],
            keyframes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSpawn {
    /// Capsule center.
    pub position: [f32; 3],
    pub mass: f32,
    pub half_height: f32,
    pub radius: f32,
    /// Eye offset above the capsule center.
    pub eye_height: f32,
    /// Initial yaw (rad); 0 faces -Z.
    pub yaw: f32,
}

impl Default for PlayerSpawn {
    fn default() -> Self {
        Self {
            position: [0.0, 1.0, 0.0],
            mass: 1.0,
            half_height: 0.5,
            radius: 0.5,
            eye_height: 0.5,
            yaw: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropSpawn {
    pub shape: BodyShape,
    pub position: [f32; 3],
    pub density: f32,
}

impl Default for PropSpawn {
    fn default() -> Self {
        Self {
            shape: BodyShape::cuboid(0.5, 0.5, 0.5),
            position: [0.0, 0.25, -2.0],
            density: 200.0,
        }
    }
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            bail!("duration must be positive, got {}", self.duration);
        }
        if self.frame_times.is_empty() {
            bail!("frame_times must not be empty");
        }
        if let Some(bad) = self
            .frame_times
            .iter()
            .find(|t| !(t.is_finite() && **t >= MIN_FRAME_TIME))
        {
            bail!("frame times must be at least {MIN_FRAME_TIME} s, got {bad}");
        }
        if !(self.player.mass > 0.0) {
            bail!("player mass must be positive, got {}", self.player.mass);
        }
        Ok(())
    }
}
