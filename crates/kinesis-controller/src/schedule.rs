//! Fixed-timestep accumulator.
//!
//! Frames arrive at whatever rate the host renders; physics writes happen in
//! fixed increments. The leftover fraction is exposed as an interpolation
//! alpha for rendering.

use crate::config::SimulationConfig;

/// Shortest step the stepper accepts (s).
pub const MIN_FIXED_DT: f32 = 1e-4;

/// Converts variable frame times into a count of fixed steps.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepper {
    fixed_dt: f32,
    accumulator: f32,
    max_steps_per_frame: u32,
}

impl FixedStepper {
    /// Stepper with step length `fixed_dt` running at most
    /// `max_steps_per_frame` steps per frame. Step lengths below
    /// [`MIN_FIXED_DT`], and NaN, are raised to it.
    pub fn new(fixed_dt: f32, max_steps_per_frame: u32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(MIN_FIXED_DT),
            accumulator: 0.0,
            max_steps_per_frame: max_steps_per_frame.max(1),
        }
    }

    /// Stepper matching the simulation settings.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.fixed_dt(), config.max_steps_per_frame)
    }

    /// Length of one step (s).
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Add a frame's worth of time and return how many fixed steps to run.
    ///
    /// Whole steps beyond the per-frame cap are discarded so a long stall
    /// does not snowball into ever longer frames.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt;
        }

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_steps_per_frame {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        if self.accumulator >= self.fixed_dt {
            let dropped = (self.accumulator / self.fixed_dt).floor();
            tracing::warn!(
                dropped_steps = dropped as u64,
                max_steps = self.max_steps_per_frame,
                "simulation falling behind, dropping backlog"
            );
            self.accumulator %= self.fixed_dt;
        }

        steps
    }

    /// Fraction of a step left in the accumulator, in [0, 1).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Forget accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
