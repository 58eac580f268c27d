//! Grounded/airborne locomotion with a fuel-gated jetpack.
//!
//! The variable-rate frame probes for ground and refills fuel. The fixed
//! step writes horizontal velocity, performs jumps and applies thrust.

use kinesis_physics::{ForceMode, PhysicsBackend, RayQuery};
use nalgebra::{Vector2, Vector3};
use serde::Serialize;

use crate::config::LocomotionConfig;
use crate::display::FuelDisplay;
use crate::grab::GrabEvent;
use crate::input::IntentLatch;
use crate::probe::ProbeTrace;

/// Horizontal basis the move axes are expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    /// Direction of +forward input.
    pub forward: Vector3<f32>,
    /// Direction of +strafe input.
    pub right: Vector3<f32>,
}

impl Heading {
    /// Heading for a yaw angle (radians) about +Y. Yaw 0 faces -Z with +X
    /// to the right.
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            forward: Vector3::new(-sin, 0.0, -cos),
            right: Vector3::new(cos, 0.0, -sin),
        }
    }
}

impl Default for Heading {
    fn default() -> Self {
        Self::from_yaw(0.0)
    }
}

/// Per-frame locomotion state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocomotionState {
    /// Result of this frame's ground probe.
    pub is_grounded: bool,
    /// Result of the previous frame's ground probe.
    pub was_grounded_last_frame: bool,
    /// Remaining jetpack fuel in [0, 1].
    pub fuel: f32,
    /// Seconds left before refill may start.
    pub refill_timer: f32,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self {
            is_grounded: false,
            was_grounded_last_frame: false,
            fuel: 1.0,
            refill_timer: 0.0,
        }
    }
}

/// What a fixed step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepReport {
    /// A jump impulse was applied.
    pub jumped: bool,
    /// Jetpack force was applied.
    pub thrusted: bool,
    /// Hold state change raised during the step. Only the player rig, which
    /// also runs the grab, fills this in.
    pub grab: Option<GrabEvent>,
}

/// Combined speed multiplier for a move input.
///
/// Backward beats pure strafing; the air and sprint multipliers stack on top.
/// Diagonal forward+strafe input gets neither the back nor the side factor.
pub fn speed_multiplier(
    move_axis: Vector2<f32>,
    grounded: bool,
    sprinting: bool,
    config: &LocomotionConfig,
) -> f32 {
    let mut multiplier = 1.0;

    if move_axis.y < 0.0 {
        multiplier *= config.back_multiplier;
    } else if move_axis.y == 0.0 && move_axis.x != 0.0 {
        multiplier *= config.side_multiplier;
    }

    if !grounded {
        multiplier *= config.air_multiplier;
    }

    if grounded && sprinting && move_axis.y > 0.0 {
        multiplier *= config.sprint_multiplier;
    }

    multiplier
}

/// Desired horizontal velocity (y = 0) for a move input.
pub fn horizontal_velocity(
    move_axis: Vector2<f32>,
    heading: Heading,
    grounded: bool,
    sprinting: bool,
    config: &LocomotionConfig,
) -> Vector3<f32> {
    let direction = heading.forward * move_axis.y + heading.right * move_axis.x;
    let Some(direction) = direction.try_normalize(f32::EPSILON) else {
        return Vector3::zeros();
    };

    let speed = config.move_speed * speed_multiplier(move_axis, grounded, sprinting, config);
    Vector3::new(direction.x * speed, 0.0, direction.z * speed)
}

/// Drives one character body.
#[derive(Debug, Clone)]
pub struct LocomotionController<B> {
    config: LocomotionConfig,
    body: B,
    state: LocomotionState,
    heading: Heading,
    last_probe: Option<ProbeTrace>,
}

impl<B: Copy + std::fmt::Debug> LocomotionController<B> {
    /// Create a controller for `body` with a full tank.
    pub fn new(config: LocomotionConfig, body: B) -> Self {
        Self {
            config,
            body,
            state: LocomotionState::default(),
            heading: Heading::default(),
            last_probe: None,
        }
    }

    /// The controlled body.
    pub fn body(&self) -> B {
        self.body
    }

    /// Current tuning.
    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    /// Snapshot of the state.
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    /// Whether the last ground probe hit.
    pub fn is_grounded(&self) -> bool {
        self.state.is_grounded
    }

    /// Remaining fuel in [0, 1].
    pub fn fuel(&self) -> f32 {
        self.state.fuel
    }

    /// Overwrite the fuel level, clamped to [0, 1].
    pub fn set_fuel(&mut self, fuel: f32) {
        self.state.fuel = clamp_unit(fuel);
    }

    /// Heading latched by the latest frame.
    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// The most recent ground probe.
    pub fn last_probe(&self) -> Option<ProbeTrace> {
        self.last_probe
    }

    /// Variable-rate update: classify ground and refill fuel.
    ///
    /// Returns true when the body landed this frame.
    pub fn frame<P>(&mut self, dt: f32, heading: Heading, physics: &P) -> bool
    where
        P: PhysicsBackend<Body = B>,
    {
        self.heading = heading;
        let landed = self.probe_ground(physics);
        self.refill(dt);
        landed
    }

    /// Push the fuel ratio to a display.
    pub fn project_fuel(&self, display: &mut dyn FuelDisplay) {
        display.set_fill(self.state.fuel);
    }

    /// Fixed-rate update: movement, jump and jetpack.
    ///
    /// The jump request is consumed whether or not it could be honored.
    pub fn fixed_step<P>(&mut self, dt: f32, intents: &mut IntentLatch, physics: &mut P) -> StepReport
    where
        P: PhysicsBackend<Body = B>,
    {
        let mut report = StepReport::default();
        let jump = intents.take_jump();

        if self.state.is_grounded {
            self.write_horizontal(intents, physics);
            if jump {
                self.jump(physics);
                report.jumped = true;
            }
        } else {
            if self.config.air_control {
                self.write_horizontal(intents, physics);
            }
            report.thrusted = self.thrust(dt, intents.thrust_active, physics);
        }

        report
    }

    fn probe_ground<P>(&mut self, physics: &P) -> bool
    where
        P: PhysicsBackend<Body = B>,
    {
        let hit_distance = physics.position(self.body).and_then(|origin| {
            let query = RayQuery::new(origin, -Vector3::y(), self.config.ground_probe_distance)
                .with_mask(self.config.ground_mask)
                .excluding(self.body);
            let hit = physics.cast_ray(&query).map(|h| h.distance);
            self.last_probe = Some(ProbeTrace::from_query(&query, hit));
            hit
        });

        self.state.is_grounded = hit_distance.is_some();
        let landed = self.state.is_grounded && !self.state.was_grounded_last_frame;
        if landed {
            if self.state.fuel <= 0.0 {
                self.state.refill_timer = self.config.refill_delay;
            }
            tracing::debug!(
                body = ?self.body,
                fuel = self.state.fuel,
                refill_timer = self.state.refill_timer,
                "landed"
            );
        }
        self.state.was_grounded_last_frame = self.state.is_grounded;
        landed
    }

    fn refill(&mut self, dt: f32) {
        if !self.state.is_grounded || self.state.fuel >= 1.0 {
            return;
        }

        if self.state.refill_timer > 0.0 {
            self.state.refill_timer = (self.state.refill_timer - dt).max(0.0);
        } else {
            self.state.fuel = clamp_unit(self.state.fuel + dt / self.config.refill_time);
        }
    }

    fn write_horizontal<P>(&self, intents: &IntentLatch, physics: &mut P)
    where
        P: PhysicsBackend<Body = B>,
    {
        let Some(current) = physics.linear_velocity(self.body) else {
            return;
        };
        let horizontal = horizontal_velocity(
            intents.move_axis,
            self.heading,
            self.state.is_grounded,
            intents.sprinting,
            &self.config,
        );
        physics.set_linear_velocity(self.body, Vector3::new(horizontal.x, current.y, horizontal.z));
    }

    fn jump<P>(&self, physics: &mut P)
    where
        P: PhysicsBackend<Body = B>,
    {
        let Some(velocity) = physics.linear_velocity(self.body) else {
            return;
        };
        physics.set_linear_velocity(self.body, Vector3::new(velocity.x, 0.0, velocity.z));
        physics.apply_impulse(self.body, Vector3::y() * self.config.jump_force);
        tracing::debug!(body = ?self.body, "jump");
    }

    fn thrust<P>(&mut self, dt: f32, active: bool, physics: &mut P) -> bool
    where
        P: PhysicsBackend<Body = B>,
    {
        if !active || self.state.fuel <= 0.0 {
            return false;
        }

        physics.add_force(
            self.body,
            Vector3::y() * self.config.thrust_acceleration,
            ForceMode::Acceleration,
        );
        self.state.fuel = clamp_unit(self.state.fuel - dt / self.config.fuel_duration);
        tracing::trace!(body = ?self.body, fuel = self.state.fuel, "thrust");
        true
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
