//! Pick up, carry and throw dynamic bodies.
//!
//! A held body is referenced by a weak handle and checked for liveness before
//! every use. Losing the body mid-hold is an implicit release.

use kinesis_physics::{BodySettings, PhysicsBackend, RayQuery};
use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::config::GrabConfig;
use crate::input::IntentLatch;
use crate::probe::ProbeTrace;

/// Eye position and look direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPose {
    /// Eye position.
    pub origin: Point3<f32>,
    /// Unit look direction.
    pub forward: Vector3<f32>,
}

impl ViewPose {
    /// Pose looking along `forward` (normalized; zero falls back to -Z).
    pub fn new(origin: Point3<f32>, forward: Vector3<f32>) -> Self {
        Self {
            origin,
            forward: forward
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -Vector3::z()),
        }
    }

    /// Point `distance` along the view ray.
    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.forward * distance
    }
}

impl Default for ViewPose {
    fn default() -> Self {
        Self::new(Point3::origin(), -Vector3::z())
    }
}

/// Something that changed the hold state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GrabEvent {
    /// A body was picked up at this distance.
    Acquired {
        /// Hit distance along the view ray.
        distance: f32,
    },
    /// The body was let go with this velocity.
    Released {
        /// Outgoing linear velocity.
        velocity: [f32; 3],
    },
    /// The held body was destroyed externally.
    Lost,
}

#[derive(Debug, Clone, Copy)]
struct Held<B> {
    body: B,
    restore: BodySettings,
}

/// Holds at most one body at a player-controlled distance.
#[derive(Debug, Clone)]
pub struct GrabController<B> {
    config: GrabConfig,
    ignore: Option<B>,
    held: Option<Held<B>>,
    hold_distance: f32,
    view: ViewPose,
    last_frame_position: Point3<f32>,
    derived_velocity: Vector3<f32>,
    last_probe: Option<ProbeTrace>,
}

impl<B: Copy + PartialEq + std::fmt::Debug> GrabController<B> {
    /// Create an empty-handed controller.
    pub fn new(config: GrabConfig) -> Self {
        let hold_distance = config.min_hold_distance;
        Self {
            config,
            ignore: None,
            held: None,
            hold_distance,
            view: ViewPose::default(),
            last_frame_position: Point3::origin(),
            derived_velocity: Vector3::zeros(),
            last_probe: None,
        }
    }

    /// Never pick up `body` (usually the player's own).
    pub fn ignoring(mut self, body: B) -> Self {
        self.ignore = Some(body);
        self
    }

    /// Current tuning.
    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    /// Whether a body is held.
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// The held body, if any.
    pub fn held_body(&self) -> Option<B> {
        self.held.map(|h| h.body)
    }

    /// Distance along the view ray the body is carried at.
    pub fn hold_distance(&self) -> f32 {
        self.hold_distance
    }

    /// Velocity estimate that seeds the throw.
    pub fn derived_velocity(&self) -> Vector3<f32> {
        self.derived_velocity
    }

    /// View latched by the latest frame.
    pub fn view(&self) -> ViewPose {
        self.view
    }

    /// The most recent pickup probe.
    pub fn last_probe(&self) -> Option<ProbeTrace> {
        self.last_probe
    }

    /// Variable-rate update: release checks, distance scroll, acquisition
    /// and the velocity estimate.
    pub fn frame<P>(
        &mut self,
        dt: f32,
        view: ViewPose,
        intents: &IntentLatch,
        physics: &mut P,
    ) -> Option<GrabEvent>
    where
        P: PhysicsBackend<Body = B>,
    {
        self.view = view;

        let Some(held) = self.held else {
            return self.try_acquire(intents.hold_intent, physics);
        };

        if !physics.is_alive(held.body) {
            return Some(self.lose());
        }
        if !intents.hold_intent {
            return self.release(physics);
        }

        if intents.scroll != 0.0 {
            self.adjust_distance(intents.scroll * self.config.scroll_speed * dt);
        }

        // Sampled per frame; any number of fixed steps may have run since.
        if let Some(position) = physics.position(held.body) {
            if dt > 0.0 {
                self.derived_velocity = (position - self.last_frame_position) / dt;
            }
            self.last_frame_position = position;
        }
        None
    }

    /// Fixed-rate update: ease the held body toward the hold point.
    pub fn fixed_step<P>(&mut self, dt: f32, intents: &IntentLatch, physics: &mut P) -> Option<GrabEvent>
    where
        P: PhysicsBackend<Body = B>,
    {
        let held = self.held?;

        let Some(current) = physics.position(held.body) else {
            return Some(self.lose());
        };
        if !intents.hold_intent {
            return self.release(physics);
        }

        let target = self.view.point_at(self.hold_distance);
        let t = (dt * self.config.hold_smoothness).clamp(0.0, 1.0);
        let eased = current + (target - current) * t;
        physics.move_to(held.body, eased);
        None
    }

    /// Change the hold distance by `delta`, clamped to the configured range.
    pub fn adjust_distance(&mut self, delta: f32) {
        self.hold_distance = (self.hold_distance + delta).clamp(
            self.config.min_hold_distance,
            self.config.max_hold_distance,
        );
    }

    /// Let go of the held body, restoring its gravity and damping and
    /// throwing it with the scaled velocity estimate.
    pub fn release<P>(&mut self, physics: &mut P) -> Option<GrabEvent>
    where
        P: PhysicsBackend<Body = B>,
    {
        let held = self.held?;
        if !physics.is_alive(held.body) {
            return Some(self.lose());
        }

        let velocity = self.derived_velocity * self.config.throw_multiplier;
        physics.apply_body_settings(held.body, held.restore);
        physics.set_linear_velocity(held.body, velocity);
        self.clear();

        tracing::debug!(body = ?held.body, ?velocity, "released");
        Some(GrabEvent::Released {
            velocity: velocity.into(),
        })
    }

    /// Forget the held body without touching the engine.
    pub fn force_release(&mut self) {
        self.clear();
    }

    fn lose(&mut self) -> GrabEvent {
        if let Some(held) = self.held {
            tracing::debug!(body = ?held.body, "held body no longer exists");
        }
        self.clear();
        GrabEvent::Lost
    }

    fn clear(&mut self) {
        self.held = None;
        self.derived_velocity = Vector3::zeros();
    }

    fn try_acquire<P>(&mut self, intent: bool, physics: &mut P) -> Option<GrabEvent>
    where
        P: PhysicsBackend<Body = B>,
    {
        let mut query = RayQuery::new(self.view.origin, self.view.forward, self.config.pickup_distance)
            .with_mask(self.config.pickup_mask);
        if let Some(ignore) = self.ignore {
            query = query.excluding(ignore);
        }

        let hit = physics.cast_ray(&query);
        self.last_probe = Some(ProbeTrace::from_query(&query, hit.map(|h| h.distance)));

        if !intent {
            return None;
        }
        let hit = hit?;
        let body = hit.body?;
        let restore = physics.body_settings(body)?;
        let position = physics.position(body)?;

        physics.set_gravity_enabled(body, false);
        physics.set_damping(body, self.config.held_linear_damping, restore.angular_damping);

        self.held = Some(Held { body, restore });
        self.hold_distance = hit.distance;
        self.last_frame_position = position;
        self.derived_velocity = Vector3::zeros();

        tracing::debug!(?body, distance = hit.distance, "acquired");
        Some(GrabEvent::Acquired {
            distance: hit.distance,
        })
    }
}
