//! Engine-agnostic physics operations consumed by the character controllers.

use std::fmt::Debug;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Bit layers used to filter ray queries.
///
/// A query mask matches a collider when the two share at least one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing.
    pub const NONE: Self = Self(0);

    /// Mask containing only layer `n` (0..32).
    pub const fn layer(n: u32) -> Self {
        Self(1 << (n & 31))
    }

    /// Union of two masks.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when the masks share at least one layer.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every layer of `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// How a continuous force is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Newtons; the resulting acceleration depends on body mass.
    Force,
    /// m/s²; applied identically regardless of body mass.
    Acceleration,
}

/// A nearest-hit ray query.
#[derive(Debug, Clone, Copy)]
pub struct RayQuery<B> {
    /// Ray origin in world space.
    pub origin: Point3<f32>,
    /// Unit direction.
    pub direction: Vector3<f32>,
    /// Maximum distance along the ray.
    pub max_distance: f32,
    /// Layers the ray may hit.
    pub mask: CollisionMask,
    /// Body whose colliders are ignored (usually the caster itself).
    pub exclude: Option<B>,
}

impl<B> RayQuery<B> {
    /// Create a query against all layers. A zero direction yields a query
    /// that never hits.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros),
            max_distance: max_distance.max(0.0),
            mask: CollisionMask::ALL,
            exclude: None,
        }
    }

    /// Restrict the query to `mask`.
    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }

    /// Ignore the colliders of `body`.
    pub fn excluding(mut self, body: B) -> Self {
        self.exclude = Some(body);
        self
    }

    /// Point at `distance` along the ray.
    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

/// Result of a successful ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<B> {
    /// Distance from the ray origin to the hit.
    pub distance: f32,
    /// World-space hit point.
    pub point: Point3<f32>,
    /// The dynamic rigid body owning the struck collider, if any.
    pub body: Option<B>,
}

/// Gravity and damping state of a body, captured so it can be restored later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySettings {
    /// Whether world gravity affects the body.
    pub gravity_enabled: bool,
    /// Linear velocity damping.
    pub linear_damping: f32,
    /// Angular velocity damping.
    pub angular_damping: f32,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            gravity_enabled: true,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

/// Operations a rigid-body engine must expose to drive the controllers.
///
/// Body handles are weak: they index storage owned by the engine and may
/// outlive the body they refer to. Getters return `None` and setters do
/// nothing when the handle is dead.
pub trait PhysicsBackend {
    /// Weak handle to an engine-owned rigid body.
    type Body: Copy + Eq + Debug;

    /// Whether `body` still refers to a live rigid body.
    fn is_alive(&self, body: Self::Body) -> bool;

    /// World-space position of the body origin.
    fn position(&self, body: Self::Body) -> Option<Point3<f32>>;

    /// Current linear velocity.
    fn linear_velocity(&self, body: Self::Body) -> Option<Vector3<f32>>;

    /// Overwrite the linear velocity.
    fn set_linear_velocity(&mut self, body: Self::Body, velocity: Vector3<f32>);

    /// Apply an instantaneous impulse at the center of mass.
    fn apply_impulse(&mut self, body: Self::Body, impulse: Vector3<f32>);

    /// Apply a continuous force for the next simulation step.
    fn add_force(&mut self, body: Self::Body, force: Vector3<f32>, mode: ForceMode);

    /// Move the body toward `target` while still colliding with the world.
    fn move_to(&mut self, body: Self::Body, target: Point3<f32>);

    /// Nearest hit along the query ray.
    fn cast_ray(&self, query: &RayQuery<Self::Body>) -> Option<RayHit<Self::Body>>;

    /// Whether gravity affects the body.
    fn gravity_enabled(&self, body: Self::Body) -> Option<bool>;

    /// Enable or disable gravity for the body.
    fn set_gravity_enabled(&mut self, body: Self::Body, enabled: bool);

    /// Linear and angular damping.
    fn damping(&self, body: Self::Body) -> Option<(f32, f32)>;

    /// Set linear and angular damping.
    fn set_damping(&mut self, body: Self::Body, linear: f32, angular: f32);

    /// Snapshot gravity and damping so they can be restored later.
    fn body_settings(&self, body: Self::Body) -> Option<BodySettings> {
        let gravity_enabled = self.gravity_enabled(body)?;
        let (linear_damping, angular_damping) = self.damping(body)?;
        Some(BodySettings {
            gravity_enabled,
            linear_damping,
            angular_damping,
        })
    }

    /// Restore a snapshot taken with [`PhysicsBackend::body_settings`].
    fn apply_body_settings(&mut self, body: Self::Body, settings: BodySettings) {
        self.set_gravity_enabled(body, settings.gravity_enabled);
        self.set_damping(body, settings.linear_damping, settings.angular_damping);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_layers() {
        let ground = CollisionMask::layer(0);
        let props = CollisionMask::layer(3);
        let both = ground.with(props);

        assert!(both.intersects(ground));
        assert!(both.contains(props));
        assert!(!ground.intersects(props));
        assert!(CollisionMask::ALL.contains(both));
        assert!(!CollisionMask::NONE.intersects(CollisionMask::ALL));
    }

    #[test]
    fn test_ray_query_normalizes_direction() {
        let query: RayQuery<u32> =
            RayQuery::new(Point3::origin(), Vector3::new(0.0, -4.0, 0.0), 2.0).excluding(7);

        assert_eq!(query.direction, Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(query.exclude, Some(7));
        assert_eq!(query.point_at(2.0), Point3::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn test_ray_query_zero_direction() {
        let query: RayQuery<u32> = RayQuery::new(Point3::origin(), Vector3::zeros(), -1.0);
        assert_eq!(query.direction, Vector3::zeros());
        assert_eq!(query.max_distance, 0.0);
    }
}
