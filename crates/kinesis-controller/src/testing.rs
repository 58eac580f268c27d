//! Deterministic in-memory backend for controller tests.
//!
//! Bodies do not integrate or collide; every write is recorded so tests can
//! assert exactly what a controller asked the engine to do.

use kinesis_physics::{CollisionMask, ForceMode, PhysicsBackend, RayHit, RayQuery};
use nalgebra::{Point3, Vector3};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct BodyKey;
}

#[derive(Debug, Clone)]
pub struct MockBody {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub gravity: bool,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub impulses: Vec<Vector3<f32>>,
    pub forces: Vec<(Vector3<f32>, ForceMode)>,
    pub moves: Vec<Point3<f32>>,
}

impl MockBody {
    fn at(position: Point3<f32>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            gravity: true,
            linear_damping: 0.0,
            angular_damping: 0.05,
            impulses: Vec::new(),
            forces: Vec::new(),
            moves: Vec::new(),
        }
    }
}

/// Sphere collider; follows its body when it has one.
#[derive(Debug, Clone, Copy)]
struct Sphere {
    center: Point3<f32>,
    radius: f32,
    layers: CollisionMask,
    body: Option<BodyKey>,
}

#[derive(Default)]
pub struct MockWorld {
    pub bodies: SlotMap<BodyKey, MockBody>,
    ground: Option<(f32, CollisionMask)>,
    spheres: Vec<Sphere>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Infinite horizontal plane at `height`.
    pub fn with_ground(mut self, height: f32, layers: CollisionMask) -> Self {
        self.ground = Some((height, layers));
        self
    }

    pub fn spawn(&mut self, position: Point3<f32>) -> BodyKey {
        self.bodies.insert(MockBody::at(position))
    }

    /// Dynamic sphere prop.
    pub fn spawn_prop(&mut self, center: Point3<f32>, radius: f32, layers: CollisionMask) -> BodyKey {
        let key = self.spawn(center);
        self.spheres.push(Sphere {
            center,
            radius,
            layers,
            body: Some(key),
        });
        key
    }

    /// Sphere with no rigid body behind it.
    pub fn add_static_sphere(&mut self, center: Point3<f32>, radius: f32, layers: CollisionMask) {
        self.spheres.push(Sphere {
            center,
            radius,
            layers,
            body: None,
        });
    }

    pub fn despawn(&mut self, key: BodyKey) {
        self.bodies.remove(key);
        self.spheres.retain(|s| s.body != Some(key));
    }

    pub fn body(&self, key: BodyKey) -> &MockBody {
        &self.bodies[key]
    }

    pub fn body_mut(&mut self, key: BodyKey) -> &mut MockBody {
        &mut self.bodies[key]
    }

    fn sphere_center(&self, sphere: &Sphere) -> Point3<f32> {
        sphere
            .body
            .and_then(|b| self.bodies.get(b))
            .map_or(sphere.center, |b| b.position)
    }
}

fn ray_sphere(origin: Point3<f32>, dir: Vector3<f32>, center: Point3<f32>, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(&dir);
    let c = oc.norm_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    [-b - root, -b + root].into_iter().find(|t| *t >= 0.0)
}

impl PhysicsBackend for MockWorld {
    type Body = BodyKey;

    fn is_alive(&self, body: BodyKey) -> bool {
        self.bodies.contains_key(body)
    }

    fn position(&self, body: BodyKey) -> Option<Point3<f32>> {
        self.bodies.get(body).map(|b| b.position)
    }

    fn linear_velocity(&self, body: BodyKey) -> Option<Vector3<f32>> {
        self.bodies.get(body).map(|b| b.velocity)
    }

    fn set_linear_velocity(&mut self, body: BodyKey, velocity: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.velocity = velocity;
        }
    }

    fn apply_impulse(&mut self, body: BodyKey, impulse: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            // Unit mass.
            b.velocity += impulse;
            b.impulses.push(impulse);
        }
    }

    fn add_force(&mut self, body: BodyKey, force: Vector3<f32>, mode: ForceMode) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.forces.push((force, mode));
        }
    }

    fn move_to(&mut self, body: BodyKey, target: Point3<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.position = target;
            b.moves.push(target);
        }
    }

    fn cast_ray(&self, query: &RayQuery<BodyKey>) -> Option<RayHit<BodyKey>> {
        let mut best: Option<(f32, Option<BodyKey>)> = None;
        let mut consider = |distance: f32, body: Option<BodyKey>| {
            if distance <= query.max_distance && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, body));
            }
        };

        if let Some((height, layers)) = self.ground {
            if layers.intersects(query.mask) && query.direction.y < 0.0 {
                let distance = (query.origin.y - height) / -query.direction.y;
                if distance >= 0.0 {
                    consider(distance, None);
                }
            }
        }

        for sphere in &self.spheres {
            if !sphere.layers.intersects(query.mask) {
                continue;
            }
            if sphere.body.is_some() && sphere.body == query.exclude {
                continue;
            }
            let center = self.sphere_center(sphere);
            if let Some(t) = ray_sphere(query.origin, query.direction, center, sphere.radius) {
                consider(t, sphere.body);
            }
        }

        best.map(|(distance, body)| RayHit {
            distance,
            point: query.point_at(distance),
            body,
        })
    }

    fn gravity_enabled(&self, body: BodyKey) -> Option<bool> {
        self.bodies.get(body).map(|b| b.gravity)
    }

    fn set_gravity_enabled(&mut self, body: BodyKey, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.gravity = enabled;
        }
    }

    fn damping(&self, body: BodyKey) -> Option<(f32, f32)> {
        self.bodies
            .get(body)
            .map(|b| (b.linear_damping, b.angular_damping))
    }

    fn set_damping(&mut self, body: BodyKey, linear: f32, angular: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.linear_damping = linear;
            b.angular_damping = angular;
        }
    }
}
