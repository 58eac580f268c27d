//! Physics world management using Rapier3d.

use nalgebra::{Point3, Vector3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{
    BroadPhaseMultiSap, ColliderSet, Group, InteractionGroups, NarrowPhase, Ray,
};
use rapier3d::pipeline::{PhysicsPipeline, QueryFilter, QueryPipeline};

use crate::backend::{CollisionMask, ForceMode, PhysicsBackend, RayHit, RayQuery};
use crate::colliders::{shape_to_collider, BodyShape};
use crate::error::{PhysicsError, Result};

/// Density used for dynamic props when none is given (kg/m³).
pub const DEFAULT_DENSITY: f32 = 1000.0;

/// Physics simulation world.
pub struct PhysicsWorld {
    // Rapier components
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create an empty physics world with earth gravity along -Y.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::new(0.0, -9.81, 0.0),
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Replace the gravity vector.
    pub fn with_gravity(mut self, gravity: Vector3<f32>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Current gravity vector.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Timestep used by the most recent [`PhysicsWorld::step`].
    pub fn last_dt(&self) -> f32 {
        self.integration_params.dt
    }

    /// Number of live rigid bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Insert immovable level geometry.
    pub fn spawn_static(
        &mut self,
        shape: BodyShape,
        position: Point3<f32>,
        layers: CollisionMask,
    ) -> Result<RigidBodyHandle> {
        let body = RigidBodyBuilder::fixed().translation(position.coords).build();
        self.insert(body, shape, layers, DEFAULT_DENSITY)
    }

    /// Insert a free dynamic prop, e.g. something the player can pick up.
    pub fn spawn_dynamic(
        &mut self,
        shape: BodyShape,
        position: Point3<f32>,
        density: f32,
        layers: CollisionMask,
    ) -> Result<RigidBodyHandle> {
        let body = RigidBodyBuilder::dynamic()
            .translation(position.coords)
            .build();
        self.insert(body, shape, layers, density)
    }

    /// Insert a dynamic body with locked rotations, suited to a player capsule.
    ///
    /// The body mass is `mass` (kg) regardless of the shape volume.
    pub fn spawn_character(
        &mut self,
        shape: BodyShape,
        position: Point3<f32>,
        mass: f32,
        layers: CollisionMask,
    ) -> Result<RigidBodyHandle> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidShape {
                name: "character",
                reason: format!("mass must be positive, got {mass}"),
            });
        }
        let body = RigidBodyBuilder::dynamic()
            .translation(position.coords)
            .additional_mass(mass)
            .lock_rotations()
            .can_sleep(false)
            .build();
        self.insert(body, shape, layers, 0.0)
    }

    /// Remove a body and its colliders. Outstanding handles become dead.
    pub fn despawn(&mut self, handle: RigidBodyHandle) -> Result<()> {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .ok_or(PhysicsError::UnknownBody)?;
        self.query_pipeline.update(&self.colliders);
        tracing::debug!(?handle, "despawned body");
        Ok(())
    }

    /// Teleport a body, bypassing collision. Intended for scene setup.
    pub fn set_position(&mut self, handle: RigidBodyHandle, position: Point3<f32>) -> Result<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody)?;
        body.set_translation(position.coords, true);
        Ok(())
    }

    /// Step the physics simulation by dt seconds.
    ///
    /// Forces added since the previous step act for this step only.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    fn insert(
        &mut self,
        body: rapier3d::dynamics::RigidBody,
        shape: BodyShape,
        layers: CollisionMask,
        density: f32,
    ) -> Result<RigidBodyHandle> {
        let collider = shape_to_collider(&shape, layers)?.density(density).build();
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        Ok(handle)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for PhysicsWorld {
    type Body = RigidBodyHandle;

    fn is_alive(&self, body: RigidBodyHandle) -> bool {
        self.bodies.contains(body)
    }

    fn position(&self, body: RigidBodyHandle) -> Option<Point3<f32>> {
        self.bodies.get(body).map(|b| Point3::from(*b.translation()))
    }

    fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.bodies.get(body).map(|b| *b.linvel())
    }

    fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_linvel(velocity, true);
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.apply_impulse(impulse, true);
        }
    }

    fn add_force(&mut self, body: RigidBodyHandle, force: Vector3<f32>, mode: ForceMode) {
        if let Some(b) = self.bodies.get_mut(body) {
            let force = match mode {
                ForceMode::Force => force,
                ForceMode::Acceleration => force * b.mass(),
            };
            b.add_force(force, true);
        }
    }

    fn move_to(&mut self, body: RigidBodyHandle, target: Point3<f32>) {
        let dt = self.integration_params.dt.max(f32::EPSILON);
        if let Some(b) = self.bodies.get_mut(body) {
            if b.is_kinematic() {
                b.set_next_kinematic_translation(target.coords);
            } else if b.is_dynamic() {
                // Reach the target in one step and let the solver resolve contacts.
                let delta = target.coords - b.translation();
                b.set_linvel(delta / dt, true);
            }
        }
    }

    fn cast_ray(&self, query: &RayQuery<RigidBodyHandle>) -> Option<RayHit<RigidBodyHandle>> {
        if query.direction.norm_squared() == 0.0 {
            return None;
        }

        let ray = Ray::new(query.origin, query.direction);
        let mut filter = QueryFilter::default().groups(InteractionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(query.mask.0),
        ));
        if let Some(exclude) = query.exclude {
            filter = filter.exclude_rigid_body(exclude);
        }

        let (collider, distance) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            query.max_distance,
            true,
            filter,
        )?;

        let body = self
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .filter(|h| self.bodies.get(*h).is_some_and(|b| b.is_dynamic()));

        Some(RayHit {
            distance,
            point: query.point_at(distance),
            body,
        })
    }

    fn gravity_enabled(&self, body: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(body).map(|b| b.gravity_scale() != 0.0)
    }

    fn set_gravity_enabled(&mut self, body: RigidBodyHandle, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_gravity_scale(if enabled { 1.0 } else { 0.0 }, true);
        }
    }

    fn damping(&self, body: RigidBodyHandle) -> Option<(f32, f32)> {
        self.bodies
            .get(body)
            .map(|b| (b.linear_damping(), b.angular_damping()))
    }

    fn set_damping(&mut self, body: RigidBodyHandle, linear: f32, angular: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_linear_damping(linear);
            b.set_angular_damping(angular);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;
    const GROUND: CollisionMask = CollisionMask::layer(0);
    const PROPS: CollisionMask = CollisionMask::layer(1);

    fn create_test_world() -> (PhysicsWorld, RigidBodyHandle, RigidBodyHandle) {
        let mut world = PhysicsWorld::new();

        let ground = world
            .spawn_static(
                BodyShape::cuboid(20.0, 1.0, 20.0),
                Point3::new(0.0, -0.5, 0.0),
                GROUND,
            )
            .unwrap();
        let prop = world
            .spawn_dynamic(
                BodyShape::cuboid(0.5, 0.5, 0.5),
                Point3::new(0.0, 0.25, -3.0),
                DEFAULT_DENSITY,
                PROPS,
            )
            .unwrap();

        (world, ground, prop)
    }

    #[test]
    fn test_create_world() {
        let (world, ground, prop) = create_test_world();

        assert_eq!(world.body_count(), 2);
        assert!(world.is_alive(ground));
        assert!(world.is_alive(prop));
        assert_eq!(world.gravity_enabled(prop), Some(true));
    }

    #[test]
    fn test_ray_hits_static_ground_without_body() {
        let (world, _, _) = create_test_world();

        let query = RayQuery::new(Point3::new(0.0, 1.0, 0.0), -Vector3::y(), 2.0);
        let hit = world.cast_ray(&query).unwrap();

        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-4);
        assert!(hit.body.is_none());
    }

    #[test]
    fn test_ray_reports_dynamic_body() {
        let (world, _, prop) = create_test_world();

        let query = RayQuery::new(Point3::new(0.0, 0.25, 0.0), -Vector3::z(), 4.0).with_mask(PROPS);
        let hit = world.cast_ray(&query).unwrap();

        assert_eq!(hit.body, Some(prop));
        assert_relative_eq!(hit.distance, 2.75, epsilon = 1e-4);
    }

    #[test]
    fn test_ray_respects_mask_and_range() {
        let (world, _, prop) = create_test_world();
        let origin = Point3::new(0.0, 0.25, 0.0);

        let masked = RayQuery::new(origin, -Vector3::z(), 4.0).with_mask(GROUND);
        assert!(world.cast_ray(&masked).is_none());

        let short = RayQuery::new(origin, -Vector3::z(), 2.0).with_mask(PROPS);
        assert!(world.cast_ray(&short).is_none());

        let excluded = RayQuery::new(origin, -Vector3::z(), 4.0)
            .with_mask(PROPS)
            .excluding(prop);
        assert!(world.cast_ray(&excluded).is_none());
    }

    #[test]
    fn test_despawn_invalidates_handle() {
        let (mut world, _, prop) = create_test_world();

        world.despawn(prop).unwrap();

        assert!(!world.is_alive(prop));
        assert!(world.position(prop).is_none());
        assert!(world.body_settings(prop).is_none());
        // Writes to a dead handle are ignored.
        world.set_linear_velocity(prop, Vector3::x());
        assert!(matches!(world.despawn(prop), Err(PhysicsError::UnknownBody)));
    }

    #[test]
    fn test_body_settings_round_trip() {
        let (mut world, _, prop) = create_test_world();
        let original = world.body_settings(prop).unwrap();

        world.set_gravity_enabled(prop, false);
        world.set_damping(prop, 10.0, 2.0);
        assert_eq!(world.gravity_enabled(prop), Some(false));
        assert_eq!(world.damping(prop), Some((10.0, 2.0)));

        world.apply_body_settings(prop, original);
        assert_eq!(world.body_settings(prop), Some(original));
    }

    #[test]
    fn test_acceleration_force_lasts_one_step() {
        let mut world = PhysicsWorld::new().with_gravity(Vector3::zeros());
        let body = world
            .spawn_dynamic(
                BodyShape::Ball { radius: 0.5 },
                Point3::new(0.0, 10.0, 0.0),
                250.0,
                PROPS,
            )
            .unwrap();

        world.step(DT);
        world.add_force(body, Vector3::new(0.0, 6.0, 0.0), ForceMode::Acceleration);
        world.step(DT);
        let after_force = world.linear_velocity(body).unwrap().y;
        assert_relative_eq!(after_force, 6.0 * DT, epsilon = 1e-3);

        world.step(DT);
        let coasting = world.linear_velocity(body).unwrap().y;
        assert_relative_eq!(coasting, after_force, epsilon = 1e-5);
    }

    #[test]
    fn test_move_to_approaches_target() {
        let mut world = PhysicsWorld::new().with_gravity(Vector3::zeros());
        let body = world
            .spawn_dynamic(
                BodyShape::Ball { radius: 0.25 },
                Point3::origin(),
                DEFAULT_DENSITY,
                PROPS,
            )
            .unwrap();
        world.step(DT);

        let target = Point3::new(0.5, 0.0, 0.0);
        world.move_to(body, target);
        world.step(DT);

        let pos = world.position(body).unwrap();
        assert_relative_eq!(pos.x, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_character_mass_is_independent_of_shape() {
        let mut world = PhysicsWorld::new().with_gravity(Vector3::zeros());
        let shape = BodyShape::Capsule {
            half_height: 0.5,
            radius: 0.5,
        };
        let player = world
            .spawn_character(shape, Point3::new(0.0, 1.0, 0.0), 1.0, GROUND)
            .unwrap();
        world.step(DT);

        world.apply_impulse(player, Vector3::new(0.0, 5.0, 0.0));
        world.step(DT);
        assert_relative_eq!(world.linear_velocity(player).unwrap().y, 5.0, epsilon = 1e-3);

        assert!(world
            .spawn_character(shape, Point3::origin(), 0.0, GROUND)
            .is_err());
    }

    #[test]
    fn test_falling_body_lands() {
        let (mut world, _, prop) = create_test_world();
        world.set_position(prop, Point3::new(0.0, 3.0, -3.0)).unwrap();

        for _ in 0..180 {
            world.step(DT);
        }

        let pos = world.position(prop).unwrap();
        assert!(pos.y > 0.1 && pos.y < 0.4, "prop should rest on the ground, y = {}", pos.y);
    }
}
