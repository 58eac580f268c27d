#![warn(missing_docs)]

//! Rigid-body physics backend for kinesis character controllers.
//!
//! This crate defines the engine operations the controllers depend on and
//! provides a Rapier3d implementation of them.
//!
//! # Features
//!
//! - [`PhysicsBackend`] trait with weak, liveness-checked body handles
//! - Masked nearest-hit ray queries that report the struck dynamic body
//! - Impulses, one-step continuous forces and collision-aware moves
//! - Gravity/damping snapshots so carried objects can be restored
//!
//! # Example
//!
//! ```ignore
//! use kinesis_physics::{BodyShape, CollisionMask, PhysicsWorld, RayQuery, PhysicsBackend};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut world = PhysicsWorld::new();
//! world.spawn_static(BodyShape::cuboid(20.0, 1.0, 20.0), Point3::new(0.0, -0.5, 0.0), CollisionMask::layer(0))?;
//!
//! let query = RayQuery::new(Point3::new(0.0, 1.0, 0.0), -Vector3::y(), 1.1);
//! assert!(world.cast_ray(&query).is_some());
//!
//! world.step(1.0 / 50.0);
//! ```

mod backend;
mod colliders;
mod error;
mod world;

pub use backend::{BodySettings, CollisionMask, ForceMode, PhysicsBackend, RayHit, RayQuery};
pub use colliders::{shape_to_collider, BodyShape};
pub use error::{PhysicsError, Result};
pub use rapier3d::dynamics::RigidBodyHandle;
pub use world::{PhysicsWorld, DEFAULT_DENSITY};
