//! Collision shape generation for scene bodies.

use rapier3d::geometry::{ColliderBuilder, Group, InteractionGroups};
use serde::{Deserialize, Serialize};

use crate::backend::CollisionMask;
use crate::error::{PhysicsError, Result};

/// Primitive collision shapes supported by the scene helpers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyShape {
    /// Box given by its half extents (m).
    Cuboid {
        /// Half extents along x, y, z.
        half_extents: [f32; 3],
    },
    /// Sphere.
    Ball {
        /// Radius (m).
        radius: f32,
    },
    /// Y-aligned capsule, the usual character shape.
    Capsule {
        /// Half height of the cylindrical section (m).
        half_height: f32,
        /// Radius of the caps (m).
        radius: f32,
    },
}

impl BodyShape {
    /// Axis-aligned box with the given full size.
    pub fn cuboid(x: f32, y: f32, z: f32) -> Self {
        Self::Cuboid {
            half_extents: [x * 0.5, y * 0.5, z * 0.5],
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Cuboid { .. } => "cuboid",
            Self::Ball { .. } => "ball",
            Self::Capsule { .. } => "capsule",
        }
    }

    fn validate(&self) -> Result<()> {
        let dims: &[f32] = match self {
            Self::Cuboid { half_extents } => half_extents,
            Self::Ball { radius } => std::slice::from_ref(radius),
            Self::Capsule {
                half_height,
                radius,
            } => {
                if !half_height.is_finite() || *half_height < 0.0 {
                    return Err(PhysicsError::InvalidShape {
                        name: self.name(),
                        reason: format!("half_height must be >= 0, got {half_height}"),
                    });
                }
                std::slice::from_ref(radius)
            }
        };

        match dims.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            Some(bad) => Err(PhysicsError::InvalidShape {
                name: self.name(),
                reason: format!("dimensions must be positive, got {bad}"),
            }),
            None => Ok(()),
        }
    }
}

/// Build a collider for `shape` that belongs to the `layers` collision groups.
pub fn shape_to_collider(shape: &BodyShape, layers: CollisionMask) -> Result<ColliderBuilder> {
    shape.validate()?;

    let builder = match *shape {
        BodyShape::Cuboid { half_extents: [x, y, z] } => ColliderBuilder::cuboid(x, y, z),
        BodyShape::Ball { radius } => ColliderBuilder::ball(radius),
        BodyShape::Capsule {
            half_height,
            radius,
        } => ColliderBuilder::capsule_y(half_height, radius),
    };

    Ok(builder
        .collision_groups(InteractionGroups::new(
            Group::from_bits_truncate(layers.0),
            Group::ALL,
        ))
        .friction(0.5)
        .restitution(0.1))
}
