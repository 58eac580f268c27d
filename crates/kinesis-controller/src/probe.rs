//! Record of the most recent ray probe, for debug drawing.

use kinesis_physics::RayQuery;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// A ray that was cast and how far it got.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeTrace {
    /// Ray origin.
    pub origin: Point3<f32>,
    /// Unit direction.
    pub direction: Vector3<f32>,
    /// Distance to the hit, or the full probe length on a miss.
    pub length: f32,
    /// Whether anything was hit.
    pub hit: bool,
}

impl ProbeTrace {
    pub(crate) fn from_query<B>(query: &RayQuery<B>, hit_distance: Option<f32>) -> Self {
        Self {
            origin: query.origin,
            direction: query.direction,
            length: hit_distance.unwrap_or(query.max_distance),
            hit: hit_distance.is_some(),
        }
    }

    /// Far end of the drawn segment.
    pub fn end(&self) -> Point3<f32> {
        self.origin + self.direction * self.length
    }
}
