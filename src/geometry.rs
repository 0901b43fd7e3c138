//! Pure geometry helpers for measurement rendering.
//!
//! Points are `Vec3` in the tracking session's world frame (meters).

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

/// Default marker sphere radius (5 mm).
pub const DEFAULT_MARKER_RADIUS: f32 = 0.005;

/// Euclidean distance between two world-space points.
pub fn distance(p0: Vec3, p1: Vec3) -> f32 {
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    let dz = p1.z - p0.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Build a two-vertex, one-edge line primitive from `p0` to `p1`.
///
/// Vertex order is preserved: index 0 is `p0`, index 1 is `p1`.
pub fn line_segment(p0: Vec3, p1: Vec3) -> Mesh {
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, vec![p0.to_array(), p1.to_array()])
        .with_inserted_indices(Indices::U32(vec![0, 1]))
}

/// Sphere mesh used for point markers.
pub fn marker_mesh(radius: f32) -> Mesh {
    Sphere::new(radius).mesh().build()
}
