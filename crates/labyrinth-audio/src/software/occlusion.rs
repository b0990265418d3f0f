//! Line-of-sight occlusion through registered polygons.

use glam::Vec3;

const EPSILON: f32 = 1e-6;

/// A polygon in geometry-local space.
#[derive(Debug, Clone)]
pub(crate) struct Polygon {
    pub(crate) direct: f32,
    pub(crate) reverb: f32,
    pub(crate) double_sided: bool,
    pub(crate) vertices: Vec<Vec3>,
}

/// Placement of a geometry object in the world.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub(crate) position: Vec3,
    pub(crate) forward: Vec3,
    pub(crate) up: Vec3,
    pub(crate) scale: Vec3,
}

impl Placement {
    /// Map a local vertex into world space (scale, then rotate, then translate).
    pub(crate) fn to_world(&self, local: Vec3) -> Vec3 {
        let right = self.up.cross(self.forward);
        let scaled = local * self.scale;
        self.position + right * scaled.x + self.up * scaled.y + self.forward * scaled.z
    }
}

/// Whether the segment `from -> to` crosses the triangle strictly between its ends.
fn segment_hits_triangle(from: Vec3, to: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> bool {
    let dir = to - from;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return false;
    }
    let inv = 1.0 / det;
    let s = from - v0;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    let t = e2.dot(q) * inv;
    t > EPSILON && t < 1.0 - EPSILON
}

/// Whether the segment passes through the polygon from a side it blocks.
///
/// Single-sided polygons only block a path that enters against their
/// winding normal.
pub(crate) fn blocks(polygon: &Polygon, placement: &Placement, from: Vec3, to: Vec3) -> bool {
    let world: Vec<Vec3> = polygon
        .vertices
        .iter()
        .map(|v| placement.to_world(*v))
        .collect();
    if world.len() < 3 {
        return false;
    }

    if !polygon.double_sided {
        let normal = (world[1] - world[0]).cross(world[2] - world[0]);
        if (to - from).dot(normal) >= 0.0 {
            return false;
        }
    }

    (1..world.len() - 1).any(|i| segment_hits_triangle(from, to, world[0], world[i], world[i + 1]))
}

/// Combine independent attenuation factors: `1 - Π(1 - o)`.
pub(crate) fn combine(factors: impl Iterator<Item = f32>) -> f32 {
    1.0 - factors.fold(1.0, |open, o| open * (1.0 - o.clamp(0.0, 1.0)))
}
