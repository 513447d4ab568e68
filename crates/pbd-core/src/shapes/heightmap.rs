use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::closest_point_on_triangle;
use crate::shapes::{Aabb, SurfacePoint};

/// Regular height field spanning `[0, size.x] x [0, size.z]` in local space.
///
/// `heights` holds `resolution_u * resolution_v` normalized samples, row by
/// row along v (`heights[v * resolution_u + u]`), scaled by `size.y`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightmapShape {
    pub size: Vec3,
    pub resolution_u: u32,
    pub resolution_v: u32,
    pub heights: Vec<f32>,
}

impl HeightmapShape {
    pub fn new(size: Vec3, resolution_u: u32, resolution_v: u32, heights: Vec<f32>) -> Self {
        Self {
            size,
            resolution_u,
            resolution_v,
            heights,
        }
    }

    fn is_valid(&self) -> bool {
        self.resolution_u >= 2
            && self.resolution_v >= 2
            && self.heights.len() >= (self.resolution_u * self.resolution_v) as usize
    }

    /// Distance between neighbouring samples along u and v.
    fn sample_spacing(&self) -> (f32, f32) {
        (
            self.size.x / (self.resolution_u - 1) as f32,
            self.size.z / (self.resolution_v - 1) as f32,
        )
    }

    fn vertex(&self, u: u32, v: u32) -> Vec3 {
        let (du, dv) = self.sample_spacing();
        let h = self.heights[(v * self.resolution_u + u) as usize];
        Vec3::new(u as f32 * du, h * self.size.y, v as f32 * dv)
    }

    pub fn local_aabb(&self) -> Aabb {
        let (lo, hi) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        if lo > hi {
            return Aabb::new(Vec3::ZERO, Vec3::new(self.size.x, 0.0, self.size.z));
        }
        Aabb::new(
            Vec3::new(0.0, lo * self.size.y, 0.0),
            Vec3::new(self.size.x, hi * self.size.y, self.size.z),
        )
    }

    /// Closest point on the height field surface within `max_dist` of `p`.
    ///
    /// Each cell is split into two triangles. The distance is negative when `p`
    /// lies below the surface. Points outside the horizontal extent never touch.
    pub fn closest_point(&self, p: Vec3, max_dist: f32) -> Option<SurfacePoint> {
        if !self.is_valid() {
            return None;
        }
        if p.x < -max_dist
            || p.z < -max_dist
            || p.x > self.size.x + max_dist
            || p.z > self.size.z + max_dist
        {
            return None;
        }

        let (du, dv) = self.sample_spacing();
        let cells_u = self.resolution_u - 1;
        let cells_v = self.resolution_v - 1;
        let cell_range = |coord: f32, spacing: f32, cells: u32| {
            let lo = ((coord - max_dist) / spacing).floor().max(0.0) as u32;
            let hi = ((coord + max_dist) / spacing).floor().max(0.0) as u32;
            (lo.min(cells - 1), hi.min(cells - 1))
        };
        let (u0, u1) = cell_range(p.x, du, cells_u);
        let (v0, v1) = cell_range(p.z, dv, cells_v);

        let mut best: Option<SurfacePoint> = None;
        for v in v0..=v1 {
            for u in u0..=u1 {
                let a = self.vertex(u, v);
                let b = self.vertex(u + 1, v);
                let c = self.vertex(u, v + 1);
                let d = self.vertex(u + 1, v + 1);
                for (t0, t1, t2) in [(a, c, b), (b, c, d)] {
                    let candidate = surface_point_on_triangle(p, t0, t1, t2);
                    let closer = best
                        .map(|b| candidate.distance.abs() < b.distance.abs())
                        .unwrap_or(true);
                    if closer {
                        best = Some(candidate);
                    }
                }
            }
        }
        best.filter(|s| s.distance <= max_dist)
    }
}

/// Signed closest point on one triangle, sign taken from its winding normal.
fn surface_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> SurfacePoint {
    let face_normal = (b - a).cross(c - a).normalize_or_zero();
    let q = closest_point_on_triangle(p, a, b, c);
    let d = p - q;
    let len = d.length();
    let below = d.dot(face_normal) < 0.0;
    let normal = if len > 1e-6 {
        if below {
            -d / len
        } else {
            d / len
        }
    } else {
        face_normal
    };
    SurfacePoint {
        point: q,
        normal,
        distance: if below { -len } else { len },
    }
}
