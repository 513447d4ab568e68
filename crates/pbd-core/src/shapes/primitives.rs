//! Analytic primitives: sphere, box and capsule.
//!
//! Each query takes a point in collider local space and returns the signed
//! distance to the surface along with the closest surface point and normal.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::closest_point_on_segment;
use crate::shapes::{Aabb, SurfacePoint};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereShape {
    pub center: Vec3,
    pub radius: f32,
}

impl SphereShape {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_center(self.center, Vec3::splat(self.radius))
    }

    pub fn closest_point(&self, p: Vec3) -> SurfacePoint {
        let d = p - self.center;
        let len = d.length();
        // A point at the exact center has no preferred direction; push up.
        let normal = if len > 1e-8 { d / len } else { Vec3::Y };
        SurfacePoint {
            point: self.center + normal * self.radius,
            normal,
            distance: len - self.radius,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    pub center: Vec3,
    /// Full edge lengths.
    pub size: Vec3,
}

impl BoxShape {
    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self { center, size }
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_center(self.center, self.size * 0.5)
    }

    pub fn closest_point(&self, p: Vec3) -> SurfacePoint {
        let half = (self.size * 0.5).abs();
        let local = p - self.center;
        let outside = local.abs().cmpgt(half).any();

        if outside {
            let clamped = local.max(-half).min(half);
            let d = local - clamped;
            let len = d.length();
            return SurfacePoint {
                point: self.center + clamped,
                normal: d / len.max(1e-12),
                distance: len,
            };
        }

        // Inside: leave through the nearest face.
        let depth = half - local.abs();
        let axis = if depth.x <= depth.y && depth.x <= depth.z {
            0
        } else if depth.y <= depth.z {
            1
        } else {
            2
        };
        let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut normal = Vec3::ZERO;
        normal[axis] = sign;
        let mut point = local;
        point[axis] = half[axis] * sign;
        SurfacePoint {
            point: self.center + point,
            normal,
            distance: -depth[axis],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    pub center: Vec3,
    pub radius: f32,
    /// Total height including both caps.
    pub height: f32,
    /// Axis of the capsule: 0 = X, 1 = Y, 2 = Z.
    pub direction: u32,
}

impl CapsuleShape {
    pub fn new(center: Vec3, radius: f32, height: f32, direction: u32) -> Self {
        Self {
            center,
            radius,
            height,
            direction,
        }
    }

    fn axis(&self) -> Vec3 {
        match self.direction {
            0 => Vec3::X,
            2 => Vec3::Z,
            _ => Vec3::Y,
        }
    }

    /// Endpoints of the inner segment.
    pub fn segment(&self) -> (Vec3, Vec3) {
        let half = (self.height * 0.5 - self.radius).max(0.0);
        let axis = self.axis() * half;
        (self.center - axis, self.center + axis)
    }

    pub fn local_aabb(&self) -> Aabb {
        let (a, b) = self.segment();
        Aabb::new(a.min(b), a.max(b)).inflated(self.radius)
    }

    pub fn closest_point(&self, p: Vec3) -> SurfacePoint {
        let (a, b) = self.segment();
        let (on_axis, _) = closest_point_on_segment(p, a, b);
        let d = p - on_axis;
        let len = d.length();
        let normal = if len > 1e-8 {
            d / len
        } else {
            self.axis().any_orthonormal_vector()
        };
        SurfacePoint {
            point: on_axis + normal * self.radius,
            normal,
            distance: len - self.radius,
        }
    }
}
