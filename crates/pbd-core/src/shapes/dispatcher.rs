//! Narrow-phase dispatch over the shape sum type.
//!
//! Every query takes and returns collider local-space values; the collision
//! pipeline does the world/local transforms.

use glam::Vec3;

use crate::shapes::{Aabb, Shape, SurfacePoint};

/// Closest surface point of `shape` to `p`, or `None` when the surface is
/// farther than `max_dist`.
pub fn surface_query(shape: Shape<'_>, p: Vec3, max_dist: f32) -> Option<SurfacePoint> {
    let analytic = |s: SurfacePoint| (s.distance <= max_dist).then_some(s);
    match shape {
        Shape::Sphere(s) => analytic(s.closest_point(p)),
        Shape::Box(b) => analytic(b.closest_point(p)),
        Shape::Capsule(c) => analytic(c.closest_point(p)),
        Shape::Heightmap(h) => h.closest_point(p, max_dist),
        Shape::TriangleMesh(m) => m.closest_point(p, max_dist),
        Shape::EdgeMesh(m) => m.closest_point(p, max_dist),
    }
}

/// Local-space bounds of `shape`.
pub fn local_aabb(shape: Shape<'_>) -> Aabb {
    match shape {
        Shape::Sphere(s) => s.local_aabb(),
        Shape::Box(b) => b.local_aabb(),
        Shape::Capsule(c) => c.local_aabb(),
        Shape::Heightmap(h) => h.local_aabb(),
        Shape::TriangleMesh(m) => m.local_aabb(),
        Shape::EdgeMesh(m) => m.local_aabb(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{BoxShape, CapsuleShape, SphereShape};

    #[test]
    fn test_primitive_distances() {
        let sphere = SphereShape::new(Vec3::ZERO, 1.0);
        let hit = surface_query(Shape::Sphere(&sphere), Vec3::new(0.0, 0.0, 0.5), 0.2).unwrap();
        assert!((hit.distance + 0.5).abs() < 1e-6);
        assert!((hit.normal - Vec3::Z).length() < 1e-6);
        assert!(surface_query(Shape::Sphere(&sphere), Vec3::new(0.0, 3.0, 0.0), 0.2).is_none());

        let cube = BoxShape::new(Vec3::ZERO, Vec3::splat(2.0));
        let inside = surface_query(Shape::Box(&cube), Vec3::new(0.8, 0.1, 0.0), 0.1).unwrap();
        assert!((inside.distance + 0.2).abs() < 1e-6);
        assert_eq!(inside.normal, Vec3::X);
        let outside = surface_query(Shape::Box(&cube), Vec3::new(2.0, 0.0, 0.0), 2.0).unwrap();
        assert!((outside.distance - 1.0).abs() < 1e-6);

        let capsule = CapsuleShape::new(Vec3::ZERO, 0.5, 3.0, 1);
        let side = surface_query(Shape::Capsule(&capsule), Vec3::new(1.0, 0.9, 0.0), 1.0).unwrap();
        assert!((side.distance - 0.5).abs() < 1e-6);
        let cap = surface_query(Shape::Capsule(&capsule), Vec3::new(0.0, 2.5, 0.0), 2.0).unwrap();
        assert!((cap.distance - 1.0).abs() < 1e-6);
        assert!((cap.point - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_capsule_bounds() {
        let capsule = CapsuleShape::new(Vec3::ZERO, 0.5, 3.0, 0);
        let b = local_aabb(Shape::Capsule(&capsule));
        assert!((b.max - Vec3::new(1.5, 0.5, 0.5)).length() < 1e-6);
        assert!((b.min + Vec3::new(1.5, 0.5, 0.5)).length() < 1e-6);
    }
}
