//! Collider shape library.
//!
//! Shape payloads are plain data expressed in collider local space. The
//! collider group stores one pool per shape type; [`Shape`] is the borrowed sum
//! type the narrow phase matches on.
pub mod dispatcher;
pub mod heightmap;
pub mod mesh;
pub mod primitives;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

pub use heightmap::HeightmapShape;
pub use mesh::{EdgeMeshShape, MeshColliderType, TriangleMeshShape};
pub use primitives::{BoxShape, CapsuleShape, SphereShape};

/// Shape type tag, also used as the integer id at the boundary.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    Heightmap = 3,
    TriangleMesh = 4,
    EdgeMesh = 5,
}

impl ShapeType {
    pub const ALL: [ShapeType; 6] = [
        ShapeType::Sphere,
        ShapeType::Box,
        ShapeType::Capsule,
        ShapeType::Heightmap,
        ShapeType::TriangleMesh,
        ShapeType::EdgeMesh,
    ];
}

impl TryFrom<i32> for ShapeType {
    type Error = SolverError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        usize::try_from(id)
            .ok()
            .and_then(|i| ShapeType::ALL.get(i).copied())
            .ok_or(SolverError::UnknownShapeType(id))
    }
}

/// A borrowed shape payload of exactly one type.
#[derive(Clone, Copy, Debug)]
pub enum Shape<'a> {
    Sphere(&'a SphereShape),
    Box(&'a BoxShape),
    Capsule(&'a CapsuleShape),
    Heightmap(&'a HeightmapShape),
    TriangleMesh(&'a TriangleMeshShape),
    EdgeMesh(&'a EdgeMeshShape),
}

impl Shape<'_> {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Sphere(_) => ShapeType::Sphere,
            Shape::Box(_) => ShapeType::Box,
            Shape::Capsule(_) => ShapeType::Capsule,
            Shape::Heightmap(_) => ShapeType::Heightmap,
            Shape::TriangleMesh(_) => ShapeType::TriangleMesh,
            Shape::EdgeMesh(_) => ShapeType::EdgeMesh,
        }
    }
}

/// Closest surface feature to a query point.
///
/// `distance` is signed: negative when the query point is inside the shape.
/// `normal` points from the surface toward the outside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn inflated(&self, amount: f32) -> Aabb {
        Aabb::new(self.min - Vec3::splat(amount), self.max + Vec3::splat(amount))
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}
