//! Storage for colliders, their shapes and optional rigidbodies.
//!
//! The group holds no physics logic. Every pool is dense: removal moves tail
//! entries into the freed slots, so offsets held by the caller are invalid
//! after a `remove_*` call and counts must be re-queried.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::pool::{read_range, swap_remove_range, write_range};
use crate::shapes::{
    dispatcher, Aabb, BoxShape, CapsuleShape, EdgeMeshShape, HeightmapShape, Shape, ShapeType,
    SphereShape, SurfacePoint, TriangleMeshShape,
};

/// A posed reference to one shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
    /// Extra margin around the shape within which contacts are generated.
    pub contact_offset: f32,
    /// Particles whose phase group equals this value ignore the collider.
    /// Negative values collide with everything.
    pub collision_group: i32,
    pub shape_type: ShapeType,
    pub shape_index: u32,
    /// Linked rigidbody, or -1 for a static collider.
    pub rigidbody_index: i32,
    /// Index into the solver's collision materials, or -1 for the default.
    pub material_index: i32,
}

impl Collider {
    pub fn new(shape_type: ShapeType, shape_index: u32) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            contact_offset: 0.0,
            collision_group: -1,
            shape_type,
            shape_index,
            rigidbody_index: -1,
            material_index: -1,
        }
    }

    pub fn with_pose(mut self, translation: Vec3, rotation: Quat) -> Self {
        self.translation = translation;
        self.rotation = rotation;
        self
    }

    fn safe_scale(&self) -> Vec3 {
        self.scale.abs().max(Vec3::splat(1e-6))
    }

    pub fn to_local(&self, p: Vec3) -> Vec3 {
        (self.rotation.inverse() * (p - self.translation)) / self.safe_scale()
    }

    pub fn to_world(&self, p: Vec3) -> Vec3 {
        self.rotation * (p * self.safe_scale()) + self.translation
    }

    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (self.rotation * (n / self.safe_scale())).normalize_or_zero()
    }

    /// World bounds of a local-space box, inflated by the contact offset.
    pub fn world_aabb(&self, local: Aabb) -> Aabb {
        let mut out = Aabb::EMPTY;
        for corner in local.corners() {
            out.grow(self.to_world(corner));
        }
        out.inflated(self.contact_offset)
    }

    /// Closest world-space surface point of `shape` within `max_dist` of `p`.
    ///
    /// The query runs in local space. The returned distance is measured in
    /// world space along the world normal.
    pub fn surface_query(&self, shape: Shape<'_>, p: Vec3, max_dist: f32) -> Option<SurfacePoint> {
        let local_max = max_dist / self.safe_scale().min_element();
        let local = dispatcher::surface_query(shape, self.to_local(p), local_max)?;
        let point = self.to_world(local.point);
        let normal = self.normal_to_world(local.normal);
        let distance = (p - point).dot(normal);
        (distance <= max_dist).then_some(SurfacePoint {
            point,
            normal,
            distance,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rigidbody {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// World-space center of mass.
    pub center_of_mass: Vec3,
    /// Diagonal of the world-space inverse inertia tensor.
    pub inverse_inertia: Vec3,
    pub inverse_mass: f32,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
            inverse_inertia: Vec3::ZERO,
            inverse_mass: 0.0,
        }
    }
}

impl Rigidbody {
    /// Velocity of the body at world point `p`.
    pub fn velocity_at(&self, p: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(p - self.center_of_mass)
    }

    /// Inverse mass the body presents to an impulse along `normal` at `p`.
    pub fn effective_inverse_mass(&self, p: Vec3, normal: Vec3) -> f32 {
        let r = p - self.center_of_mass;
        let rn = r.cross(normal);
        self.inverse_mass + (self.inverse_inertia * rn).dot(rn)
    }

    /// Velocity change caused by `impulse` applied at world point `p`.
    pub fn impulse_response(&self, impulse: Vec3, p: Vec3) -> (Vec3, Vec3) {
        let r = p - self.center_of_mass;
        (
            impulse * self.inverse_mass,
            self.inverse_inertia * r.cross(impulse),
        )
    }
}

#[derive(Default)]
pub struct ColliderGroup {
    colliders: Vec<Collider>,
    rigidbodies: Vec<Rigidbody>,
    spheres: Vec<SphereShape>,
    boxes: Vec<BoxShape>,
    capsules: Vec<CapsuleShape>,
    heightmaps: Vec<HeightmapShape>,
    triangle_meshes: Vec<TriangleMeshShape>,
    edge_meshes: Vec<EdgeMeshShape>,
}

impl ColliderGroup {
    pub fn new() -> Self {
        log::debug!("collider group created");
        Self::default()
    }

    pub fn set_colliders(&mut self, colliders: &[Collider], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.colliders, colliders, num, dest_offset)
    }

    pub fn get_colliders(&self, out: &mut [Collider], num: usize, source_offset: usize) -> usize {
        read_range(&self.colliders, out, num, source_offset)
    }

    /// Returns the new collider count.
    pub fn remove_colliders(&mut self, num: usize, source_offset: usize) -> usize {
        swap_remove_range(&mut self.colliders, num, source_offset)
    }

    #[inline]
    pub fn get_collider_count(&self) -> usize {
        self.colliders.len()
    }

    #[inline]
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn set_rigidbodies(&mut self, bodies: &[Rigidbody], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.rigidbodies, bodies, num, dest_offset)
    }

    pub fn get_rigidbodies(&self, out: &mut [Rigidbody], num: usize, source_offset: usize) -> usize {
        read_range(&self.rigidbodies, out, num, source_offset)
    }

    pub fn remove_rigidbodies(&mut self, num: usize, source_offset: usize) -> usize {
        swap_remove_range(&mut self.rigidbodies, num, source_offset)
    }

    #[inline]
    pub fn get_rigidbody_count(&self) -> usize {
        self.rigidbodies.len()
    }

    pub fn rigidbody(&self, index: i32) -> Option<&Rigidbody> {
        usize::try_from(index).ok().and_then(|i| self.rigidbodies.get(i))
    }

    /// Add accumulated velocity changes, one `(linear, angular)` pair per
    /// rigidbody slot.
    pub fn apply_rigidbody_velocity_deltas(&mut self, deltas: &[(Vec3, Vec3)]) {
        for (body, &(dv, dw)) in self.rigidbodies.iter_mut().zip(deltas) {
            body.linear_velocity += dv;
            body.angular_velocity += dw;
        }
    }

    pub fn set_sphere_shapes(&mut self, shapes: &[SphereShape], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.spheres, shapes, num, dest_offset)
    }

    pub fn set_box_shapes(&mut self, shapes: &[BoxShape], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.boxes, shapes, num, dest_offset)
    }

    pub fn set_capsule_shapes(&mut self, shapes: &[CapsuleShape], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.capsules, shapes, num, dest_offset)
    }

    pub fn set_heightmap_shapes(
        &mut self,
        shapes: &[HeightmapShape],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        write_range(&mut self.heightmaps, shapes, num, dest_offset)
    }

    pub fn set_triangle_mesh_shapes(
        &mut self,
        shapes: &[TriangleMeshShape],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        write_range(&mut self.triangle_meshes, shapes, num, dest_offset)
    }

    pub fn set_edge_mesh_shapes(
        &mut self,
        shapes: &[EdgeMeshShape],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        write_range(&mut self.edge_meshes, shapes, num, dest_offset)
    }

    /// Remove shapes of one type. Returns the new count of that type.
    pub fn remove_shapes(&mut self, shape_type: ShapeType, num: usize, source_offset: usize) -> usize {
        match shape_type {
            ShapeType::Sphere => swap_remove_range(&mut self.spheres, num, source_offset),
            ShapeType::Box => swap_remove_range(&mut self.boxes, num, source_offset),
            ShapeType::Capsule => swap_remove_range(&mut self.capsules, num, source_offset),
            ShapeType::Heightmap => swap_remove_range(&mut self.heightmaps, num, source_offset),
            ShapeType::TriangleMesh => swap_remove_range(&mut self.triangle_meshes, num, source_offset),
            ShapeType::EdgeMesh => swap_remove_range(&mut self.edge_meshes, num, source_offset),
        }
    }

    pub fn get_shape_count(&self, shape_type: ShapeType) -> usize {
        match shape_type {
            ShapeType::Sphere => self.spheres.len(),
            ShapeType::Box => self.boxes.len(),
            ShapeType::Capsule => self.capsules.len(),
            ShapeType::Heightmap => self.heightmaps.len(),
            ShapeType::TriangleMesh => self.triangle_meshes.len(),
            ShapeType::EdgeMesh => self.edge_meshes.len(),
        }
    }

    /// Mutable access for in-place vertex edits; follow with
    /// [`ColliderGroup::update_triangle_mesh_shapes`].
    pub fn triangle_mesh_mut(&mut self, index: usize) -> Option<&mut TriangleMeshShape> {
        self.triangle_meshes.get_mut(index)
    }

    pub fn edge_mesh_mut(&mut self, index: usize) -> Option<&mut EdgeMeshShape> {
        self.edge_meshes.get_mut(index)
    }

    /// Rebuild the acceleration grids of a run of triangle meshes.
    /// Returns how many were refreshed.
    pub fn update_triangle_mesh_shapes(&mut self, num: usize, source_offset: usize) -> usize {
        let start = source_offset.min(self.triangle_meshes.len());
        let end = (start + num).min(self.triangle_meshes.len());
        for mesh in &mut self.triangle_meshes[start..end] {
            mesh.rebuild_grid();
        }
        end - start
    }

    pub fn update_edge_mesh_shapes(&mut self, num: usize, source_offset: usize) -> usize {
        let start = source_offset.min(self.edge_meshes.len());
        let end = (start + num).min(self.edge_meshes.len());
        for mesh in &mut self.edge_meshes[start..end] {
            mesh.rebuild_grid();
        }
        end - start
    }

    /// Shape referenced by `collider`, or `None` if its index is stale.
    pub fn shape(&self, collider: &Collider) -> Option<Shape<'_>> {
        let i = collider.shape_index as usize;
        match collider.shape_type {
            ShapeType::Sphere => self.spheres.get(i).map(Shape::Sphere),
            ShapeType::Box => self.boxes.get(i).map(Shape::Box),
            ShapeType::Capsule => self.capsules.get(i).map(Shape::Capsule),
            ShapeType::Heightmap => self.heightmaps.get(i).map(Shape::Heightmap),
            ShapeType::TriangleMesh => self.triangle_meshes.get(i).map(Shape::TriangleMesh),
            ShapeType::EdgeMesh => self.edge_meshes.get(i).map(Shape::EdgeMesh),
        }
    }

    /// World bounds of collider `index`, or `None` if its shape is missing.
    pub fn collider_aabb(&self, index: usize) -> Option<Aabb> {
        let collider = self.colliders.get(index)?;
        let shape = self.shape(collider)?;
        Some(collider.world_aabb(dispatcher::local_aabb(shape)))
    }
}

impl Drop for ColliderGroup {
    fn drop(&mut self) {
        log::debug!("collider group dropped ({} colliders)", self.colliders.len());
    }
}
