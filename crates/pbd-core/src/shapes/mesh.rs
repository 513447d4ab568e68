//! Triangle and edge mesh colliders.
//!
//! Both carry a uniform cell grid over their primitives so that a query only
//! visits primitives near the query point. The grid must be rebuilt whenever
//! the vertex data changes (`rebuild_grid`, or the collider group's
//! `update_*_mesh_shapes`).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::{closest_point_on_segment, closest_point_on_triangle};
use crate::shapes::{Aabb, SurfacePoint};

/// How the surface of a triangle mesh collider is interpreted.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshColliderType {
    /// Closed surface. Inside is decided by ray parity, so the triangle
    /// winding does not matter.
    Solid = 0,
    /// Open surface that only pushes particles toward its front side.
    ThinOneSided = 1,
    /// Open surface that pushes particles away on either side.
    ThinTwoSided = 2,
}

/// Uniform grid of primitive indices.
///
/// A primitive is listed in every cell its bounding box touches, so a query
/// may report the same primitive more than once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimitiveGrid {
    origin: Vec3,
    cell_size: f32,
    dims: [u32; 3],
    cell_start: Vec<u32>,
    items: Vec<u32>,
}

/// Upper bound on cells per axis.
const MAX_GRID_RESOLUTION: u32 = 64;

/// Parity ray direction, skewed off the axes so it rarely grazes an edge.
const PARITY_RAY: Vec3 = Vec3::new(0.999_999_6, 0.000_731, 0.000_417);

/// Moller-Trumbore test of the ray `origin + t * dir`, `t > 0`, against `abc`.
fn ray_hits_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let e1 = b - a;
    let e2 = c - a;
    let pv = dir.cross(e2);
    let det = e1.dot(pv);
    if det.abs() < 1e-12 {
        return false;
    }
    let inv_det = 1.0 / det;
    let tv = origin - a;
    let u = tv.dot(pv) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let qv = tv.cross(e1);
    let v = dir.dot(qv) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(qv) * inv_det > 0.0
}

impl PrimitiveGrid {
    pub fn build(bounds: Aabb, primitive_bounds: &[Aabb]) -> Self {
        if primitive_bounds.is_empty() || bounds.is_empty() {
            return Self::default();
        }
        let extent = (bounds.max - bounds.min).max(Vec3::splat(1e-4));
        let per_axis = ((primitive_bounds.len() as f32).cbrt() * 2.0).ceil() as u32;
        let resolution = per_axis.clamp(1, MAX_GRID_RESOLUTION);
        let cell_size = extent.max_element() / resolution as f32;
        let dims = [
            ((extent.x / cell_size).ceil() as u32).max(1),
            ((extent.y / cell_size).ceil() as u32).max(1),
            ((extent.z / cell_size).ceil() as u32).max(1),
        ];

        let mut grid = Self {
            origin: bounds.min,
            cell_size,
            dims,
            cell_start: Vec::new(),
            items: Vec::new(),
        };
        let cell_count = (dims[0] * dims[1] * dims[2]) as usize;

        // Counting sort: count, prefix sum, scatter.
        let mut counts = vec![0u32; cell_count];
        for b in primitive_bounds {
            grid.for_each_cell(b, |c| counts[c] += 1);
        }
        let mut start = vec![0u32; cell_count + 1];
        for c in 0..cell_count {
            start[c + 1] = start[c] + counts[c];
        }
        let mut fill = start.clone();
        let mut items = vec![0u32; start[cell_count] as usize];
        for (i, b) in primitive_bounds.iter().enumerate() {
            grid.for_each_cell(b, |c| {
                items[fill[c] as usize] = i as u32;
                fill[c] += 1;
            });
        }
        grid.cell_start = start;
        grid.items = items;
        grid
    }

    fn cell_coord(&self, v: f32, origin: f32, dim: u32) -> u32 {
        (((v - origin) / self.cell_size).floor().max(0.0) as u32).min(dim - 1)
    }

    fn for_each_cell(&self, b: &Aabb, mut f: impl FnMut(usize)) {
        if self.cell_size <= 0.0 {
            return;
        }
        let lo = [
            self.cell_coord(b.min.x, self.origin.x, self.dims[0]),
            self.cell_coord(b.min.y, self.origin.y, self.dims[1]),
            self.cell_coord(b.min.z, self.origin.z, self.dims[2]),
        ];
        let hi = [
            self.cell_coord(b.max.x, self.origin.x, self.dims[0]),
            self.cell_coord(b.max.y, self.origin.y, self.dims[1]),
            self.cell_coord(b.max.z, self.origin.z, self.dims[2]),
        ];
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    f(((z * self.dims[1] + y) * self.dims[0] + x) as usize);
                }
            }
        }
    }

    /// Visit every primitive listed in a cell overlapping `query`.
    pub fn query(&self, query: &Aabb, mut f: impl FnMut(u32)) {
        if self.items.is_empty() {
            return;
        }
        self.for_each_cell(query, |c| {
            let range = self.cell_start[c] as usize..self.cell_start[c + 1] as usize;
            for &item in &self.items[range] {
                f(item);
            }
        });
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TriangleMeshShape {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Extra surface thickness added around every triangle.
    pub thickness: f32,
    pub collider_type: MeshColliderType,
    grid: PrimitiveGrid,
    bounds: Aabb,
}

impl TriangleMeshShape {
    /// Triangles referencing missing vertices are dropped.
    pub fn new(
        vertices: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
        thickness: f32,
        collider_type: MeshColliderType,
    ) -> Self {
        let count = vertices.len() as u32;
        let triangles = triangles
            .into_iter()
            .filter(|t| t.iter().all(|&v| v < count))
            .collect();
        let mut shape = Self {
            vertices,
            triangles,
            thickness,
            collider_type,
            grid: PrimitiveGrid::default(),
            bounds: Aabb::EMPTY,
        };
        shape.rebuild_grid();
        shape
    }

    fn corners(&self, t: [u32; 3]) -> (Vec3, Vec3, Vec3) {
        (
            self.vertices[t[0] as usize],
            self.vertices[t[1] as usize],
            self.vertices[t[2] as usize],
        )
    }

    /// Recompute bounds and the primitive grid from the current vertices.
    pub fn rebuild_grid(&mut self) {
        let count = self.vertices.len() as u32;
        self.triangles.retain(|t| t.iter().all(|&v| v < count));
        let mut bounds = Aabb::EMPTY;
        let tri_bounds: Vec<Aabb> = self
            .triangles
            .iter()
            .map(|&t| {
                let (a, b, c) = self.corners(t);
                let mut tb = Aabb::EMPTY;
                tb.grow(a);
                tb.grow(b);
                tb.grow(c);
                bounds.grow(tb.min);
                bounds.grow(tb.max);
                tb
            })
            .collect();
        self.grid = PrimitiveGrid::build(bounds, &tri_bounds);
        self.bounds = bounds;
    }

    pub fn local_aabb(&self) -> Aabb {
        if self.bounds.is_empty() {
            return Aabb::new(Vec3::ZERO, Vec3::ZERO);
        }
        self.bounds.inflated(self.thickness)
    }

    /// Whether `p` lies inside the closed surface: a ray from `p` crosses it
    /// an odd number of times.
    pub fn contains(&self, p: Vec3) -> bool {
        let bounds = self.bounds;
        if bounds.is_empty() || p.cmplt(bounds.min).any() || p.cmpgt(bounds.max).any() {
            return false;
        }
        let end = p + PARITY_RAY * ((bounds.max - bounds.min).length() + 1e-3);
        let mut hits = Vec::new();
        self.grid.query(&Aabb::new(p.min(end), p.max(end)), |tri| {
            let (a, b, c) = self.corners(self.triangles[tri as usize]);
            if ray_hits_triangle(p, PARITY_RAY, a, b, c) {
                hits.push(tri);
            }
        });
        hits.sort_unstable();
        hits.dedup();
        hits.len() % 2 == 1
    }

    pub fn closest_point(&self, p: Vec3, max_dist: f32) -> Option<SurfacePoint> {
        let reach = max_dist + self.thickness;
        let query = Aabb::from_center(p, Vec3::splat(reach.max(0.0)));
        let mut best: Option<SurfacePoint> = None;
        let inside = self.collider_type == MeshColliderType::Solid && self.contains(p);

        self.grid.query(&query, |tri| {
            let (a, b, c) = self.corners(self.triangles[tri as usize]);
            let face_normal = (b - a).cross(c - a).normalize_or_zero();
            let q = closest_point_on_triangle(p, a, b, c);
            let d = p - q;
            let len = d.length();

            let (normal, signed) = match self.collider_type {
                MeshColliderType::ThinTwoSided => {
                    let n = if len > 1e-6 { d / len } else { face_normal };
                    (n, len)
                }
                MeshColliderType::Solid => {
                    if len <= 1e-6 {
                        (face_normal, 0.0)
                    } else if inside {
                        (-d / len, -len)
                    } else {
                        (d / len, len)
                    }
                }
                MeshColliderType::ThinOneSided => {
                    if d.dot(face_normal) < 0.0 {
                        let n = if len > 1e-6 { -d / len } else { face_normal };
                        (n, -len)
                    } else {
                        let n = if len > 1e-6 { d / len } else { face_normal };
                        (n, len)
                    }
                }
            };
            let candidate = SurfacePoint {
                point: q + normal * self.thickness,
                normal,
                distance: signed - self.thickness,
            };
            let closer = best
                .map(|s| candidate.distance.abs() < s.distance.abs())
                .unwrap_or(true);
            if closer {
                best = Some(candidate);
            }
        });

        best.filter(|s| s.distance <= max_dist)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeMeshShape {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<[u32; 2]>,
    pub thickness: f32,
    grid: PrimitiveGrid,
    bounds: Aabb,
}

impl EdgeMeshShape {
    /// Edges referencing missing vertices are dropped.
    pub fn new(vertices: Vec<Vec3>, edges: Vec<[u32; 2]>, thickness: f32) -> Self {
        let mut shape = Self {
            vertices,
            edges,
            thickness,
            grid: PrimitiveGrid::default(),
            bounds: Aabb::EMPTY,
        };
        shape.rebuild_grid();
        shape
    }

    pub fn rebuild_grid(&mut self) {
        let count = self.vertices.len() as u32;
        self.edges.retain(|e| e[0] < count && e[1] < count);
        let mut bounds = Aabb::EMPTY;
        let edge_bounds: Vec<Aabb> = self
            .edges
            .iter()
            .map(|e| {
                let mut eb = Aabb::EMPTY;
                eb.grow(self.vertices[e[0] as usize]);
                eb.grow(self.vertices[e[1] as usize]);
                bounds.grow(eb.min);
                bounds.grow(eb.max);
                eb
            })
            .collect();
        self.grid = PrimitiveGrid::build(bounds, &edge_bounds);
        self.bounds = bounds;
    }

    pub fn local_aabb(&self) -> Aabb {
        if self.bounds.is_empty() {
            return Aabb::new(Vec3::ZERO, Vec3::ZERO);
        }
        self.bounds.inflated(self.thickness)
    }

    pub fn closest_point(&self, p: Vec3, max_dist: f32) -> Option<SurfacePoint> {
        let reach = max_dist + self.thickness;
        let query = Aabb::from_center(p, Vec3::splat(reach.max(0.0)));
        let mut best: Option<SurfacePoint> = None;

        self.grid.query(&query, |edge| {
            let e = self.edges[edge as usize];
            let a = self.vertices[e[0] as usize];
            let b = self.vertices[e[1] as usize];
            let (q, _) = closest_point_on_segment(p, a, b);
            let d = p - q;
            let len = d.length();
            let normal = if len > 1e-6 {
                d / len
            } else {
                (b - a).any_orthonormal_vector()
            };
            let candidate = SurfacePoint {
                point: q + normal * self.thickness,
                normal,
                distance: len - self.thickness,
            };
            if best.map(|s| candidate.distance < s.distance).unwrap_or(true) {
                best = Some(candidate);
            }
        });

        best.filter(|s| s.distance <= max_dist)
    }
}
