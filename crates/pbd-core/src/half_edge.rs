//! Half-edge topology for indexed triangle meshes.
//!
//! [`HalfEdgeMesh::generate`] is the only path that establishes pairing and
//! adjacency; records written through the bulk setters are trusted as-is.
//! Records are `#[repr(C)]` and `Pod`, so a host can copy whole buffers as
//! raw bytes.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Quat, Vec3};

use crate::error::SolverError;
use crate::math::{triangle_area, vec3_records};
use crate::pool::{read_range, write_range};

/// Triangles with less area than this are rejected as degenerate.
const MIN_TRIANGLE_AREA: f32 = 1e-12;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct HalfEdge {
    pub index: i32,
    /// Position of this half-edge within its face (0..3).
    pub index_in_face: i32,
    pub face: i32,
    pub next_half_edge: i32,
    /// Opposite half-edge, or -1 on a border.
    pub pair: i32,
    /// Vertex the half-edge starts at.
    pub origin: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub index: i32,
    /// One half-edge starting at this vertex.
    pub half_edge: i32,
    pub position: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Face {
    pub index: i32,
    pub half_edge: i32,
}

/// Summary of a mesh's geometry and topology.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshInfo {
    pub area: f32,
    /// Enclosed volume; only meaningful when `closed`.
    pub volume: f32,
    pub border_edge_count: usize,
    pub closed: bool,
    /// Some half-edge's pair does not point back to it.
    pub non_manifold: bool,
}

#[derive(Clone, Debug, Default)]
pub struct HalfEdgeMesh {
    vertices: Vec<Vertex>,
    half_edges: Vec<HalfEdge>,
    faces: Vec<Face>,
    /// Input vertex index -> welded vertex index, from the last `generate`.
    vertex_map: Vec<u32>,
}

/// Bit pattern key for exact position welding. `+ 0.0` folds -0.0 into 0.0.
fn weld_key(p: Vec3) -> [u32; 3] {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

impl HalfEdgeMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the topology from `vertex_count` interleaved xyz positions and
    /// `triangle_count` index triples. Positions are multiplied by `scale`
    /// and vertices at identical positions are welded.
    ///
    /// Fails on short buffers, out-of-range indices, degenerate triangles and
    /// non-manifold edges. On failure the mesh is left unchanged.
    pub fn generate(
        &mut self,
        vertices: &[f32],
        triangles: &[i32],
        vertex_count: usize,
        triangle_count: usize,
        scale: Vec3,
    ) -> Result<(), SolverError> {
        let positions = vec3_records(vertices);
        if positions.len() < vertex_count {
            return Err(SolverError::InsufficientData {
                expected: vertex_count * 3,
                actual: vertices.len(),
            });
        }
        if triangles.len() < triangle_count * 3 {
            return Err(SolverError::InsufficientData {
                expected: triangle_count * 3,
                actual: triangles.len(),
            });
        }

        // Weld coincident vertices.
        let mut welded: HashMap<[u32; 3], u32> = HashMap::new();
        let mut new_vertices: Vec<Vertex> = Vec::new();
        let mut vertex_map = Vec::with_capacity(vertex_count);
        for p in &positions[..vertex_count] {
            let p = Vec3::from_array(*p) * scale;
            let id = *welded.entry(weld_key(p)).or_insert_with(|| {
                new_vertices.push(Vertex {
                    index: new_vertices.len() as i32,
                    half_edge: -1,
                    position: p.to_array(),
                });
                (new_vertices.len() - 1) as u32
            });
            vertex_map.push(id);
        }

        let mut new_half_edges: Vec<HalfEdge> = Vec::with_capacity(triangle_count * 3);
        let mut new_faces: Vec<Face> = Vec::with_capacity(triangle_count);
        let mut directed: HashMap<(u32, u32), u32> = HashMap::with_capacity(triangle_count * 3);

        for (f, tri) in triangles[..triangle_count * 3].chunks_exact(3).enumerate() {
            let mut ids = [0u32; 3];
            for (slot, &raw) in ids.iter_mut().zip(tri) {
                let index = usize::try_from(raw)
                    .ok()
                    .filter(|&i| i < vertex_count)
                    .ok_or(SolverError::VertexOutOfRange {
                        index: raw as i64,
                        count: vertex_count,
                    })?;
                *slot = vertex_map[index];
            }
            if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
                return Err(SolverError::DegenerateTriangle { triangle: f });
            }
            let [a, b, c] = ids.map(|v| Vec3::from_array(new_vertices[v as usize].position));
            if triangle_area(a, b, c) < MIN_TRIANGLE_AREA {
                return Err(SolverError::DegenerateTriangle { triangle: f });
            }

            let base = (f * 3) as i32;
            new_faces.push(Face {
                index: f as i32,
                half_edge: base,
            });
            for k in 0..3 {
                let origin = ids[k];
                let dest = ids[(k + 1) % 3];
                let index = base + k as i32;
                // A directed edge may occur once; a repeat means more than two
                // faces share the edge or their windings disagree.
                if directed.insert((origin, dest), index as u32).is_some() {
                    return Err(SolverError::NonManifoldEdge { a: origin, b: dest });
                }
                new_half_edges.push(HalfEdge {
                    index,
                    index_in_face: k as i32,
                    face: f as i32,
                    next_half_edge: base + ((k + 1) % 3) as i32,
                    pair: -1,
                    origin: origin as i32,
                });
                let vertex = &mut new_vertices[origin as usize];
                if vertex.half_edge < 0 {
                    vertex.half_edge = index;
                }
            }
        }

        let origins: Vec<u32> = new_half_edges.iter().map(|h| h.origin as u32).collect();
        for he in new_half_edges.iter_mut() {
            let origin = he.origin as u32;
            let dest = origins[he.next_half_edge as usize];
            if let Some(&opposite) = directed.get(&(dest, origin)) {
                he.pair = opposite as i32;
            }
        }

        self.vertices = new_vertices;
        self.half_edges = new_half_edges;
        self.faces = new_faces;
        self.vertex_map = vertex_map;
        log::debug!(
            "half-edge mesh generated: {} vertices, {} half-edges, {} faces",
            self.vertices.len(),
            self.half_edges.len(),
            self.faces.len()
        );
        Ok(())
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Welded vertex of input vertex `index` from the last `generate`.
    pub fn welded_index(&self, index: usize) -> Option<u32> {
        self.vertex_map.get(index).copied()
    }

    pub fn set_vertices(&mut self, records: &[Vertex], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.vertices, records, num, dest_offset)
    }

    pub fn get_vertices(&self, out: &mut [Vertex], num: usize, source_offset: usize) -> usize {
        read_range(&self.vertices, out, num, source_offset)
    }

    pub fn set_half_edges(&mut self, records: &[HalfEdge], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.half_edges, records, num, dest_offset)
    }

    pub fn get_half_edges(&self, out: &mut [HalfEdge], num: usize, source_offset: usize) -> usize {
        read_range(&self.half_edges, out, num, source_offset)
    }

    pub fn set_faces(&mut self, records: &[Face], num: usize, dest_offset: usize) -> usize {
        write_range(&mut self.faces, records, num, dest_offset)
    }

    pub fn get_faces(&self, out: &mut [Face], num: usize, source_offset: usize) -> usize {
        read_range(&self.faces, out, num, source_offset)
    }

    /// Raw bytes of the half-edge records.
    pub fn half_edge_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.half_edges)
    }

    /// Stored vertex positions.
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| Vec3::from_array(v.position)).collect()
    }

    /// Vertex indices of a face, following its half-edge loop.
    fn face_vertices(&self, face: &Face) -> Option<[usize; 3]> {
        let h0 = self.half_edges.get(usize::try_from(face.half_edge).ok()?)?;
        let h1 = self.half_edges.get(usize::try_from(h0.next_half_edge).ok()?)?;
        let h2 = self.half_edges.get(usize::try_from(h1.next_half_edge).ok()?)?;
        Some([h0.origin, h1.origin, h2.origin].map(|v| v.max(0) as usize))
    }

    fn face_corners<'a>(&'a self, positions: &'a [Vec3]) -> impl Iterator<Item = ([usize; 3], [Vec3; 3])> + 'a {
        self.faces.iter().filter_map(move |f| {
            let ids = self.face_vertices(f)?;
            if ids.iter().any(|&v| v >= positions.len()) {
                return None;
            }
            Some((ids, ids.map(|v| positions[v])))
        })
    }

    /// Per-vertex normals, `normalize(sum of face normal * face area)` over
    /// the incident faces. `positions` are indexed by vertex.
    pub fn area_weighted_normals(&self, positions: &[Vec3]) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len().max(positions.len())];
        for (ids, [a, b, c]) in self.face_corners(positions) {
            // |cross| is twice the area, so the raw cross product is already
            // the area-weighted face normal.
            let n = (b - a).cross(c - a);
            for v in ids {
                normals[v] += n;
            }
        }
        normals.iter_mut().for_each(|n| *n = n.normalize_or_zero());
        normals
    }

    /// Per-vertex rotation taking the local frame (x: tangent, y: normal,
    /// z: bitangent) to world space. The tangent points along the vertex's
    /// own half-edge, projected onto the tangent plane.
    pub fn vertex_orientations(&self, positions: &[Vec3]) -> Vec<Quat> {
        let normals = self.area_weighted_normals(positions);
        self.vertices
            .iter()
            .enumerate()
            .map(|(v, vertex)| {
                let n = normals.get(v).copied().unwrap_or(Vec3::ZERO);
                if n == Vec3::ZERO {
                    return Quat::IDENTITY;
                }
                let edge_dir = usize::try_from(vertex.half_edge)
                    .ok()
                    .and_then(|h| self.half_edges.get(h))
                    .and_then(|h| usize::try_from(h.next_half_edge).ok())
                    .and_then(|next| self.half_edges.get(next))
                    .and_then(|next| positions.get(next.origin.max(0) as usize))
                    .zip(positions.get(v))
                    .map(|(&dest, &origin)| dest - origin)
                    .unwrap_or(Vec3::ZERO);
                let mut t = (edge_dir - n * edge_dir.dot(n)).normalize_or_zero();
                if t == Vec3::ZERO {
                    t = n.any_orthonormal_vector();
                }
                Quat::from_mat3(&Mat3::from_cols(t, n, t.cross(n)))
            })
            .collect()
    }

    pub fn info(&self) -> MeshInfo {
        let positions = self.positions();
        let mut info = MeshInfo::default();
        for (_, [a, b, c]) in self.face_corners(&positions) {
            info.area += triangle_area(a, b, c);
            info.volume += a.dot(b.cross(c)) / 6.0;
        }
        for (i, he) in self.half_edges.iter().enumerate() {
            match usize::try_from(he.pair).ok().and_then(|p| self.half_edges.get(p)) {
                None => info.border_edge_count += 1,
                Some(pair) if pair.pair != i as i32 => info.non_manifold = true,
                Some(_) => {}
            }
        }
        info.closed = info.border_edge_count == 0 && !self.half_edges.is_empty();
        info
    }
}
