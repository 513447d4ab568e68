use glam::Vec3;

use crate::constraints::{
    AerodynamicConstraint, BendingConstraint, ChainConstraint, ConstraintBatch, ConstraintGroup, ConstraintType,
    DistanceConstraint, PinConstraint, SkinConstraint, TetherConstraint, VolumeConstraint,
};
use crate::half_edge::HalfEdgeMesh;
use crate::math::{vec4_records, xyz};
use crate::pool::removal_range;
use crate::solver::Solver;

/// One pool per constraint type.
pub struct ConstraintGroups {
    pub tether: ConstraintGroup<TetherConstraint>,
    pub pin: ConstraintGroup<PinConstraint>,
    pub volume: ConstraintGroup<VolumeConstraint>,
    pub bending: ConstraintGroup<BendingConstraint>,
    pub distance: ConstraintGroup<DistanceConstraint>,
    pub chain: ConstraintGroup<ChainConstraint>,
    pub skin: ConstraintGroup<SkinConstraint>,
    pub aerodynamics: ConstraintGroup<AerodynamicConstraint>,
}

impl ConstraintGroups {
    pub(super) fn new() -> Self {
        Self {
            tether: ConstraintGroup::new(ConstraintType::Tether.default_parameters()),
            pin: ConstraintGroup::new(ConstraintType::Pin.default_parameters()),
            volume: ConstraintGroup::new(ConstraintType::Volume.default_parameters()),
            bending: ConstraintGroup::new(ConstraintType::Bending.default_parameters()),
            distance: ConstraintGroup::new(ConstraintType::Distance.default_parameters()),
            chain: ConstraintGroup::new(ConstraintType::Chain.default_parameters()),
            skin: ConstraintGroup::new(ConstraintType::Skin.default_parameters()),
            aerodynamics: ConstraintGroup::new(ConstraintType::Aerodynamics.default_parameters()),
        }
    }

    pub fn batch(&self, ty: ConstraintType) -> &dyn ConstraintBatch {
        match ty {
            ConstraintType::Tether => &self.tether,
            ConstraintType::Pin => &self.pin,
            ConstraintType::Volume => &self.volume,
            ConstraintType::Bending => &self.bending,
            ConstraintType::Distance => &self.distance,
            ConstraintType::Chain => &self.chain,
            ConstraintType::Skin => &self.skin,
            ConstraintType::Aerodynamics => &self.aerodynamics,
        }
    }

    pub fn batch_mut(&mut self, ty: ConstraintType) -> &mut dyn ConstraintBatch {
        match ty {
            ConstraintType::Tether => &mut self.tether,
            ConstraintType::Pin => &mut self.pin,
            ConstraintType::Volume => &mut self.volume,
            ConstraintType::Bending => &mut self.bending,
            ConstraintType::Distance => &mut self.distance,
            ConstraintType::Chain => &mut self.chain,
            ConstraintType::Skin => &mut self.skin,
            ConstraintType::Aerodynamics => &mut self.aerodynamics,
        }
    }
}

/// The `k`-th group of `N` floats.
fn floats<const N: usize>(data: &[f32], k: usize) -> Option<[f32; N]> {
    data.get(k * N..(k + 1) * N)?.try_into().ok()
}

/// The `k`-th homogeneous 4-float record as a vector.
fn vector(data: &[f32], k: usize) -> Option<Vec3> {
    vec4_records(data).get(k).map(|&r| xyz(r))
}

/// The `first`/`count` run of a shared index pool.
fn run(pool: &[i32], first: i32, count: i32) -> Option<&[i32]> {
    let first = usize::try_from(first).ok()?;
    let count = usize::try_from(count).ok()?;
    pool.get(first..first.checked_add(count)?)
}

// Flat constraint setters.
//
// Each takes parallel arrays with one entry (or a fixed number of entries)
// per constraint, `num` constraints, and the pool offset to write at. A
// record with a particle index outside the solver's capacity, or with
// missing data, ends the write there. The number of constraints written is
// returned.
impl Solver {
    fn particle_index(&self, raw: i32) -> Option<u32> {
        usize::try_from(raw)
            .ok()
            .filter(|&i| i < self.particles.capacity())
            .map(|i| i as u32)
    }

    /// The `k`-th group of `N` particle indices.
    fn particle_tuple<const N: usize>(&self, data: &[i32], k: usize) -> Option<[u32; N]> {
        let raw = data.get(k * N..(k + 1) * N)?;
        let mut out = [0u32; N];
        for (slot, &r) in out.iter_mut().zip(raw) {
            *slot = self.particle_index(r)?;
        }
        Some(out)
    }

    fn particle_list(&self, raw: &[i32]) -> Option<Vec<u32>> {
        raw.iter().map(|&r| self.particle_index(r)).collect()
    }

    fn build_records<C>(&self, ty: ConstraintType, num: usize, mut make: impl FnMut(usize) -> Option<C>) -> Vec<C> {
        let mut records = Vec::with_capacity(num);
        for k in 0..num {
            match make(k) {
                Some(c) => records.push(c),
                None => {
                    log::warn!("{:?} constraint write stopped at record {} of {}", ty, k, num);
                    break;
                }
            }
        }
        records
    }

    /// `indices`: 2 per constraint. `stiffnesses`: (stretch, compression).
    pub fn set_distance_constraints(
        &mut self,
        indices: &[i32],
        rest_lengths: &[f32],
        stiffnesses: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Distance, num, |k| {
            let [stretch, compression] = floats::<2>(stiffnesses, k)?;
            Some(DistanceConstraint {
                particles: self.particle_tuple::<2>(indices, k)?,
                rest_length: *rest_lengths.get(k)?,
                stretch_stiffness: stretch,
                compression_stiffness: compression,
            })
        });
        self.groups.distance.set(&records, records.len(), dest_offset)
    }

    /// `indices`: (a, b, v) with `v` the middle particle.
    /// `bending_stiffnesses`: (max bending, stiffness).
    pub fn set_bending_constraints(
        &mut self,
        indices: &[i32],
        rest_bends: &[f32],
        bending_stiffnesses: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Bending, num, |k| {
            let [a, b, v] = self.particle_tuple::<3>(indices, k)?;
            let [max_bending, stiffness] = floats::<2>(bending_stiffnesses, k)?;
            Some(BendingConstraint::new(a, b, v, *rest_bends.get(k)?, max_bending, stiffness))
        });
        self.groups.bending.set(&records, records.len(), dest_offset)
    }

    /// `points`, `normals`: 4 floats per constraint.
    /// `radii_backstop`: (radius, backstop distance).
    #[allow(clippy::too_many_arguments)]
    pub fn set_skin_constraints(
        &mut self,
        indices: &[i32],
        points: &[f32],
        normals: &[f32],
        radii_backstop: &[f32],
        stiffnesses: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Skin, num, |k| {
            let [i] = self.particle_tuple::<1>(indices, k)?;
            let [radius, backstop] = floats::<2>(radii_backstop, k)?;
            Some(SkinConstraint::new(
                i,
                vector(points, k)?,
                vector(normals, k)?,
                radius,
                backstop,
                *stiffnesses.get(k)?,
            ))
        });
        self.groups.skin.set(&records, records.len(), dest_offset)
    }

    /// `normals`, `wind`: 4 floats per constraint.
    /// `coefficients`: (area, drag, lift).
    pub fn set_aerodynamic_constraints(
        &mut self,
        indices: &[i32],
        normals: &[f32],
        wind: &[f32],
        coefficients: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Aerodynamics, num, |k| {
            let [i] = self.particle_tuple::<1>(indices, k)?;
            let [area, drag, lift] = floats::<3>(coefficients, k)?;
            Some(AerodynamicConstraint::new(i, vector(normals, k)?, vector(wind, k)?, area, drag, lift))
        });
        self.groups.aerodynamics.set(&records, records.len(), dest_offset)
    }

    /// `triangles` is a shared pool of index triples; constraint `k` uses
    /// `num_triangles[k]` triangles starting at triangle `first_triangle[k]`.
    /// `pressure_stiffness`: (pressure, stiffness).
    #[allow(clippy::too_many_arguments)]
    pub fn set_volume_constraints(
        &mut self,
        triangles: &[i32],
        first_triangle: &[i32],
        num_triangles: &[i32],
        rest_volumes: &[f32],
        pressure_stiffness: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Volume, num, |k| {
            let first = first_triangle.get(k)?.checked_mul(3)?;
            let count = num_triangles.get(k)?.checked_mul(3)?;
            let ids = self.particle_list(run(triangles, first, count)?)?;
            let tris = ids.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
            let [pressure, stiffness] = floats::<2>(pressure_stiffness, k)?;
            Some(VolumeConstraint::new(tris, *rest_volumes.get(k)?, pressure, stiffness))
        });
        self.groups.volume.set(&records, records.len(), dest_offset)
    }

    /// `indices` is a shared pool; constraint `k` is the chain of
    /// `num_indices[k]` particles starting at `first_index[k]`.
    /// `lengths`: (min, max) segment length.
    pub fn set_chain_constraints(
        &mut self,
        indices: &[i32],
        lengths: &[f32],
        first_index: &[i32],
        num_indices: &[i32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Chain, num, |k| {
            let chain = self.particle_list(run(indices, *first_index.get(k)?, *num_indices.get(k)?)?)?;
            let [min_length, max_length] = floats::<2>(lengths, k)?;
            Some(ChainConstraint::new(chain, min_length, max_length))
        });
        self.groups.chain.set(&records, records.len(), dest_offset)
    }

    /// `indices`: (particle, anchor). `max_length_scale`: (max length, scale).
    pub fn set_tether_constraints(
        &mut self,
        indices: &[i32],
        max_length_scale: &[f32],
        stiffnesses: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Tether, num, |k| {
            let [particle, anchor] = self.particle_tuple::<2>(indices, k)?;
            let [max_length, scale] = floats::<2>(max_length_scale, k)?;
            Some(TetherConstraint::new(particle, anchor, max_length, scale, *stiffnesses.get(k)?))
        });
        self.groups.tether.set(&records, records.len(), dest_offset)
    }

    /// `colliders`: collider index per constraint, negative for world space.
    /// `offsets`: 4 floats per constraint.
    pub fn set_pin_constraints(
        &mut self,
        indices: &[i32],
        colliders: &[i32],
        offsets: &[f32],
        stiffnesses: &[f32],
        num: usize,
        dest_offset: usize,
    ) -> usize {
        let records = self.build_records(ConstraintType::Pin, num, |k| {
            let [i] = self.particle_tuple::<1>(indices, k)?;
            Some(PinConstraint::new(i, *colliders.get(k)?, vector(offsets, k)?, *stiffnesses.get(k)?))
        });
        self.groups.pin.set(&records, records.len(), dest_offset)
    }
}

impl Solver {
    pub fn constraint_groups(&self) -> &ConstraintGroups {
        &self.groups
    }

    pub fn constraint_groups_mut(&mut self) -> &mut ConstraintGroups {
        &mut self.groups
    }

    /// Swap-compacting removal. Returns the new constraint count.
    pub fn remove_constraints(&mut self, ty: ConstraintType, num: usize, source_offset: usize) -> usize {
        self.groups.batch_mut(ty).remove(num, source_offset)
    }

    /// Returns how many constraints became active.
    pub fn activate_constraints(&mut self, ty: ConstraintType, indices: &[i32]) -> usize {
        self.groups.batch_mut(ty).activate(indices)
    }

    /// Returns how many constraints became inactive.
    pub fn deactivate_constraints(&mut self, ty: ConstraintType, indices: &[i32]) -> usize {
        self.groups.batch_mut(ty).deactivate(indices)
    }

    pub fn get_constraint_count(&self, ty: ConstraintType) -> usize {
        self.groups.batch(ty).count()
    }

    /// Write the indices of the active constraints of `ty` into `out`.
    /// Returns the number written.
    pub fn get_active_constraint_indices(&self, ty: ConstraintType, out: &mut [i32]) -> usize {
        let active = self.groups.batch(ty).active_indices();
        let n = active.len().min(out.len());
        for (slot, &i) in out.iter_mut().zip(&active[..n]) {
            *slot = i as i32;
        }
        n
    }

    /// Current length over rest length of `num` distance constraints starting
    /// at `source_offset`. Returns the number written.
    pub fn get_distance_constraints_stretching(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let constraints = self.groups.distance.constraints();
        let range = removal_range(constraints.len(), num.min(out.len()), source_offset);
        let n = range.len();
        for (slot, c) in out.iter_mut().zip(&constraints[range]) {
            *slot = c.stretching(&self.particles);
        }
        n
    }

    /// Triangle count of volume constraint `index`, 0 if there is none.
    pub fn get_volume_triangle_count(&self, index: usize) -> usize {
        self.groups
            .volume
            .constraints()
            .get(index)
            .map(|c| c.triangles.len())
            .unwrap_or(0)
    }

    /// Particle count of chain constraint `index`, 0 if there is none.
    pub fn get_chain_particle_count(&self, index: usize) -> usize {
        self.groups
            .chain
            .constraints()
            .get(index)
            .map(|c| c.particles.len())
            .unwrap_or(0)
    }

    /// Refresh aerodynamic normals from a mesh whose welded vertex `v` is
    /// simulated by particle `particle_offset + v`. Normals are area weighted
    /// over the current particle positions. Returns how many constraints
    /// were updated.
    pub fn update_aerodynamic_normals(&mut self, mesh: &HalfEdgeMesh, particle_offset: usize) -> usize {
        let capacity = self.particles.capacity();
        if particle_offset >= capacity {
            return 0;
        }
        let end = (particle_offset + mesh.vertices().len()).min(capacity);
        let normals = mesh.area_weighted_normals(&self.particles.position[particle_offset..end]);
        let vertex_count = end - particle_offset;

        let mut updated = 0;
        for c in self.groups.aerodynamics.constraints_mut() {
            let Some(v) = (c.particle[0] as usize).checked_sub(particle_offset) else {
                continue;
            };
            if v < vertex_count {
                c.normal = normals[v];
                updated += 1;
            }
        }
        updated
    }
}
