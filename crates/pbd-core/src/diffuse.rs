//! Secondary particles (foam, spray, bubbles) carried along by a fluid.
//!
//! Diffuse particles never feed back into the main solve. Each substep they
//! sample the velocity of nearby fluid particles through the solver's own
//! spatial grid; with no fluid around they follow a ballistic path.

use glam::Vec3;

use crate::fluids::poly6_kernel;
use crate::grid::SpatialHashGrid;
use crate::particle::{ActiveSet, ParticleSet};

pub struct DiffuseParticles {
    capacity: usize,
    pub position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Fluid particles found within the advection radius in the last advection.
    neighbour_count: Vec<u32>,
    active: ActiveSet,
}

impl DiffuseParticles {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            position: vec![Vec3::ZERO; capacity],
            velocity: vec![Vec3::ZERO; capacity],
            neighbour_count: vec![0; capacity],
            active: ActiveSet::new(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn active(&self) -> &[u32] {
        self.active.indices()
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(index)
    }

    pub fn set_active(&mut self, indices: &[i32]) -> usize {
        self.active.set(indices)
    }

    pub fn activate(&mut self, indices: &[i32]) -> usize {
        self.active.insert(indices)
    }

    pub fn deactivate(&mut self, indices: &[i32]) -> usize {
        self.active.remove(indices)
    }

    #[inline]
    pub fn neighbour_count(&self, index: usize) -> u32 {
        self.neighbour_count.get(index).copied().unwrap_or(0)
    }

    /// Move every active diffuse particle by one substep.
    ///
    /// `grid` must have been built on the current positions of `fluid`'s
    /// active particles with a cell size of at least `radius`. Only
    /// fluid-phase particles contribute to the sampled velocity.
    pub fn advect(&mut self, fluid: &ParticleSet, grid: &SpatialHashGrid, radius: f32, gravity: Vec3, dt: f32) {
        let radius_sq = radius * radius;
        for &i in self.active.indices() {
            let i = i as usize;
            let pos = self.position[i];
            let mut weight = 0.0_f32;
            let mut velocity = Vec3::ZERO;
            let mut count = 0u32;

            grid.query_neighbors(pos, |j| {
                let j = j as usize;
                if !fluid.phase[j].is_fluid() {
                    return;
                }
                let d2 = (fluid.position[j] - pos).length_squared();
                if d2 > radius_sq {
                    return;
                }
                let w = poly6_kernel(d2.sqrt(), radius);
                weight += w;
                velocity += fluid.velocity[j] * w;
                count += 1;
            });

            self.neighbour_count[i] = count;
            if weight > 1e-12 {
                self.velocity[i] = velocity / weight;
            } else {
                self.velocity[i] += gravity * dt;
            }
            self.position[i] += self.velocity[i] * dt;
        }
    }
}
