//! The simulation engine.
//!
//! A [`Solver`] owns fixed-capacity particle buffers, one constraint group per
//! constraint type, the substep clock and the scratch structures of the
//! pipeline (grid, neighbor lists, contacts). The host writes state through
//! the flat accessors, feeds time with [`Solver::add_simulation_time`] and
//! consumes it one fixed substep at a time with [`Solver::update_solver`].
mod constraints;
mod particles;
mod step;

use std::sync::{Arc, RwLock, RwLockReadGuard};

use glam::Vec3;

use crate::collider_group::ColliderGroup;
use crate::collision::{ColliderBroadPhase, Contact, ParticleContact};
use crate::config::{ConstraintParameters, EvaluationOrder, SolverParameters};
use crate::constraints::{ConstraintOrder, ConstraintType};
use crate::diffuse::DiffuseParticles;
use crate::error::SolverError;
use crate::grid::SpatialHashGrid;
use crate::materials::{CollisionMaterial, FluidMaterial};
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;
use crate::shapes::Aabb;

pub use constraints::ConstraintGroups;

/// Remaining time within this much of a substep still pays for it.
const TIME_EPSILON: f32 = 1e-6;

/// Initial grid cell size, replaced by the interaction radius on each step.
const DEFAULT_CELL_SIZE: f32 = 0.1;

/// A collider group shared between the host and the solver.
pub type SharedColliderGroup = Arc<RwLock<ColliderGroup>>;

pub struct Solver {
    particles: ParticleSet,
    diffuse: DiffuseParticles,
    parameters: SolverParameters,
    groups: ConstraintGroups,
    order: ConstraintOrder,
    /// Iteration count of collider contact resolution.
    collision_parameters: ConstraintParameters,
    /// Fluid density constraint; disabled until the host enables it.
    density_parameters: ConstraintParameters,
    collision_materials: Vec<CollisionMaterial>,
    fluid_materials: Vec<FluidMaterial>,
    colliders: Option<SharedColliderGroup>,
    grid: SpatialHashGrid,
    neighbors: NeighborList,
    broad_phase: ColliderBroadPhase,
    contacts: Vec<Contact>,
    particle_contacts: Vec<ParticleContact>,
    /// Predicted positions of pinned particles before the pin group runs.
    pin_start: Vec<Vec3>,
    /// Active pins per particle, to split the reaction between them.
    pin_counts: Vec<u32>,
    accumulated_time: f32,
}

impl Solver {
    /// Allocate every buffer up front. Nothing is reallocated while stepping.
    pub fn new(max_particles: usize, max_diffuse_particles: usize, max_neighbours: usize) -> Self {
        let table_size = (max_particles + max_diffuse_particles)
            .saturating_mul(2)
            .next_power_of_two()
            .max(1024);
        log::info!(
            "solver created: {} particles, {} diffuse particles, {} neighbours",
            max_particles,
            max_diffuse_particles,
            max_neighbours
        );
        Self {
            particles: ParticleSet::new(max_particles),
            diffuse: DiffuseParticles::new(max_diffuse_particles),
            parameters: SolverParameters::default(),
            groups: ConstraintGroups::new(),
            order: ConstraintOrder::default(),
            collision_parameters: ConstraintParameters::new(true, EvaluationOrder::Sequential, 3),
            density_parameters: ConstraintParameters::new(false, EvaluationOrder::Parallel, 3),
            collision_materials: Vec::new(),
            fluid_materials: Vec::new(),
            colliders: None,
            grid: SpatialHashGrid::new(DEFAULT_CELL_SIZE, table_size, max_particles),
            neighbors: NeighborList::new(max_particles, max_neighbours),
            broad_phase: ColliderBroadPhase::new(),
            contacts: Vec::new(),
            particle_contacts: Vec::new(),
            pin_start: vec![Vec3::ZERO; max_particles],
            pin_counts: vec![0; max_particles],
            accumulated_time: 0.0,
        }
    }

    #[inline]
    pub fn max_particles(&self) -> usize {
        self.particles.capacity()
    }

    #[inline]
    pub fn max_diffuse_particles(&self) -> usize {
        self.diffuse.capacity()
    }

    #[inline]
    pub fn max_neighbours(&self) -> usize {
        self.neighbors.max_neighbours()
    }

    /// Read-only view of the particle buffers.
    #[inline]
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    #[inline]
    pub fn diffuse_particles(&self) -> &DiffuseParticles {
        &self.diffuse
    }

    pub fn set_solver_parameters(&mut self, parameters: SolverParameters) {
        self.parameters = parameters;
    }

    pub fn get_solver_parameters(&self) -> SolverParameters {
        self.parameters
    }

    pub fn set_constraint_group_parameters(&mut self, ty: ConstraintType, parameters: ConstraintParameters) {
        self.groups.batch_mut(ty).set_parameters(parameters);
    }

    pub fn get_constraint_group_parameters(&self, ty: ConstraintType) -> ConstraintParameters {
        self.groups.batch(ty).parameters()
    }

    pub fn set_collision_parameters(&mut self, parameters: ConstraintParameters) {
        self.collision_parameters = parameters;
    }

    pub fn get_collision_parameters(&self) -> ConstraintParameters {
        self.collision_parameters
    }

    pub fn set_density_parameters(&mut self, parameters: ConstraintParameters) {
        self.density_parameters = parameters;
    }

    pub fn get_density_parameters(&self) -> ConstraintParameters {
        self.density_parameters
    }

    /// Set the order in which constraint groups are solved from a permutation
    /// of constraint type ids. An invalid order is rejected and the current
    /// one kept.
    pub fn set_constraints_order(&mut self, ids: &[i32]) -> Result<(), SolverError> {
        match ConstraintOrder::from_ids(ids) {
            Ok(order) => {
                self.order = order;
                Ok(())
            }
            Err(err) => {
                log::warn!("constraint order {:?} rejected: {}", ids, err);
                Err(err)
            }
        }
    }

    pub fn get_constraints_order(&self) -> [i32; ConstraintType::COUNT] {
        self.order.to_ids()
    }

    pub fn constraints_order(&self) -> ConstraintOrder {
        self.order
    }

    /// Attach a collider group, replacing the previous one. `None` detaches.
    pub fn set_collider_group(&mut self, group: Option<SharedColliderGroup>) {
        match &group {
            Some(_) => log::debug!("collider group attached"),
            None => log::debug!("collider group detached"),
        }
        self.colliders = group;
    }

    pub fn collider_group(&self) -> Option<&SharedColliderGroup> {
        self.colliders.as_ref()
    }

    pub fn set_collision_materials(&mut self, materials: &[CollisionMaterial]) {
        self.collision_materials = materials.to_vec();
    }

    pub fn set_fluid_materials(&mut self, materials: &[FluidMaterial]) {
        self.fluid_materials = materials.to_vec();
    }

    /// Time accumulated but not yet consumed by substeps.
    #[inline]
    pub fn accumulated_time(&self) -> f32 {
        self.accumulated_time
    }

    /// Add frame time to the accumulator. Negative and non-finite values are
    /// ignored.
    pub fn add_simulation_time(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated_time += dt;
        }
    }

    /// Run one substep of `substep_dt` if the accumulator covers it.
    /// Returns whether a substep was performed.
    pub fn update_solver(&mut self, substep_dt: f32) -> bool {
        if !substep_dt.is_finite() || substep_dt <= 0.0 || self.accumulated_time + TIME_EPSILON < substep_dt {
            return false;
        }
        self.accumulated_time = (self.accumulated_time - substep_dt).max(0.0);
        self.substep(substep_dt);
        true
    }

    /// Bounds of the active particles, inflated by their radii. Empty when
    /// no particle is active.
    pub fn get_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for &i in self.particles.active() {
            let i = i as usize;
            let r = self.particles.radius[i].max(0.0);
            let p = self.particles.position[i];
            bounds.grow(p - Vec3::splat(r));
            bounds.grow(p + Vec3::splat(r));
        }
        bounds
    }

    /// Read lock on the attached collider group, if any. A poisoned lock is
    /// reported and treated as no group.
    fn read_colliders(shared: Option<&RwLock<ColliderGroup>>) -> Option<RwLockReadGuard<'_, ColliderGroup>> {
        match shared?.read() {
            Ok(guard) => Some(guard),
            Err(_) => {
                log::error!("collider group lock poisoned, colliders ignored");
                None
            }
        }
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        log::info!("solver dropped ({} particles)", self.particles.capacity());
    }
}
