use glam::Vec3;

use crate::fluids::{fluid_material, particle_mass, poly6_kernel};
use crate::materials::FluidMaterial;
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;

/// Apply XSPH viscosity to fluid particle velocities.
///
/// XSPH smooths velocities by blending each particle's velocity toward
/// the weighted average of its neighbors' velocities. This produces
/// more coherent fluid motion.
///
/// Formula: v_i += c * sum_j { (v_j - v_i) * m_j * poly6(|x_i - x_j|, h) / rho_j }
/// where c = viscosity of the particle's fluid material
///
/// This is a POST-velocity-update step (applied after positions are finalized
/// and velocities are computed from position change).
pub fn apply_xsph_viscosity(particles: &mut ParticleSet, neighbors: &NeighborList, materials: &[FluidMaterial]) {
    // Corrections go through the Jacobi accumulators so every particle reads
    // the velocities from before the pass.
    particles.reset_corrections();
    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        if !particles.phase[i].is_fluid() {
            continue;
        }
        let material = fluid_material(materials, particles.fluid_material[i]);
        if material.viscosity <= 0.0 {
            continue;
        }
        let h = material.smoothing_radius;
        let m_i = particle_mass(particles.inv_mass[i], 1.0);
        let pos_i = particles.position[i];
        let vel_i = particles.velocity[i];
        let mut correction = Vec3::ZERO;

        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            if !particles.phase[j].is_fluid() {
                continue;
            }
            let r_len = (pos_i - particles.position[j]).length();
            let w = poly6_kernel(r_len, h) * particle_mass(particles.inv_mass[j], m_i);
            let rho_j = particles.density[j].max(1e-6);
            correction += (particles.velocity[j] - vel_i) * w / rho_j;
        }

        particles.corrections[i] = correction * material.viscosity;
    }

    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        particles.velocity[i] += particles.corrections[i];
        particles.corrections[i] = Vec3::ZERO;
    }
}
