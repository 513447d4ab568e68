use glam::Vec3;

use crate::fluids::{fluid_material, particle_mass, poly6_kernel, spiky_gradient};
use crate::materials::FluidMaterial;
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;

/// Tensile instability correction coefficient (k in the paper).
const TENSILE_K: f32 = 0.001;

/// Tensile instability correction exponent (n in the paper).
const TENSILE_N: i32 = 4;

/// Fraction of smoothing radius used as the tensile reference distance.
const TENSILE_DQ_FACTOR: f32 = 0.3;

/// SPH density of every active fluid particle, using the poly6 kernel and the
/// particle's own smoothing radius.
pub fn compute_densities(particles: &mut ParticleSet, neighbors: &NeighborList, materials: &[FluidMaterial]) {
    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        if !particles.phase[i].is_fluid() {
            continue;
        }
        let h = fluid_material(materials, particles.fluid_material[i]).smoothing_radius;
        let m_i = particle_mass(particles.inv_mass[i], 1.0);
        let pos_i = particles.predicted[i];

        // Self contribution.
        let mut rho = m_i * poly6_kernel(0.0, h);
        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            let r_len = (pos_i - particles.predicted[j]).length();
            rho += particle_mass(particles.inv_mass[j], m_i) * poly6_kernel(r_len, h);
        }
        particles.density[i] = rho;
    }
}

/// Solve PBF density constraints for fluid particles.
///
/// Reference: "Position Based Fluids", Macklin & Muller, SIGGRAPH 2013
///
/// Three phases:
/// 1. Compute density for each fluid particle using the poly6 kernel.
/// 2. Compute lambda (Lagrange multiplier) with the material's relaxation.
/// 3. Compute position corrections with the tensile instability fix.
///
/// Position corrections are accumulated into `particles.corrections` and
/// `particles.correction_counts` using Jacobi-style updates; the caller
/// zeroes them first and applies the averaged corrections afterwards.
/// Solid neighbors contribute to density but are never moved.
pub fn solve_density_constraints(particles: &mut ParticleSet, neighbors: &NeighborList, materials: &[FluidMaterial]) {
    // ------------------------------------------------------------------
    // Phase 1: Compute density for every fluid particle.
    // ------------------------------------------------------------------
    compute_densities(particles, neighbors, materials);

    // ------------------------------------------------------------------
    // Phase 2: Compute lambda_i for every fluid particle.
    // ------------------------------------------------------------------
    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        if !particles.phase[i].is_fluid() {
            continue;
        }
        let material = fluid_material(materials, particles.fluid_material[i]);
        let h = material.smoothing_radius;
        let inv_rho0 = 1.0 / material.rest_density.max(1e-6);
        let m_i = particle_mass(particles.inv_mass[i], 1.0);
        let pos_i = particles.predicted[i];

        // Constraint value: C_i = rho_i / rho_0 - 1
        let c_i = particles.density[i] * inv_rho0 - 1.0;

        // Accumulate gradient magnitude squared and the self-gradient.
        let mut grad_sum_sq = 0.0_f32;
        let mut grad_self = Vec3::ZERO;
        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            let r = pos_i - particles.predicted[j];
            let m_j = particle_mass(particles.inv_mass[j], m_i);
            let grad_j = spiky_gradient(r, r.length(), h) * (m_j * inv_rho0);
            grad_sum_sq += grad_j.length_squared();
            grad_self += grad_j;
        }
        grad_sum_sq += grad_self.length_squared();

        particles.lambda[i] = -c_i / (grad_sum_sq + material.relaxation_factor);
    }

    // ------------------------------------------------------------------
    // Phase 3: Compute position corrections.
    // ------------------------------------------------------------------
    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        if !particles.phase[i].is_fluid() || particles.inv_mass[i] <= 0.0 {
            continue;
        }
        let material = fluid_material(materials, particles.fluid_material[i]);
        let h = material.smoothing_radius;
        let inv_rho0 = 1.0 / material.rest_density.max(1e-6);
        let m_i = particle_mass(particles.inv_mass[i], 1.0);
        let poly6_dq = poly6_kernel(h * TENSILE_DQ_FACTOR, h);

        let pos_i = particles.predicted[i];
        let lambda_i = particles.lambda[i];
        let mut delta_p = Vec3::ZERO;

        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            let r = pos_i - particles.predicted[j];
            let r_len = r.length();
            if r_len >= h {
                continue;
            }

            // Use neighbor lambda if it is a fluid particle, otherwise 0.
            let lambda_j = if particles.phase[j].is_fluid() {
                particles.lambda[j]
            } else {
                0.0
            };

            // Tensile instability correction (s_corr).
            let ratio = poly6_kernel(r_len, h) / poly6_dq;
            let s_corr = -TENSILE_K * ratio.powi(TENSILE_N);

            let m_j = particle_mass(particles.inv_mass[j], m_i);
            delta_p += (lambda_i + lambda_j + s_corr) * m_j * spiky_gradient(r, r_len, h);
        }

        particles.corrections[i] += delta_p * inv_rho0;
        particles.correction_counts[i] += 1;
    }
}

/// Fluid surface normals from the gradient of the color field,
/// `n_i = h * sum_j m_j / rho_j * grad W(x_i - x_j)`. Interior particles get
/// near-zero normals, surface particles point outward.
pub fn compute_fluid_normals(particles: &mut ParticleSet, neighbors: &NeighborList, materials: &[FluidMaterial]) {
    for k in 0..particles.active().len() {
        let i = particles.active()[k] as usize;
        if !particles.phase[i].is_fluid() {
            particles.normal[i] = Vec3::ZERO;
            continue;
        }
        let h = fluid_material(materials, particles.fluid_material[i]).smoothing_radius;
        let m_i = particle_mass(particles.inv_mass[i], 1.0);
        let pos_i = particles.predicted[i];
        let mut n = Vec3::ZERO;
        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            if !particles.phase[j].is_fluid() {
                continue;
            }
            let r = pos_i - particles.predicted[j];
            let rho_j = particles.density[j].max(1e-6);
            n += spiky_gradient(r, r.length(), h) * (particle_mass(particles.inv_mass[j], m_i) / rho_j);
        }
        // Spiky gradient points inward; flip to face out of the fluid.
        particles.normal[i] = -n * h;
    }
}
