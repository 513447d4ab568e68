use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Keeps two particles at a rest length, e.g. cloth edges and rope segments.
///
/// Stretching and compression have separate stiffness so that cloth can
/// resist stretching while still buckling freely.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceConstraint {
    pub particles: [u32; 2],
    /// Rest length (initial distance between the two particles).
    pub rest_length: f32,
    /// Stiffness in `[0, 1]` applied when longer than the rest length.
    pub stretch_stiffness: f32,
    /// Stiffness in `[0, 1]` applied when shorter than the rest length.
    pub compression_stiffness: f32,
}

impl DistanceConstraint {
    pub fn new(i: u32, j: u32, rest_length: f32, stiffness: f32) -> Self {
        Self {
            particles: [i, j],
            rest_length,
            stretch_stiffness: stiffness,
            compression_stiffness: stiffness,
        }
    }

    /// Current length divided by rest length.
    pub fn stretching(&self, particles: &ParticleSet) -> f32 {
        let [i, j] = self.particles;
        let dist = (particles.position[i as usize] - particles.position[j as usize]).length();
        if self.rest_length > 1e-10 {
            dist / self.rest_length
        } else {
            0.0
        }
    }
}

impl Constraint for DistanceConstraint {
    const TYPE: ConstraintType = ConstraintType::Distance;

    fn particles(&self) -> &[u32] {
        &self.particles
    }

    /// 1. Compute constraint value C = |p_i - p_j| - rest_length
    /// 2. Pick stretch or compression stiffness by the sign of C
    /// 3. Split the correction between the particles by inverse mass
    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let [i, j] = self.particles;

        // Inverse mass from particle data (0.0 = static/immovable)
        let w_i = particles.inv_mass[i as usize];
        let w_j = particles.inv_mass[j as usize];
        let w_sum = w_i + w_j;
        if w_sum < 1e-10 {
            return;
        }

        let diff = particles.predicted[i as usize] - particles.predicted[j as usize];
        let dist = diff.length();
        if dist < 1e-10 {
            return;
        }

        // Constraint value: should be zero when at rest length
        let c_val = dist - self.rest_length;
        let k = if c_val > 0.0 {
            self.stretch_stiffness
        } else {
            self.compression_stiffness
        };
        let k = iteration_stiffness(k, ctx.iterations);

        // Gradient direction (unit vector from j to i)
        let correction = diff / dist * (c_val / w_sum * k);
        out.push((i, -correction * w_i));
        out.push((j, correction * w_j));
    }
}
