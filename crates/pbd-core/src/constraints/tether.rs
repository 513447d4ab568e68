use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Long-range attachment limiting how far a particle may drift from an
/// anchor particle. Only the particle moves; the anchor is treated as fixed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TetherConstraint {
    /// `[particle, anchor]`.
    pub particles: [u32; 2],
    pub max_length: f32,
    pub scale: f32,
    pub stiffness: f32,
}

impl TetherConstraint {
    pub fn new(particle: u32, anchor: u32, max_length: f32, scale: f32, stiffness: f32) -> Self {
        Self {
            particles: [particle, anchor],
            max_length,
            scale,
            stiffness,
        }
    }
}

impl Constraint for TetherConstraint {
    const TYPE: ConstraintType = ConstraintType::Tether;

    fn particles(&self) -> &[u32] {
        &self.particles
    }

    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let [i, anchor] = self.particles;
        if particles.inv_mass[i as usize] <= 0.0 {
            return;
        }
        let diff = particles.predicted[i as usize] - particles.predicted[anchor as usize];
        let dist = diff.length();
        let limit = self.max_length * self.scale;
        // One-sided: slack tethers do nothing.
        if dist <= limit || dist < 1e-10 {
            return;
        }
        let k = iteration_stiffness(self.stiffness, ctx.iterations);
        out.push((i, -diff / dist * ((dist - limit) * k)));
    }
}
