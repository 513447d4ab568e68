use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Ties a particle to an animated skin point.
///
/// The particle may wander within `radius` of `skin_point` but never goes
/// more than `backstop` behind the skin surface along `skin_normal`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkinConstraint {
    pub particle: [u32; 1],
    pub skin_point: Vec3,
    pub skin_normal: Vec3,
    pub radius: f32,
    pub backstop: f32,
    pub stiffness: f32,
}

impl SkinConstraint {
    pub fn new(particle: u32, skin_point: Vec3, skin_normal: Vec3, radius: f32, backstop: f32, stiffness: f32) -> Self {
        Self {
            particle: [particle],
            skin_point,
            skin_normal: skin_normal.normalize_or_zero(),
            radius,
            backstop,
            stiffness,
        }
    }
}

impl Constraint for SkinConstraint {
    const TYPE: ConstraintType = ConstraintType::Skin;

    fn particles(&self) -> &[u32] {
        &self.particle
    }

    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let i = self.particle[0];
        if particles.inv_mass[i as usize] <= 0.0 {
            return;
        }
        let p = particles.predicted[i as usize];
        let mut target = p;

        let to_particle = target - self.skin_point;
        let dist = to_particle.length();
        if dist > self.radius && dist > 1e-10 {
            target -= to_particle / dist * (dist - self.radius);
        }

        let height = (target - self.skin_point).dot(self.skin_normal) + self.backstop;
        if height < 0.0 {
            target -= self.skin_normal * height;
        }

        let delta = target - p;
        if delta != Vec3::ZERO {
            out.push((i, delta * iteration_stiffness(self.stiffness, ctx.iterations)));
        }
    }
}
