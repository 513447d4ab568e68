use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Attaches a particle to a point fixed in a collider's frame, or to a
/// world-space point when `collider` is negative.
///
/// A linked rigidbody shares the correction by inverse mass. The particle
/// moves by its share here; the solver hands the rest back to the body as an
/// impulse at the pin point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinConstraint {
    pub particle: [u32; 1],
    pub collider: i32,
    /// Pin point in collider local space (world space without a collider).
    pub offset: Vec3,
    pub stiffness: f32,
}

impl PinConstraint {
    pub fn new(particle: u32, collider: i32, offset: Vec3, stiffness: f32) -> Self {
        Self {
            particle: [particle],
            collider,
            offset,
            stiffness,
        }
    }
}

impl Constraint for PinConstraint {
    const TYPE: ConstraintType = ConstraintType::Pin;

    fn particles(&self) -> &[u32] {
        &self.particle
    }

    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let i = self.particle[0];
        let w = particles.inv_mass[i as usize];
        if w <= 0.0 {
            return;
        }

        let (target, w_body) = match usize::try_from(self.collider) {
            Err(_) => (self.offset, 0.0),
            Ok(index) => {
                // A pin to a collider that is not present does nothing.
                let Some(group) = ctx.colliders else { return };
                let Some(collider) = group.colliders().get(index) else {
                    return;
                };
                let w_body = group
                    .rigidbody(collider.rigidbody_index)
                    .map(|b| b.inverse_mass)
                    .unwrap_or(0.0);
                (collider.to_world(self.offset), w_body)
            }
        };

        let delta = target - particles.predicted[i as usize];
        let k = iteration_stiffness(self.stiffness, ctx.iterations);
        out.push((i, delta * (k * w / (w + w_body))));
    }
}
