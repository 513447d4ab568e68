use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Three-particle bending constraint.
///
/// Keeps the middle vertex `v` at a rest distance from the centroid of the
/// triangle `(a, b, v)`:
///
/// ```text
///       v
///      / \
///     a   b
/// ```
///
/// A straight configuration has `v` on the segment `ab`. Deviations within
/// `max_bending` of the rest value are left alone, so a nonzero slack lets
/// cloth and ropes fold a little for free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BendingConstraint {
    /// `[a, b, v]`, with `v` the middle vertex.
    pub particles: [u32; 3],
    pub rest_bend: f32,
    pub max_bending: f32,
    pub stiffness: f32,
}

impl BendingConstraint {
    pub fn new(a: u32, b: u32, v: u32, rest_bend: f32, max_bending: f32, stiffness: f32) -> Self {
        Self {
            particles: [a, b, v],
            rest_bend,
            max_bending,
            stiffness,
        }
    }
}

/// Rest value of a bending constraint for the given `[a, b, v]` positions:
/// the distance from `v` to the triangle centroid.
pub fn bending_constraint_rest(coords: [Vec3; 3]) -> f32 {
    let [a, b, v] = coords;
    let centroid = (a + b + v) / 3.0;
    (v - centroid).length()
}

impl Constraint for BendingConstraint {
    const TYPE: ConstraintType = ConstraintType::Bending;

    fn particles(&self) -> &[u32] {
        &self.particles
    }

    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let [a, b, v] = self.particles;
        let (a, b, v) = (a as usize, b as usize, v as usize);
        let w_a = particles.inv_mass[a];
        let w_b = particles.inv_mass[b];
        let w_v = particles.inv_mass[v];
        let w = w_a + w_b + 2.0 * w_v;
        if w < 1e-10 {
            return;
        }

        let (p_a, p_b, p_v) = (particles.predicted[a], particles.predicted[b], particles.predicted[v]);
        let centroid = (p_a + p_b + p_v) / 3.0;
        let dir = p_v - centroid;
        let dist = dir.length();
        if dist < 1e-10 {
            return;
        }

        let excess = dist - self.rest_bend;
        if excess.abs() <= self.max_bending {
            return;
        }
        let c_val = excess - self.max_bending.copysign(excess);

        let k = iteration_stiffness(self.stiffness, ctx.iterations);
        // With equal masses this removes C exactly: the centroid moves by a
        // third of the total, v by the remainder.
        let correction = dir / dist * (c_val * k);
        out.push((a as u32, correction * (2.0 * w_a / w)));
        out.push((b as u32, correction * (2.0 * w_b / w)));
        out.push((v as u32, -correction * (4.0 * w_v / w)));
    }
}
