use glam::Vec3;

use crate::constraints::{iteration_stiffness, Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Keeps the volume enclosed by a closed triangle surface at
/// `pressure * rest_volume`, e.g. balloons and soft bodies.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeConstraint {
    pub triangles: Vec<[u32; 3]>,
    /// Unique particles of `triangles`, sorted.
    particles: Vec<u32>,
    pub rest_volume: f32,
    pub pressure: f32,
    pub stiffness: f32,
}

impl VolumeConstraint {
    pub fn new(triangles: Vec<[u32; 3]>, rest_volume: f32, pressure: f32, stiffness: f32) -> Self {
        let mut particles: Vec<u32> = triangles.iter().flatten().copied().collect();
        particles.sort_unstable();
        particles.dedup();
        Self {
            triangles,
            particles,
            rest_volume,
            pressure,
            stiffness,
        }
    }

    /// Signed volume of the surface over the given positions.
    pub fn volume(&self, positions: &[Vec3]) -> f32 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| positions[i as usize]);
                a.dot(b.cross(c))
            })
            .sum::<f32>()
            / 6.0
    }
}

impl Constraint for VolumeConstraint {
    const TYPE: ConstraintType = ConstraintType::Volume;

    fn particles(&self) -> &[u32] {
        &self.particles
    }

    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let positions = &particles.predicted;
        let c_val = self.volume(positions) - self.pressure * self.rest_volume;

        // dV/dp for each unique particle.
        let mut gradients = vec![Vec3::ZERO; self.particles.len()];
        let slot = |p: u32| self.particles.binary_search(&p).ok();
        for t in &self.triangles {
            let [a, b, c] = t.map(|i| positions[i as usize]);
            for (p, g) in [(t[0], b.cross(c)), (t[1], c.cross(a)), (t[2], a.cross(b))] {
                if let Some(s) = slot(p) {
                    gradients[s] += g / 6.0;
                }
            }
        }

        let denom: f32 = self
            .particles
            .iter()
            .zip(&gradients)
            .map(|(&p, g)| particles.inv_mass[p as usize] * g.length_squared())
            .sum();
        if denom < 1e-10 {
            return;
        }

        let s = c_val / denom * iteration_stiffness(self.stiffness, ctx.iterations);
        for (&p, g) in self.particles.iter().zip(&gradients) {
            let w = particles.inv_mass[p as usize];
            if w > 0.0 {
                out.push((p, -*g * (s * w)));
            }
        }
    }
}
