use glam::Vec3;

use crate::constraints::{Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Regularization added to the system diagonal so runs of fixed particles
/// never produce a zero pivot.
const PIVOT_EPSILON: f32 = 1e-6;

/// An inextensible chain of particles solved in one direct pass.
///
/// Every segment length is kept within `[min_length, max_length]`. All
/// segment constraints are solved together as a tridiagonal linear system,
/// so long chains do not stretch the way iterated distance constraints do.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainConstraint {
    pub particles: Vec<u32>,
    pub min_length: f32,
    pub max_length: f32,
}

impl ChainConstraint {
    pub fn new(particles: Vec<u32>, min_length: f32, max_length: f32) -> Self {
        Self {
            particles,
            min_length,
            max_length: max_length.max(min_length),
        }
    }
}

impl Constraint for ChainConstraint {
    const TYPE: ConstraintType = ConstraintType::Chain;

    fn particles(&self) -> &[u32] {
        &self.particles
    }

    fn project(&self, particles: &ParticleSet, _ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let n = self.particles.len();
        if n < 2 {
            return;
        }
        let segments = n - 1;
        let p = |k: usize| particles.predicted[self.particles[k] as usize];
        let w = |k: usize| particles.inv_mass[self.particles[k] as usize];

        // Segment directions and the negated violations -C.
        let mut dirs = Vec::with_capacity(segments);
        let mut rhs = Vec::with_capacity(segments);
        for k in 0..segments {
            let d = p(k + 1) - p(k);
            let len = d.length();
            let target = len.max(self.min_length).min(self.max_length);
            dirs.push(if len > 1e-10 { d / len } else { Vec3::ZERO });
            rhs.push(target - len);
        }
        if rhs.iter().all(|&c| c == 0.0) {
            return;
        }

        // J W J^T: diagonal w_k + w_{k+1}, off-diagonal -w_{k+1} (n_k . n_{k+1}).
        let diag: Vec<f32> = (0..segments).map(|k| w(k) + w(k + 1) + PIVOT_EPSILON).collect();
        let off: Vec<f32> = (0..segments.saturating_sub(1))
            .map(|k| -w(k + 1) * dirs[k].dot(dirs[k + 1]))
            .collect();

        // Thomas algorithm: forward sweep then back substitution.
        let mut c_prime = vec![0.0f32; segments];
        let mut d_prime = vec![0.0f32; segments];
        for k in 0..segments {
            let lower = if k > 0 { off[k - 1] } else { 0.0 };
            let upper = if k + 1 < segments { off[k] } else { 0.0 };
            let prev_c = if k > 0 { c_prime[k - 1] } else { 0.0 };
            let prev_d = if k > 0 { d_prime[k - 1] } else { 0.0 };
            let pivot = diag[k] - lower * prev_c;
            if pivot.abs() < 1e-12 {
                return;
            }
            c_prime[k] = upper / pivot;
            d_prime[k] = (rhs[k] - lower * prev_d) / pivot;
        }
        let mut lambda = d_prime;
        for k in (0..segments.saturating_sub(1)).rev() {
            lambda[k] -= c_prime[k] * lambda[k + 1];
        }

        // dp_j = w_j (lambda_{j-1} n_{j-1} - lambda_j n_j)
        for j in 0..n {
            let wj = w(j);
            if wj <= 0.0 {
                continue;
            }
            let mut delta = Vec3::ZERO;
            if j > 0 {
                delta += dirs[j - 1] * lambda[j - 1];
            }
            if j < segments {
                delta -= dirs[j] * lambda[j];
            }
            if delta != Vec3::ZERO {
                out.push((self.particles[j], delta * wj));
            }
        }
    }
}
