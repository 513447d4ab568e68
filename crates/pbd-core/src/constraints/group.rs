use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{ConstraintParameters, EvaluationOrder};
use crate::constraints::coloring::color_constraints;
use crate::constraints::{Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;
use crate::pool::{read_range, swap_remove_range, write_range};

/// Per-iteration stiffness that compounds to `k` over `iterations` passes:
/// `1 - (1 - k)^(1 / iterations)`.
pub fn iteration_stiffness(k: f32, iterations: u32) -> f32 {
    let k = k.clamp(0.0, 1.0);
    if iterations <= 1 {
        return k;
    }
    1.0 - (1.0 - k).powf(1.0 / iterations as f32)
}

/// A resizable pool of constraints of one type plus its solve parameters.
///
/// Newly written constraints start active. Removal swap-compacts the pool,
/// so offsets held by the caller are invalid after a `remove` call.
pub struct ConstraintGroup<C: Constraint> {
    pub parameters: ConstraintParameters,
    constraints: Vec<C>,
    active: Vec<bool>,
    /// Color classes of the active constraints; `None` when stale.
    colors: Option<Vec<Vec<u32>>>,
}

impl<C: Constraint> ConstraintGroup<C> {
    pub fn new(parameters: ConstraintParameters) -> Self {
        Self {
            parameters,
            constraints: Vec::new(),
            active: Vec::new(),
            colors: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    #[inline]
    pub fn constraints(&self) -> &[C] {
        &self.constraints
    }

    /// Write `num` constraints at `dest_offset`, growing the pool as needed.
    /// Returns the number written.
    pub fn set(&mut self, constraints: &[C], num: usize, dest_offset: usize) -> usize {
        let offset = dest_offset.min(self.constraints.len());
        let written = write_range(&mut self.constraints, constraints, num, offset);
        if self.active.len() < self.constraints.len() {
            self.active.resize(self.constraints.len(), true);
        }
        self.colors = None;
        written
    }

    pub fn get(&self, out: &mut [C], num: usize, source_offset: usize) -> usize {
        read_range(&self.constraints, out, num, source_offset)
    }

    /// Returns the new constraint count.
    pub fn remove(&mut self, num: usize, source_offset: usize) -> usize {
        swap_remove_range(&mut self.active, num, source_offset);
        self.colors = None;
        swap_remove_range(&mut self.constraints, num, source_offset)
    }

    fn set_flags(&mut self, indices: &[i32], value: bool) -> usize {
        let mut changed = 0;
        for &i in indices {
            let Some(flag) = usize::try_from(i).ok().and_then(|i| self.active.get_mut(i)) else {
                continue;
            };
            if *flag != value {
                *flag = value;
                changed += 1;
            }
        }
        if changed > 0 {
            self.colors = None;
        }
        changed
    }

    /// Returns how many constraints changed state.
    pub fn activate(&mut self, indices: &[i32]) -> usize {
        self.set_flags(indices, true)
    }

    pub fn deactivate(&mut self, indices: &[i32]) -> usize {
        self.set_flags(indices, false)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    pub fn active_indices(&self) -> Vec<u32> {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Mutable access to every constraint, e.g. to refresh per-constraint
    /// data from a mesh. Invalidates the coloring.
    pub fn constraints_mut(&mut self) -> &mut [C] {
        self.colors = None;
        &mut self.constraints
    }

    /// Cached color classes of the active constraints, computed on demand.
    fn take_colors(&mut self) -> Vec<Vec<u32>> {
        if let Some(colors) = self.colors.take() {
            return colors;
        }
        color_constraints(
            self.constraints
                .iter()
                .enumerate()
                .filter(|&(i, _)| self.active[i])
                .map(|(i, c)| (i as u32, c.particles())),
        )
    }

    /// Run the configured iterations of this group on the predicted positions.
    pub fn solve(&mut self, particles: &mut ParticleSet, ctx: &SolveContext<'_>) {
        if !self.parameters.enabled || self.constraints.is_empty() {
            return;
        }
        let params = self.parameters;
        let ctx = SolveContext {
            iterations: params.iterations.max(1),
            ..*ctx
        };
        let colors = self.take_colors();

        for _ in 0..ctx.iterations {
            match params.evaluation_order {
                EvaluationOrder::Sequential => {
                    for class in &colors {
                        self.solve_class_sequential(class, particles, &ctx);
                    }
                }
                EvaluationOrder::Parallel => {
                    particles.reset_corrections();
                    for class in &colors {
                        for (p, delta) in self.project_class(class, particles, &ctx) {
                            particles.corrections[p as usize] += delta;
                            particles.correction_counts[p as usize] += 1;
                        }
                    }
                    particles.apply_corrections(params.sor_factor);
                }
            }
        }

        self.colors = Some(colors);
    }

    fn participates(&self, c: &C, particles: &ParticleSet) -> bool {
        c.particles().iter().all(|&p| particles.is_active(p as usize))
    }

    #[cfg(not(feature = "parallel"))]
    fn solve_class_sequential(&self, class: &[u32], particles: &mut ParticleSet, ctx: &SolveContext<'_>) {
        let mut out = Vec::new();
        for &ci in class {
            let c = &self.constraints[ci as usize];
            if !self.participates(c, particles) {
                continue;
            }
            out.clear();
            c.project(particles, ctx, &mut out);
            for &(p, delta) in &out {
                particles.predicted[p as usize] += delta;
            }
        }
    }

    /// Constraints of one class never share particles, so projecting them all
    /// against the same snapshot and applying afterwards is Gauss-Seidel.
    #[cfg(feature = "parallel")]
    fn solve_class_sequential(&self, class: &[u32], particles: &mut ParticleSet, ctx: &SolveContext<'_>) {
        for (p, delta) in self.project_class(class, particles, ctx) {
            particles.predicted[p as usize] += delta;
        }
    }

    fn project_class(&self, class: &[u32], particles: &ParticleSet, ctx: &SolveContext<'_>) -> Vec<(u32, Vec3)> {
        #[cfg(feature = "parallel")]
        {
            class
                .par_iter()
                .fold(Vec::new, |mut out, &ci| {
                    let c = &self.constraints[ci as usize];
                    if self.participates(c, particles) {
                        c.project(particles, ctx, &mut out);
                    }
                    out
                })
                .reduce(Vec::new, |mut a, mut b| {
                    a.append(&mut b);
                    a
                })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let mut out = Vec::new();
            for &ci in class {
                let c = &self.constraints[ci as usize];
                if self.participates(c, particles) {
                    c.project(particles, ctx, &mut out);
                }
            }
            out
        }
    }
}

/// Type-erased view of a constraint group, used by the solver to drive the
/// groups in the configured order.
pub trait ConstraintBatch: Send {
    fn constraint_type(&self) -> ConstraintType;
    fn parameters(&self) -> ConstraintParameters;
    fn set_parameters(&mut self, parameters: ConstraintParameters);
    fn count(&self) -> usize;
    fn active_indices(&self) -> Vec<u32>;
    fn activate(&mut self, indices: &[i32]) -> usize;
    fn deactivate(&mut self, indices: &[i32]) -> usize;
    fn remove(&mut self, num: usize, source_offset: usize) -> usize;
    fn solve(&mut self, particles: &mut ParticleSet, ctx: &SolveContext<'_>);
}

impl<C: Constraint> ConstraintBatch for ConstraintGroup<C> {
    fn constraint_type(&self) -> ConstraintType {
        C::TYPE
    }

    fn parameters(&self) -> ConstraintParameters {
        self.parameters
    }

    fn set_parameters(&mut self, parameters: ConstraintParameters) {
        self.parameters = parameters;
    }

    fn count(&self) -> usize {
        self.len()
    }

    fn active_indices(&self) -> Vec<u32> {
        ConstraintGroup::active_indices(self)
    }

    fn activate(&mut self, indices: &[i32]) -> usize {
        ConstraintGroup::activate(self, indices)
    }

    fn deactivate(&mut self, indices: &[i32]) -> usize {
        ConstraintGroup::deactivate(self, indices)
    }

    fn remove(&mut self, num: usize, source_offset: usize) -> usize {
        ConstraintGroup::remove(self, num, source_offset)
    }

    fn solve(&mut self, particles: &mut ParticleSet, ctx: &SolveContext<'_>) {
        ConstraintGroup::solve(self, particles, ctx)
    }
}
