use glam::Vec3;

use crate::constraints::{Constraint, ConstraintType, SolveContext};
use crate::particle::ParticleSet;

/// Upper bound on the velocity response of one aerodynamic update, in units
/// of `0.5 * |v|^2 * area * inv_mass * dt`.
const MAX_AERODYNAMIC_FACTOR: f32 = 1000.0;

/// Drag and lift on a surface particle moving through air.
///
/// The surface is described by the particle's normal (refreshed from the
/// mesh with `update_aerodynamic_normals`) and a represented area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AerodynamicConstraint {
    pub particle: [u32; 1],
    pub normal: Vec3,
    pub wind: Vec3,
    pub area: f32,
    pub drag: f32,
    pub lift: f32,
}

impl AerodynamicConstraint {
    pub fn new(particle: u32, normal: Vec3, wind: Vec3, area: f32, drag: f32, lift: f32) -> Self {
        Self {
            particle: [particle],
            normal,
            wind,
            area,
            drag,
            lift,
        }
    }
}

impl Constraint for AerodynamicConstraint {
    const TYPE: ConstraintType = ConstraintType::Aerodynamics;

    fn particles(&self) -> &[u32] {
        &self.particle
    }

    /// The velocity change from drag and lift is turned into a position
    /// change over `dt` and spread across the group's iterations.
    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>) {
        let i = self.particle[0] as usize;
        let w = particles.inv_mass[i];
        if w <= 0.0 || ctx.dt <= 0.0 {
            return;
        }

        let velocity = (particles.predicted[i] - particles.position[i]) / ctx.dt;
        let relative = velocity - self.wind;
        let speed_sq = relative.length_squared();
        if speed_sq < 1e-10 {
            return;
        }
        let rv = relative / speed_sq.sqrt();

        // Surface normal facing the relative velocity.
        let surface_normal = self.normal * self.normal.dot(rv).signum();
        let attack = surface_normal.dot(rv);
        let lift_dir = surface_normal.cross(rv).cross(rv).normalize_or_zero();
        let factor = (0.5 * speed_sq * self.area * w * ctx.dt).min(MAX_AERODYNAMIC_FACTOR);

        let dv = (-self.drag * rv + self.lift * lift_dir) * attack * factor;
        out.push((i as u32, dv * (ctx.dt / ctx.iterations.max(1) as f32)));
    }
}
