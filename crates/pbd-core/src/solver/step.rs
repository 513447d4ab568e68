//! One substep of the simulation pipeline:
//!
//! 1. predict positions from velocities and gravity
//! 2. rebuild the grid and neighbor lists on the predicted positions
//! 3. solve the constraint groups in the configured order
//! 4. particle self collisions and the fluid density constraint
//! 5. collider contacts, with rigidbody feedback
//! 6. derive velocities, commit positions of particles that are awake
//! 7. fluid velocity post-processing and diffuse advection
//!
//! Each stage finishes before the next one starts.

use glam::Vec3;

use crate::collider_group::ColliderGroup;
use crate::collision::{detect_contacts, detect_particle_contacts, resolve_contacts, solve_particle_contacts};
use crate::config::{Interpolation, Mode};
use crate::constraints::{ConstraintType, SolveContext};
use crate::fluids::{
    apply_vorticity_confinement, apply_xsph_viscosity, compute_densities, compute_fluid_normals, fluid_material,
    solve_density_constraints,
};
use crate::solver::Solver;

impl Solver {
    pub(super) fn substep(&mut self, dt: f32) {
        self.predict(dt);
        let has_fluid = self
            .particles
            .active()
            .iter()
            .any(|&i| self.particles.phase[i as usize].is_fluid());
        self.find_neighbors(has_fluid);
        self.solve_constraints(dt);
        self.solve_particle_collisions(dt);
        if has_fluid && self.density_parameters.enabled {
            self.solve_density();
        }
        self.solve_collider_contacts(dt);
        self.update_velocities(dt);
        if has_fluid {
            self.update_fluid(dt);
        }
        self.advect_diffuse(dt);
    }

    fn predict(&mut self, dt: f32) {
        let params = self.parameters;
        let damping = (1.0 - params.damping * dt).max(0.0);
        let p = &mut self.particles;
        for k in 0..p.active().len() {
            let i = p.active()[k] as usize;
            p.previous[i] = p.position[i];
            if p.inv_mass[i] > 0.0 {
                let gravity = if p.phase[i].is_fluid() {
                    params.gravity * fluid_material(&self.fluid_materials, p.fluid_material[i]).buoyancy
                } else {
                    params.gravity
                };
                p.velocity[i] = (p.velocity[i] + gravity * dt) * damping;
            }
            if params.mode == Mode::Mode2D {
                p.velocity[i].z = 0.0;
            }
            p.predicted[i] = p.position[i] + p.velocity[i] * dt;
            if params.mode == Mode::Mode2D {
                p.predicted[i].z = 0.0;
            }
        }
    }

    /// Grid cells and neighbor radius cover the widest interaction: two
    /// particle radii for contacts, the smoothing radius for fluids.
    fn interaction_radius(&self, has_fluid: bool) -> f32 {
        let mut radius = 0.0_f32;
        for &i in self.particles.active() {
            let i = i as usize;
            radius = radius.max(2.0 * self.particles.radius[i]);
            if has_fluid && self.particles.phase[i].is_fluid() {
                let h = fluid_material(&self.fluid_materials, self.particles.fluid_material[i]).smoothing_radius;
                radius = radius.max(h);
            }
        }
        radius
    }

    fn find_neighbors(&mut self, has_fluid: bool) {
        let radius = self.interaction_radius(has_fluid);
        self.grid.set_cell_size(radius);
        let p = &self.particles;
        self.grid.build(&p.predicted, p.active());
        self.neighbors
            .build(&self.grid, &p.predicted, p.active(), |i| p.is_active(i), radius);
    }

    fn solve_constraints(&mut self, dt: f32) {
        let shared = self.colliders.clone();
        let order = self.order;
        let mut reactions = Vec::new();
        {
            let guard = Self::read_colliders(shared.as_deref());
            let ctx = SolveContext {
                dt,
                iterations: 1,
                colliders: guard.as_deref(),
            };
            for ty in order.iter() {
                match ctx.colliders {
                    Some(group) if ty == ConstraintType::Pin && group.get_rigidbody_count() > 0 => {
                        reactions = self.solve_pins(group, &ctx);
                    }
                    _ => self.groups.batch_mut(ty).solve(&mut self.particles, &ctx),
                }
            }
        }
        if reactions.is_empty() {
            return;
        }
        if let Some(shared) = shared {
            match shared.write() {
                Ok(mut group) => group.apply_rigidbody_velocity_deltas(&reactions),
                Err(_) => log::error!("collider group lock poisoned, pin reactions dropped"),
            }
        }
    }

    /// Solve the pin group, then hand the opposite of every particle
    /// correction to the pinned rigidbody as an impulse at the pin point.
    /// Returns one `(linear, angular)` velocity change per rigidbody slot.
    fn solve_pins(&mut self, group: &ColliderGroup, ctx: &SolveContext<'_>) -> Vec<(Vec3, Vec3)> {
        let pins = &mut self.groups.pin;
        let p = &mut self.particles;
        for c in pins.constraints() {
            let i = c.particle[0] as usize;
            self.pin_start[i] = p.predicted[i];
            self.pin_counts[i] = 0;
        }
        for (k, c) in pins.constraints().iter().enumerate() {
            if pins.is_active(k) {
                self.pin_counts[c.particle[0] as usize] += 1;
            }
        }

        pins.solve(p, ctx);

        let mut reactions = vec![(Vec3::ZERO, Vec3::ZERO); group.get_rigidbody_count()];
        for (k, c) in pins.constraints().iter().enumerate() {
            let i = c.particle[0] as usize;
            let w = p.inv_mass[i];
            if !pins.is_active(k) || !p.is_active(i) || w <= 0.0 {
                continue;
            }
            let Some(collider) = usize::try_from(c.collider).ok().and_then(|index| group.colliders().get(index)) else {
                continue;
            };
            let (Ok(slot), Some(body)) = (
                usize::try_from(collider.rigidbody_index),
                group.rigidbody(collider.rigidbody_index),
            ) else {
                continue;
            };
            // Particle momentum change, shared evenly by the pins on it.
            let moved = p.predicted[i] - self.pin_start[i];
            let impulse = -moved / (w * ctx.dt * self.pin_counts[i].max(1) as f32);
            let (dv, dw) = body.impulse_response(impulse, collider.to_world(c.offset));
            reactions[slot].0 += dv;
            reactions[slot].1 += dw;
        }
        reactions
    }

    fn solve_particle_collisions(&mut self, dt: f32) {
        detect_particle_contacts(
            &self.particles,
            &self.neighbors,
            &self.collision_materials,
            &mut self.particle_contacts,
        );
        if self.particle_contacts.is_empty() {
            return;
        }
        self.particles.reset_corrections();
        solve_particle_contacts(&self.particle_contacts, &mut self.particles, dt);
        self.particles.apply_corrections(1.0);
    }

    fn solve_density(&mut self) {
        let params = self.density_parameters;
        for _ in 0..params.iterations.max(1) {
            self.particles.reset_corrections();
            solve_density_constraints(&mut self.particles, &self.neighbors, &self.fluid_materials);
            self.particles.apply_corrections(params.sor_factor);
        }
    }

    fn solve_collider_contacts(&mut self, dt: f32) {
        self.contacts.clear();
        if !self.collision_parameters.enabled {
            return;
        }
        let Some(shared) = self.colliders.clone() else {
            return;
        };
        let mut group = match shared.write() {
            Ok(group) => group,
            Err(_) => {
                log::error!("collider group lock poisoned, collisions skipped");
                return;
            }
        };
        if group.get_collider_count() == 0 {
            return;
        }
        self.broad_phase.build(&group);
        detect_contacts(
            &group,
            &self.broad_phase,
            &self.particles,
            &self.collision_materials,
            &mut self.contacts,
        );
        let deltas = resolve_contacts(
            &mut self.contacts,
            &mut self.particles,
            &group,
            dt,
            self.collision_parameters.iterations,
        );
        group.apply_rigidbody_velocity_deltas(&deltas);
    }

    /// Velocities from the position change, then commit. A particle whose
    /// kinetic energy is under the sleep threshold keeps its position but
    /// still carries the velocity, so it builds up speed and wakes.
    fn update_velocities(&mut self, dt: f32) {
        let mode = self.parameters.mode;
        let sleep_threshold = self.parameters.sleep_threshold;
        let p = &mut self.particles;
        for k in 0..p.active().len() {
            let i = p.active()[k] as usize;
            let mut velocity = (p.predicted[i] - p.position[i]) / dt;
            if mode == Mode::Mode2D {
                velocity.z = 0.0;
            }
            p.velocity[i] = velocity;
            if p.inv_mass[i] > 0.0 && 0.5 * velocity.length_squared() < sleep_threshold {
                p.predicted[i] = p.position[i];
            } else {
                p.position[i] = p.predicted[i];
            }
        }
    }

    fn update_fluid(&mut self, dt: f32) {
        compute_densities(&mut self.particles, &self.neighbors, &self.fluid_materials);
        apply_xsph_viscosity(&mut self.particles, &self.neighbors, &self.fluid_materials);
        apply_vorticity_confinement(&mut self.particles, &self.neighbors, &self.fluid_materials, dt);
        compute_fluid_normals(&mut self.particles, &self.neighbors, &self.fluid_materials);
    }

    fn advect_diffuse(&mut self, dt: f32) {
        if self.diffuse.active().is_empty() {
            return;
        }
        let radius = self.parameters.advection_radius.max(1e-4);
        let p = &self.particles;
        self.grid.set_cell_size(self.grid.cell_size().max(radius));
        self.grid.build(&p.position, p.active());
        self.diffuse.advect(p, &self.grid, radius, self.parameters.gravity, dt);
    }

    /// Fill the render positions of the active particles. With interpolation
    /// enabled they blend from the start of the last substep toward its end
    /// by the fraction of a substep still left in the accumulator; otherwise
    /// they equal the physics positions.
    pub fn apply_position_interpolation(&mut self, substep_dt: f32) {
        let alpha = match self.parameters.interpolation {
            Interpolation::Interpolate if substep_dt > 0.0 => (self.accumulated_time / substep_dt).clamp(0.0, 1.0),
            _ => 1.0,
        };
        let p = &mut self.particles;
        for k in 0..p.active().len() {
            let i = p.active()[k] as usize;
            p.render_position[i] = p.previous[i].lerp(p.position[i], alpha);
        }
    }
}
