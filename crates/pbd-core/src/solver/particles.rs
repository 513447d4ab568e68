//! Flat particle accessors.
//!
//! Vector data travels as homogeneous 4-float records (`x, y, z, w`); the `w`
//! of incoming records is ignored and outgoing records carry `w = 1` for
//! points and `w = 0` for directions. Every call clamps `num` to the supplied
//! buffer and to the capacity left after the offset, and returns the number
//! of particles actually read or written.

use glam::Vec3;

use crate::collision::Contact;
use crate::math::{homogeneous, vec4_records, vec4_records_mut, xyz};
use crate::particle::{Phase, MAX_IGNORED_PARTICLES};
use crate::solver::Solver;

/// Number of elements a flat access may touch.
fn clamp_access(capacity: usize, buffer_len: usize, stride: usize, num: usize, offset: usize) -> usize {
    let n = num.min(buffer_len / stride).min(capacity.saturating_sub(offset));
    if n < num {
        log::warn!(
            "particle access of {} elements at offset {} clamped to {}",
            num,
            offset,
            n
        );
    }
    n
}

fn write_vectors(dst: &mut [Vec3], src: &[f32], n: usize, offset: usize) {
    if n == 0 {
        return;
    }
    for (d, &r) in dst[offset..offset + n].iter_mut().zip(vec4_records(src)) {
        *d = xyz(r);
    }
}

fn read_vectors(src: &[Vec3], dst: &mut [f32], n: usize, offset: usize, w: f32) {
    if n == 0 {
        return;
    }
    for (r, &v) in vec4_records_mut(dst).iter_mut().zip(&src[offset..offset + n]) {
        *r = homogeneous(v, w);
    }
}

fn write_scalars<T: Copy>(dst: &mut [T], src: &[T], n: usize, offset: usize) {
    if n > 0 {
        dst[offset..offset + n].copy_from_slice(&src[..n]);
    }
}

fn read_scalars<T: Copy>(src: &[T], dst: &mut [T], n: usize, offset: usize) {
    if n > 0 {
        dst[..n].copy_from_slice(&src[offset..offset + n]);
    }
}

impl Solver {
    fn particle_access(&self, buffer_len: usize, stride: usize, num: usize, offset: usize) -> usize {
        clamp_access(self.particles.capacity(), buffer_len, stride, num, offset)
    }

    fn diffuse_access(&self, buffer_len: usize, stride: usize, num: usize, offset: usize) -> usize {
        clamp_access(self.diffuse.capacity(), buffer_len, stride, num, offset)
    }

    /// Teleports the particles: previous, predicted and render positions are
    /// reset too, so no interpolation happens across the jump.
    pub fn set_particle_positions(&mut self, positions: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(positions.len(), 4, num, dest_offset);
        let p = &mut self.particles;
        write_vectors(&mut p.position, positions, n, dest_offset);
        write_vectors(&mut p.previous, positions, n, dest_offset);
        write_vectors(&mut p.predicted, positions, n, dest_offset);
        write_vectors(&mut p.render_position, positions, n, dest_offset);
        n
    }

    pub fn get_particle_positions(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 4, num, source_offset);
        read_vectors(&self.particles.position, out, n, source_offset, 1.0);
        n
    }

    pub fn set_renderable_particle_positions(&mut self, positions: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(positions.len(), 4, num, dest_offset);
        write_vectors(&mut self.particles.render_position, positions, n, dest_offset);
        n
    }

    /// Interpolated positions for rendering, see
    /// [`Solver::apply_position_interpolation`].
    pub fn get_renderable_particle_positions(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 4, num, source_offset);
        read_vectors(&self.particles.render_position, out, n, source_offset, 1.0);
        n
    }

    pub fn set_particle_velocities(&mut self, velocities: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(velocities.len(), 4, num, dest_offset);
        write_vectors(&mut self.particles.velocity, velocities, n, dest_offset);
        n
    }

    pub fn get_particle_velocities(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 4, num, source_offset);
        read_vectors(&self.particles.velocity, out, n, source_offset, 0.0);
        n
    }

    pub fn set_particle_vorticities(&mut self, vorticities: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(vorticities.len(), 4, num, dest_offset);
        write_vectors(&mut self.particles.vorticity, vorticities, n, dest_offset);
        n
    }

    pub fn get_particle_vorticities(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 4, num, source_offset);
        read_vectors(&self.particles.vorticity, out, n, source_offset, 0.0);
        n
    }

    /// Negative inverse masses are stored as 0 (kinematic).
    pub fn set_particle_inverse_masses(&mut self, inv_masses: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(inv_masses.len(), 1, num, dest_offset);
        if n > 0 {
            for (d, &w) in self.particles.inv_mass[dest_offset..dest_offset + n].iter_mut().zip(inv_masses) {
                *d = w.max(0.0);
            }
        }
        n
    }

    pub fn get_particle_inverse_masses(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 1, num, source_offset);
        read_scalars(&self.particles.inv_mass, out, n, source_offset);
        n
    }

    pub fn set_particle_solid_radii(&mut self, radii: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(radii.len(), 1, num, dest_offset);
        write_scalars(&mut self.particles.radius, radii, n, dest_offset);
        n
    }

    pub fn get_particle_solid_radii(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 1, num, source_offset);
        read_scalars(&self.particles.radius, out, n, source_offset);
        n
    }

    /// Raw phase values, see [`crate::make_phase`].
    pub fn set_particle_phases(&mut self, phases: &[i32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(phases.len(), 1, num, dest_offset);
        if n > 0 {
            for (d, &raw) in self.particles.phase[dest_offset..dest_offset + n].iter_mut().zip(phases) {
                *d = Phase(raw);
            }
        }
        n
    }

    pub fn get_particle_phases(&self, out: &mut [i32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 1, num, source_offset);
        if n > 0 {
            for (d, phase) in out.iter_mut().zip(&self.particles.phase[source_offset..source_offset + n]) {
                *d = phase.0;
            }
        }
        n
    }

    /// Collision material index per particle, -1 for the default material.
    pub fn set_material_indices(&mut self, indices: &[i32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(indices.len(), 1, num, dest_offset);
        write_scalars(&mut self.particles.material, indices, n, dest_offset);
        n
    }

    /// Fluid material index per particle, -1 for the default material.
    pub fn set_fluid_material_indices(&mut self, indices: &[i32], num: usize, dest_offset: usize) -> usize {
        let n = self.particle_access(indices.len(), 1, num, dest_offset);
        write_scalars(&mut self.particles.fluid_material, indices, n, dest_offset);
        n
    }

    /// Fluid surface normals; zero for non-fluid particles.
    pub fn get_particle_normals(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 4, num, source_offset);
        read_vectors(&self.particles.normal, out, n, source_offset, 0.0);
        n
    }

    pub fn get_particle_densities(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.particle_access(out.len(), 1, num, source_offset);
        read_scalars(&self.particles.density, out, n, source_offset);
        n
    }

    /// Particles `particle` never collides with. At most
    /// [`MAX_IGNORED_PARTICLES`] valid indices are kept; an empty slice clears
    /// the list. Returns the number stored.
    pub fn set_ignored_particles(&mut self, particle: usize, ignored: &[i32]) -> usize {
        let capacity = self.particles.capacity();
        let Some(slot) = self.particles.ignored.get_mut(particle) else {
            log::warn!("ignore list for particle {} outside capacity {}", particle, capacity);
            return 0;
        };
        *slot = [-1; MAX_IGNORED_PARTICLES];
        let mut n = 0;
        for &other in ignored {
            let valid = usize::try_from(other).map_or(false, |o| o < capacity && o != particle);
            if !valid || slot[..n].contains(&other) {
                continue;
            }
            if n == MAX_IGNORED_PARTICLES {
                log::warn!("ignore list for particle {} truncated to {}", particle, MAX_IGNORED_PARTICLES);
                break;
            }
            slot[n] = other;
            n += 1;
        }
        n
    }

    /// Copies the ignore list of `particle` into `out`. Returns the number copied.
    pub fn get_ignored_particles(&self, particle: usize, out: &mut [i32]) -> usize {
        let Some(list) = self.particles.ignored.get(particle) else {
            return 0;
        };
        let mut n = 0;
        for (d, &other) in out.iter_mut().zip(list.iter().filter(|&&o| o >= 0)) {
            *d = other;
            n += 1;
        }
        n
    }

    /// Replace the active set. Returns the number of active particles.
    pub fn set_active_particles(&mut self, indices: &[i32]) -> usize {
        self.particles.set_active(indices)
    }

    /// Returns how many particles became active.
    pub fn activate_particles(&mut self, indices: &[i32]) -> usize {
        self.particles.activate(indices)
    }

    /// Returns how many particles became inactive.
    pub fn deactivate_particles(&mut self, indices: &[i32]) -> usize {
        self.particles.deactivate(indices)
    }

    pub fn get_active_particle_count(&self) -> usize {
        self.particles.active().len()
    }
}

// Collision readback. Index `i` of every array describes the same contact.
impl Solver {
    pub fn get_collision_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn read_contacts<T>(&self, out: &mut [T], value: impl Fn(&Contact) -> T) -> usize {
        let n = self.contacts.len().min(out.len());
        for (slot, c) in out.iter_mut().zip(&self.contacts) {
            *slot = value(c);
        }
        n
    }

    fn read_contact_vectors(&self, out: &mut [f32], value: impl Fn(&Contact) -> Vec3, w: f32) -> usize {
        let records = vec4_records_mut(out);
        let n = self.contacts.len().min(records.len());
        for (slot, c) in records.iter_mut().zip(&self.contacts) {
            *slot = homogeneous(value(c), w);
        }
        n
    }

    /// Particle index of each contact.
    pub fn get_collision_indices(&self, out: &mut [i32]) -> usize {
        self.read_contacts(out, |c| c.particle as i32)
    }

    pub fn get_collision_colliders(&self, out: &mut [i32]) -> usize {
        self.read_contacts(out, |c| c.collider as i32)
    }

    /// Gap between particle surface and collider surface at detection time.
    pub fn get_collision_distances(&self, out: &mut [f32]) -> usize {
        self.read_contacts(out, |c| c.distance)
    }

    pub fn get_collision_points(&self, out: &mut [f32]) -> usize {
        self.read_contact_vectors(out, |c| c.point, 1.0)
    }

    pub fn get_collision_normals(&self, out: &mut [f32]) -> usize {
        self.read_contact_vectors(out, |c| c.normal, 0.0)
    }

    pub fn get_collision_normal_impulses(&self, out: &mut [f32]) -> usize {
        self.read_contacts(out, |c| c.normal_impulse)
    }

    pub fn get_collision_tangent_impulses(&self, out: &mut [f32]) -> usize {
        self.read_contacts(out, |c| c.tangent_impulse)
    }

    pub fn get_collision_stick_impulses(&self, out: &mut [f32]) -> usize {
        self.read_contacts(out, |c| c.stick_impulse)
    }
}

// Diffuse particles.
impl Solver {
    pub fn set_active_diffuse_particles(&mut self, indices: &[i32]) -> usize {
        self.diffuse.set_active(indices)
    }

    pub fn activate_diffuse_particles(&mut self, indices: &[i32]) -> usize {
        self.diffuse.activate(indices)
    }

    pub fn deactivate_diffuse_particles(&mut self, indices: &[i32]) -> usize {
        self.diffuse.deactivate(indices)
    }

    pub fn get_active_diffuse_particle_count(&self) -> usize {
        self.diffuse.active().len()
    }

    pub fn set_diffuse_particle_positions(&mut self, positions: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.diffuse_access(positions.len(), 4, num, dest_offset);
        write_vectors(&mut self.diffuse.position, positions, n, dest_offset);
        n
    }

    pub fn get_diffuse_particle_positions(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.diffuse_access(out.len(), 4, num, source_offset);
        read_vectors(&self.diffuse.position, out, n, source_offset, 1.0);
        n
    }

    pub fn set_diffuse_particle_velocities(&mut self, velocities: &[f32], num: usize, dest_offset: usize) -> usize {
        let n = self.diffuse_access(velocities.len(), 4, num, dest_offset);
        write_vectors(&mut self.diffuse.velocity, velocities, n, dest_offset);
        n
    }

    pub fn get_diffuse_particle_velocities(&self, out: &mut [f32], num: usize, source_offset: usize) -> usize {
        let n = self.diffuse_access(out.len(), 4, num, source_offset);
        read_vectors(&self.diffuse.velocity, out, n, source_offset, 0.0);
        n
    }

    /// Fluid particles near each diffuse particle during the last substep.
    /// Low counts mark spray, high counts bubbles inside the fluid.
    pub fn get_diffuse_particle_neighbour_counts(&self, out: &mut [i32], num: usize, source_offset: usize) -> usize {
        let n = self.diffuse_access(out.len(), 1, num, source_offset);
        for (k, slot) in out[..n].iter_mut().enumerate() {
            *slot = self.diffuse.neighbour_count(source_offset + k) as i32;
        }
        n
    }
}
