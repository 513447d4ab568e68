use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::collider_group::ColliderGroup;
use crate::collision::{ColliderBroadPhase, Contact};
use crate::materials::CollisionMaterial;
use crate::particle::ParticleSet;
use crate::shapes::Aabb;

fn material(materials: &[CollisionMaterial], index: i32) -> CollisionMaterial {
    usize::try_from(index)
        .ok()
        .and_then(|i| materials.get(i))
        .copied()
        .unwrap_or_default()
}

/// Largest stick distance of any material, used to size particle query boxes.
fn max_stick_distance(materials: &[CollisionMaterial]) -> f32 {
    materials
        .iter()
        .map(|m| m.stick_distance)
        .fold(0.0, f32::max)
}

/// Closest collider contact of particle `i`, if any surface lies within
/// `radius + contact_offset + stick_distance` of its predicted position.
fn closest_contact(
    i: u32,
    group: &ColliderGroup,
    broad_phase: &ColliderBroadPhase,
    particles: &ParticleSet,
    materials: &[CollisionMaterial],
    query_margin: f32,
) -> Option<Contact> {
    let idx = i as usize;
    let pos = particles.predicted[idx];
    let radius = particles.radius[idx];
    let group_id = particles.phase[idx].group();
    let particle_material = material(materials, particles.material[idx]);
    let query = Aabb::from_center(pos, Vec3::splat(radius + query_margin));

    let mut best: Option<Contact> = None;
    broad_phase.query(&query, |c| {
        let collider = &group.colliders()[c as usize];
        if collider.collision_group >= 0 && collider.collision_group == group_id {
            return;
        }
        let Some(shape) = group.shape(collider) else {
            return;
        };
        let combined = particle_material.combine(&material(materials, collider.material_index));
        let reach = radius + collider.contact_offset + combined.stick_distance;
        let Some(surface) = collider.surface_query(shape, pos, reach) else {
            return;
        };
        let gap = surface.distance - radius;
        if best.map(|b| gap < b.distance).unwrap_or(true) {
            let mut contact = Contact::new(i, c, surface.point, surface.normal, gap);
            contact.material = combined;
            best = Some(contact);
        }
    });
    best
}

/// Find at most one contact per active particle. `out` is cleared first.
pub fn detect_contacts(
    group: &ColliderGroup,
    broad_phase: &ColliderBroadPhase,
    particles: &ParticleSet,
    materials: &[CollisionMaterial],
    out: &mut Vec<Contact>,
) {
    out.clear();
    let max_offset = group
        .colliders()
        .iter()
        .map(|c| c.contact_offset)
        .fold(0.0, f32::max);
    let margin = max_offset + max_stick_distance(materials);

    #[cfg(feature = "parallel")]
    {
        out.par_extend(particles.active().par_iter().filter_map(|&i| {
            closest_contact(i, group, broad_phase, particles, materials, margin)
        }));
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.extend(particles.active().iter().filter_map(|&i| {
            closest_contact(i, group, broad_phase, particles, materials, margin)
        }));
    }
}
