use glam::Vec3;

use crate::materials::CollisionMaterial;
use crate::neighbors::NeighborList;
use crate::particle::{ParticleSet, Phase};

/// A detected overlap between two solid particles.
#[derive(Clone, Copy, Debug)]
pub struct ParticleContact {
    pub i: u32,           // particle A index
    pub j: u32,           // particle B index
    pub normal: Vec3,     // contact normal (A->B, normalized)
    pub penetration: f32, // overlap depth (positive = overlapping)
    pub friction: f32,
}

/// Particles of different groups always collide. Particles of the same group
/// collide only when both carry the self-collision flag. Fluid particles are
/// kept apart by the density constraint instead.
fn should_collide(a: Phase, b: Phase) -> bool {
    if a.is_fluid() || b.is_fluid() {
        return false;
    }
    a.group() != b.group() || (a.self_collides() && b.self_collides())
}

/// Detect particle-particle overlaps from the neighbor lists.
/// Each pair is reported once, from its lower index. Pairs on either
/// particle's ignore list are skipped.
pub fn detect_particle_contacts(
    particles: &ParticleSet,
    neighbors: &NeighborList,
    materials: &[CollisionMaterial],
    out: &mut Vec<ParticleContact>,
) {
    out.clear();
    let lookup = |index: i32| {
        usize::try_from(index)
            .ok()
            .and_then(|m| materials.get(m))
            .copied()
            .unwrap_or_default()
    };

    for &i in particles.active() {
        let a = i as usize;
        for &j in neighbors.neighbors(a) {
            let b = j as usize;
            if j <= i || !should_collide(particles.phase[a], particles.phase[b]) || particles.ignores(a, b) {
                continue;
            }
            let diff = particles.predicted[b] - particles.predicted[a];
            let dist = diff.length();
            let min_dist = particles.radius[a] + particles.radius[b];
            if dist < min_dist && dist > 1e-8 {
                let combined = lookup(particles.material[a]).combine(&lookup(particles.material[b]));
                out.push(ParticleContact {
                    i,
                    j,
                    normal: diff / dist,
                    penetration: min_dist - dist,
                    friction: combined.friction,
                });
            }
        }
    }
}

/// Push overlapping particles apart proportionally to penetration depth and
/// apply Coulomb friction to their tangential relative motion.
///
/// Corrections are accumulated into `particles.corrections` (Jacobi style);
/// the caller applies them with [`ParticleSet::apply_corrections`].
pub fn solve_particle_contacts(contacts: &[ParticleContact], particles: &mut ParticleSet, dt: f32) {
    for contact in contacts {
        let i = contact.i as usize;
        let j = contact.j as usize;

        let w_i = particles.inv_mass[i];
        let w_j = particles.inv_mass[j];
        let w_sum = w_i + w_j;
        if w_sum < 1e-10 {
            continue; // both static
        }

        let p_i = particles.predicted[i];
        let p_j = particles.predicted[j];
        let diff = p_j - p_i;
        let dist = diff.length();
        let min_dist = particles.radius[i] + particles.radius[j];
        let penetration = min_dist - dist;
        if penetration <= 0.0 || dist < 1e-8 {
            continue;
        }
        let normal = diff / dist;

        // Mass-weighted normal correction
        let correction = normal * penetration / w_sum;
        particles.corrections[i] -= correction * w_i;
        particles.corrections[j] += correction * w_j;

        // Coulomb friction: reduce tangential relative motion
        if contact.friction > 0.0 && dt > 1e-10 {
            let rel = (p_i - particles.position[i]) - (p_j - particles.position[j]);
            let rel_t = rel - normal * rel.dot(normal);
            let rel_t_len = rel_t.length();
            if rel_t_len > 1e-8 {
                let friction_mag = rel_t_len.min(contact.friction * penetration);
                let tangent = rel_t / rel_t_len;
                particles.corrections[i] -= tangent * friction_mag * w_i / w_sum;
                particles.corrections[j] += tangent * friction_mag * w_j / w_sum;
            }
        }

        particles.correction_counts[i] += 1;
        particles.correction_counts[j] += 1;
    }
}
