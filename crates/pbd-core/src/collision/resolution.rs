use glam::Vec3;

use crate::collider_group::{ColliderGroup, Rigidbody};
use crate::collision::Contact;
use crate::particle::ParticleSet;

fn linked_body<'g>(group: &'g ColliderGroup, c: &Contact) -> Option<(usize, &'g Rigidbody)> {
    let collider = group.colliders().get(c.collider as usize)?;
    let index = usize::try_from(collider.rigidbody_index).ok()?;
    group.rigidbody(collider.rigidbody_index).map(|b| (index, b))
}

/// Move the particle of `c` by `magnitude` along `direction`, shared with the
/// linked rigidbody by inverse mass. The body's reaction is accumulated into
/// `deltas`. Returns the impulse applied to the particle.
fn push(
    particles: &mut ParticleSet,
    group: &ColliderGroup,
    deltas: &mut [(Vec3, Vec3)],
    c: &Contact,
    direction: Vec3,
    magnitude: f32,
    dt: f32,
) -> f32 {
    let i = c.particle as usize;
    let w = particles.inv_mass[i];
    let body = linked_body(group, c);
    let w_body = body
        .map(|(_, b)| b.effective_inverse_mass(c.point, direction))
        .unwrap_or(0.0);
    let w_sum = w + w_body;
    if w_sum <= 0.0 {
        return 0.0;
    }
    let lambda = magnitude / w_sum;
    particles.predicted[i] += direction * (lambda * w);
    if let Some((index, b)) = body {
        let (dv, dw) = b.impulse_response(-direction * (lambda / dt), c.point);
        deltas[index].0 += dv;
        deltas[index].1 += dw;
    }
    lambda / dt
}

/// Resolve collider contacts on the predicted positions.
///
/// Penetration is projected out `iterations` times with a non-negative
/// accumulated normal impulse, so repeated passes never over-push. Friction
/// and adhesion run once afterwards using the final normal impulse:
///
/// * tangential motion relative to the surface that `friction * normal` can
///   stop is cancelled entirely (static friction, reported as stick impulse);
/// * otherwise a kinetic Coulomb impulse of `friction * normal` opposes it
///   (reported as tangent impulse);
/// * stickiness pulls particles within `stick_distance` back to the surface
///   (reported as stick impulse).
///
/// Impulses are in mass * velocity units. Returns one `(linear, angular)`
/// velocity change per rigidbody of `group`.
pub fn resolve_contacts(
    contacts: &mut [Contact],
    particles: &mut ParticleSet,
    group: &ColliderGroup,
    dt: f32,
    iterations: u32,
) -> Vec<(Vec3, Vec3)> {
    let mut deltas = vec![(Vec3::ZERO, Vec3::ZERO); group.get_rigidbody_count()];
    if dt <= 0.0 {
        return deltas;
    }

    for _ in 0..iterations.max(1) {
        for c in contacts.iter_mut() {
            let i = c.particle as usize;
            let w = particles.inv_mass[i];
            if w <= 0.0 {
                continue;
            }
            let gap = (particles.predicted[i] - c.point).dot(c.normal) - particles.radius[i];
            // Separating moves may only give back impulse already applied.
            let step = (-gap).max(-c.normal_impulse * dt * w);
            if step.abs() < 1e-9 {
                continue;
            }
            let impulse = push(particles, group, &mut deltas, c, c.normal, step, dt);
            c.normal_impulse = (c.normal_impulse + impulse).max(0.0);
            c.distance = gap + step;
        }
    }

    for c in contacts.iter_mut() {
        let i = c.particle as usize;
        let w = particles.inv_mass[i];
        if w <= 0.0 {
            continue;
        }

        let surface_velocity = linked_body(group, c)
            .map(|(_, b)| b.velocity_at(c.point))
            .unwrap_or(Vec3::ZERO);
        let relative = (particles.predicted[i] - particles.position[i]) / dt - surface_velocity;
        let tangential = relative - c.normal * relative.dot(c.normal);
        let vt = tangential.length();
        if vt > 1e-6 && c.material.friction > 0.0 {
            let direction = -tangential / vt;
            let threshold = c.material.friction * c.normal_impulse;
            if vt / w <= threshold {
                let impulse = push(particles, group, &mut deltas, c, direction, vt * dt, dt);
                c.stick_impulse += impulse;
            } else {
                let magnitude = threshold * w * dt;
                let impulse = push(particles, group, &mut deltas, c, direction, magnitude, dt);
                c.tangent_impulse += impulse;
            }
        }

        let gap = (particles.predicted[i] - c.point).dot(c.normal) - particles.radius[i];
        if c.material.stickiness > 0.0 && gap > 0.0 && gap <= c.material.stick_distance {
            let pull = gap * c.material.stickiness;
            let impulse = push(particles, group, &mut deltas, c, -c.normal, pull, dt);
            c.stick_impulse += impulse;
            c.distance = gap - pull;
        }
    }

    deltas
}
