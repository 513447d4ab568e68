//! Particle collision pipeline.
//!
//! Contacts are rebuilt from scratch every substep: the broad phase finds
//! colliders near each particle, the narrow phase keeps the closest surface,
//! and resolution projects predicted positions and applies friction,
//! adhesion and rigidbody feedback.
pub mod broad_phase;
pub mod narrow_phase;
pub mod particle_contacts;
pub mod resolution;

use glam::Vec3;

use crate::materials::CombinedMaterial;

pub use broad_phase::ColliderBroadPhase;
pub use narrow_phase::detect_contacts;
pub use particle_contacts::{detect_particle_contacts, solve_particle_contacts, ParticleContact};
pub use resolution::resolve_contacts;

/// Contact between one particle and one collider, valid for a single substep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub particle: u32,
    pub collider: u32,
    /// World-space surface point.
    pub point: Vec3,
    /// Surface normal pointing away from the collider.
    pub normal: Vec3,
    /// Signed gap between the particle's surface and the collider surface.
    /// Negative when penetrating.
    pub distance: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub stick_impulse: f32,
    pub material: CombinedMaterial,
}

impl Contact {
    pub fn new(particle: u32, collider: u32, point: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            particle,
            collider,
            point,
            normal,
            distance,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            stick_impulse: 0.0,
            material: CombinedMaterial::default(),
        }
    }
}
