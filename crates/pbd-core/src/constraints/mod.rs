//! Position-based constraints.
//!
//! Every constraint type implements [`Constraint`]: given the current predicted
//! positions it emits position corrections for the particles it touches.
//! A [`ConstraintGroup`] stores one type's pool together with the group-wide
//! solve parameters and decides how the corrections are applied.
pub mod aerodynamic;
pub mod bending;
pub mod chain;
pub mod coloring;
pub mod distance;
pub mod group;
pub mod pin;
pub mod skin;
pub mod tether;
pub mod volume;

use glam::Vec3;

use crate::collider_group::ColliderGroup;
use crate::config::{ConstraintParameters, EvaluationOrder};
use crate::error::SolverError;
use crate::particle::ParticleSet;

pub use aerodynamic::AerodynamicConstraint;
pub use bending::{bending_constraint_rest, BendingConstraint};
pub use chain::ChainConstraint;
pub use distance::DistanceConstraint;
pub use group::{iteration_stiffness, ConstraintBatch, ConstraintGroup};
pub use pin::PinConstraint;
pub use skin::SkinConstraint;
pub use tether::TetherConstraint;
pub use volume::VolumeConstraint;

/// Constraint type identifiers, also used as the integer ids of the solve
/// order.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Tether = 0,
    Pin = 1,
    Volume = 2,
    Bending = 3,
    Distance = 4,
    Chain = 5,
    Skin = 6,
    Aerodynamics = 7,
}

impl ConstraintType {
    pub const COUNT: usize = 8;

    pub const ALL: [ConstraintType; Self::COUNT] = [
        ConstraintType::Tether,
        ConstraintType::Pin,
        ConstraintType::Volume,
        ConstraintType::Bending,
        ConstraintType::Distance,
        ConstraintType::Chain,
        ConstraintType::Skin,
        ConstraintType::Aerodynamics,
    ];
}

impl ConstraintType {
    /// Solve parameters a fresh solver starts with for this type.
    pub fn default_parameters(self) -> ConstraintParameters {
        match self {
            ConstraintType::Distance | ConstraintType::Skin => {
                ConstraintParameters::new(true, EvaluationOrder::Sequential, 3)
            }
            ConstraintType::Chain => ConstraintParameters::new(true, EvaluationOrder::Parallel, 10),
            _ => ConstraintParameters::new(true, EvaluationOrder::Parallel, 3),
        }
    }
}

impl TryFrom<i32> for ConstraintType {
    type Error = SolverError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        usize::try_from(id)
            .ok()
            .and_then(|i| ConstraintType::ALL.get(i).copied())
            .ok_or(SolverError::UnknownConstraintType(id))
    }
}

/// The order in which constraint groups are solved within a substep.
/// Always a permutation of every [`ConstraintType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstraintOrder([ConstraintType; ConstraintType::COUNT]);

impl ConstraintOrder {
    /// Validate a permutation of constraint type ids.
    pub fn from_ids(ids: &[i32]) -> Result<Self, SolverError> {
        if ids.len() != ConstraintType::COUNT {
            return Err(SolverError::InvalidConstraintOrder);
        }
        let mut order = ConstraintType::ALL;
        let mut seen = [false; ConstraintType::COUNT];
        for (slot, &id) in order.iter_mut().zip(ids) {
            let ty = ConstraintType::try_from(id)?;
            if std::mem::replace(&mut seen[ty as usize], true) {
                return Err(SolverError::InvalidConstraintOrder);
            }
            *slot = ty;
        }
        Ok(Self(order))
    }

    pub fn to_ids(&self) -> [i32; ConstraintType::COUNT] {
        self.0.map(|ty| ty as i32)
    }

    pub fn iter(&self) -> impl Iterator<Item = ConstraintType> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ConstraintOrder {
    fn default() -> Self {
        Self(ConstraintType::ALL)
    }
}

/// Inputs shared by every projection of one iteration.
#[derive(Clone, Copy)]
pub struct SolveContext<'a> {
    pub dt: f32,
    /// Iteration count of the group being solved.
    pub iterations: u32,
    pub colliders: Option<&'a ColliderGroup>,
}

/// One constraint of a specific type.
pub trait Constraint: Clone + Send + Sync {
    const TYPE: ConstraintType;

    /// Every particle the constraint reads or moves.
    fn particles(&self) -> &[u32];

    /// Append the position corrections that move the predicted positions
    /// toward satisfying the constraint.
    fn project(&self, particles: &ParticleSet, ctx: &SolveContext<'_>, out: &mut Vec<(u32, Vec3)>);
}
