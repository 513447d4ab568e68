use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Dimensionality of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Mode3D,
    /// Particles are confined to the XY plane.
    Mode2D,
}

/// Whether rendering positions are blended between the last two physics states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    None,
    Interpolate,
}

/// Global solver parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverParameters {
    pub mode: Mode,
    pub interpolation: Interpolation,
    pub gravity: Vec3,
    /// Fraction of velocity lost per second, in `[0, 1]`.
    pub damping: f32,
    /// Radius of diffuse particle advection.
    pub advection_radius: f32,
    /// Mass-normalized kinetic energy below which particles are not moved.
    pub sleep_threshold: f32,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            mode: Mode::Mode3D,
            interpolation: Interpolation::None,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.0,
            advection_radius: 0.5,
            sleep_threshold: 0.001,
        }
    }
}

/// How the constraints of one group are applied during an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationOrder {
    /// Gauss-Seidel: corrections are applied as soon as they are computed.
    /// Converges fast, less stable.
    Sequential,
    /// Jacobi: corrections are accumulated, averaged and applied once per
    /// iteration. Very stable, converges slowly.
    Parallel,
}

/// Solve parameters shared by every constraint of one group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintParameters {
    pub enabled: bool,
    pub evaluation_order: EvaluationOrder,
    pub iterations: u32,
    /// Successive over-relaxation factor applied to averaged corrections.
    pub sor_factor: f32,
}

impl ConstraintParameters {
    pub fn new(enabled: bool, evaluation_order: EvaluationOrder, iterations: u32) -> Self {
        Self {
            enabled,
            evaluation_order,
            iterations,
            sor_factor: 1.0,
        }
    }
}

impl Default for ConstraintParameters {
    fn default() -> Self {
        Self::new(true, EvaluationOrder::Parallel, 3)
    }
}
