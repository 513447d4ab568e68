//! Position-based particle physics.
//!
//! Particles live in fixed-capacity buffers owned by a [`Solver`]. Each
//! substep predicts positions, projects eight kinds of constraints in a
//! configurable order, resolves particle and collider contacts and derives
//! velocities from the corrected positions. Colliders are stored in a
//! [`ColliderGroup`] shared with the host; triangle meshes can be turned into
//! half-edge topology for per-vertex normals and frames.
//!
//! The host drives time: [`Solver::add_simulation_time`] once per frame, then
//! [`Solver::update_solver`] for as many fixed substeps as the accumulated
//! time pays for, then [`Solver::apply_position_interpolation`] before reading
//! render positions.
//!
//! Enable the `parallel` feature to run neighbor search, contact detection
//! and constraint projection on the rayon thread pool.

pub mod collider_group;
pub mod collision;
pub mod config;
pub mod constraints;
pub mod diffuse;
pub mod error;
pub mod fluids;
pub mod grid;
pub mod half_edge;
pub mod materials;
pub mod math;
pub mod neighbors;
pub mod particle;
pub(crate) mod pool;
pub mod shapes;
pub mod solver;

pub use collider_group::{Collider, ColliderGroup, Rigidbody};
pub use config::{ConstraintParameters, EvaluationOrder, Interpolation, Mode, SolverParameters};
pub use constraints::{ConstraintOrder, ConstraintType};
pub use error::SolverError;
pub use half_edge::{HalfEdgeMesh, MeshInfo};
pub use materials::{CollisionMaterial, FluidMaterial, MaterialCombineMode};
pub use particle::{make_phase, Phase, MAX_IGNORED_PARTICLES};
pub use shapes::{Aabb, Shape, ShapeType};
pub use solver::{SharedColliderGroup, Solver};
