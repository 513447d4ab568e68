//! Error types for operations that reject their input wholesale.
//!
//! Bulk particle/constraint/collider writes never fail: they clamp and report
//! the number of elements applied. The variants below cover the few calls that
//! either succeed completely or leave state untouched.

use std::fmt;

/// Errors reported by mesh generation, constraint ordering and id conversions.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// An undirected edge is shared by more than two triangles, or two
    /// triangles traverse it in the same direction.
    NonManifoldEdge { a: u32, b: u32 },
    /// A triangle repeats a vertex or has zero area.
    DegenerateTriangle { triangle: usize },
    /// A triangle references a vertex past the supplied vertex count.
    VertexOutOfRange { index: i64, count: usize },
    /// An input buffer holds fewer elements than the declared count.
    InsufficientData { expected: usize, actual: usize },
    /// The constraint order is not a permutation of all constraint types.
    InvalidConstraintOrder,
    /// Integer id does not name a constraint type.
    UnknownConstraintType(i32),
    /// Integer id does not name a shape type.
    UnknownShapeType(i32),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::NonManifoldEdge { a, b } => {
                write!(f, "edge ({}, {}) is non-manifold", a, b)
            }
            SolverError::DegenerateTriangle { triangle } => {
                write!(f, "triangle {} is degenerate", triangle)
            }
            SolverError::VertexOutOfRange { index, count } => {
                write!(f, "vertex index {} out of range (count: {})", index, count)
            }
            SolverError::InsufficientData { expected, actual } => {
                write!(f, "expected {} values, got {}", expected, actual)
            }
            SolverError::InvalidConstraintOrder => {
                write!(f, "constraint order must be a permutation of every constraint type")
            }
            SolverError::UnknownConstraintType(id) => write!(f, "unknown constraint type {}", id),
            SolverError::UnknownShapeType(id) => write!(f, "unknown shape type {}", id),
        }
    }
}

impl std::error::Error for SolverError {}
