//! Error types for the physics engine

use thiserror::Error;

use crate::physics::collider::ShapeType;

/// Errors raised by the physics world and its stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A handle whose generation no longer matches its slot
    #[error("Invalid {kind} reference (index {index}, generation {generation})")]
    InvalidReference {
        /// Which store the handle belongs to ("Body" or "Collider")
        kind: &'static str,
        /// Slot index carried by the handle
        index: u32,
        /// Generation carried by the handle
        generation: u32,
    },

    /// A geometric computation failed for the given input
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Failures reported by geometric computations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Attempted to normalize a zero-length vector
    #[error("cannot normalize a zero-length vector")]
    DegenerateNormal,

    /// Division by a zero-length vector or zero scalar
    #[error("division by zero")]
    DivideByZero,

    /// No contact generation exists for this shape pair
    #[error("unsupported shape pair: {0:?} / {1:?}")]
    UnsupportedPair(ShapeType, ShapeType),

    /// Polygon with fewer than three vertices
    #[error("polygon needs at least 3 vertices, got {0}")]
    InvalidPolygon(usize),
}

/// Result alias for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
