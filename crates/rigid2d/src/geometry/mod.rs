//! 2D geometric primitives and overlap tests

pub mod intersect;
pub mod primitives;

pub use primitives::{Circle, Polygon, Rect};
