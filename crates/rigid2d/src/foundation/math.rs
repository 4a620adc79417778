//! Math utilities and types
//!
//! Provides the 2D vector type used by the simulation and a few helpers that
//! report degenerate input instead of producing NaNs.

pub use nalgebra::Vector2;

use crate::error::GeometryError;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Lengths below this are treated as zero when normalizing or dividing
pub const EPSILON: f32 = 1.0e-6;

/// Shorthand constructor for [`Vec2`]
#[inline]
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Extension trait for [`Vec2`] with 2D-specific operations
pub trait Vec2Ext {
    /// Counter-clockwise perpendicular vector
    ///
    /// nalgebra's inherent `perp` is the perp-dot product and takes
    /// precedence over trait methods, hence the name.
    fn perp_ccw(&self) -> Vec2;

    /// Unit vector in the same direction, or an error for a zero-length vector
    fn try_unit(&self) -> Result<Vec2, GeometryError>;
}

impl Vec2Ext for Vec2 {
    #[inline]
    fn perp_ccw(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    fn try_unit(&self) -> Result<Vec2, GeometryError> {
        self.try_normalize(EPSILON).ok_or(GeometryError::DegenerateNormal)
    }
}

/// Divide a vector by a scalar, failing on a zero divisor
pub fn try_div_scalar(v: Vec2, divisor: f32) -> Result<Vec2, GeometryError> {
    if divisor.abs() < EPSILON {
        return Err(GeometryError::DivideByZero);
    }
    Ok(v / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perpendicular() {
        let a = vec2(1.0, 0.0);
        let b = vec2(0.0, 1.0);
        assert_eq!(a.perp_ccw(), b);
        assert_eq!(b.perp_ccw(), vec2(-1.0, 0.0));
        assert_relative_eq!(a.perp(&b), 1.0);
    }

    #[test]
    fn test_try_unit_rejects_zero_vector() {
        assert_eq!(Vec2::zeros().try_unit(), Err(GeometryError::DegenerateNormal));

        let unit = vec2(3.0, 4.0).try_unit().unwrap();
        assert_relative_eq!(unit.x, 0.6);
        assert_relative_eq!(unit.y, 0.8);
    }

    #[test]
    fn test_division_by_zero_is_signaled() {
        assert_eq!(try_div_scalar(vec2(1.0, 1.0), 0.0), Err(GeometryError::DivideByZero));
        assert_eq!(try_div_scalar(vec2(4.0, 6.0), 2.0), Ok(vec2(2.0, 3.0)));
    }
}
