//! Primitive 2D shapes
//!
//! Rectangles, circles and convex polygons with the bounds and containment
//! helpers the broad and narrow phase need. Coordinates are y-down.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::foundation::math::{Vec2, Vec2Ext};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum corner (left, top)
    pub min: Vec2,
    /// Maximum corner (right, bottom)
    pub max: Vec2,
}

impl Rect {
    /// Creates a rectangle from its corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a rectangle from its top-left corner and size
    pub fn from_position_size(position: Vec2, size: Vec2) -> Self {
        Self::new(position, position + size)
    }

    /// Creates a rectangle centered on `center`
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Width of the rectangle
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height of the rectangle
    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Width and height
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Center point
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half of the size
    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Whether the rectangle has a positive, finite area
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }

    /// Inclusive overlap test; touching edges count as intersecting
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Strict overlap test; touching edges do not overlap
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Closest point inside the rectangle to `point`
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// The four equal quadrants in NW, NE, SW, SE order
    pub fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(self.min, c),
            Rect::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Rect::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Rect::new(c, self.max),
        ]
    }

    /// Corners in clockwise order starting at `min` (y-down)
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new(Vec2::zeros(), Vec2::zeros())
    }
}

/// Circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center point
    pub center: Vec2,
    /// Radius
    pub radius: f32,
}

impl Circle {
    /// Creates a circle
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Bounding rectangle
    pub fn bounds(&self) -> Rect {
        Rect::from_center_half_extents(self.center, Vec2::new(self.radius, self.radius))
    }
}

/// Convex polygon
///
/// Vertices are stored in order (either winding); convexity is assumed by
/// the separating axis test and not checked. Serialized as its vertex list,
/// which is validated on the way back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec2>", into = "Vec<Vec2>")]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    /// Creates a polygon, rejecting fewer than three vertices
    pub fn new(points: Vec<Vec2>) -> Result<Self, GeometryError> {
        if points.len() < 3 {
            return Err(GeometryError::InvalidPolygon(points.len()));
        }
        Ok(Self { points })
    }

    /// Polygon covering `rect`
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            points: rect.corners().to_vec(),
        }
    }

    /// Vertices in order
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Bounding rectangle
    pub fn bounds(&self) -> Rect {
        let first = self.points[0];
        self.points[1..]
            .iter()
            .fold(Rect::new(first, first), |acc, p| Rect::new(acc.min.inf(p), acc.max.sup(p)))
    }

    /// Same polygon moved by `offset`
    pub fn translated(&self, offset: Vec2) -> Polygon {
        Polygon {
            points: self.points.iter().map(|p| p + offset).collect(),
        }
    }

    /// Iterator over the edges as (start, end) pairs, closing the loop
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Edge normals used as separating axes; degenerate edges are skipped
    pub fn axes(&self) -> Vec<Vec2> {
        self.edges()
            .filter_map(|(a, b)| (b - a).perp_ccw().try_unit().ok())
            .collect()
    }

    /// Projection interval of the vertices onto `axis`
    pub fn project(&self, axis: &Vec2) -> (f32, f32) {
        self.points.iter().fold((f32::MAX, f32::MIN), |(min, max), p| {
            let d = p.dot(axis);
            (min.min(d), max.max(d))
        })
    }
}

impl TryFrom<Vec<Vec2>> for Polygon {
    type Error = GeometryError;

    fn try_from(points: Vec<Vec2>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Polygon> for Vec<Vec2> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}
