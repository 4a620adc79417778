//! Shaped colliders attached to bodies
//!
//! Shapes are stored in the collider's local space and moved into world
//! space on demand by adding the collider offset and the owning body's
//! position. Bodies never rotate, so a translation is the whole transform.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::foundation::math::Vec2;
use crate::geometry::intersect;
use crate::geometry::{Circle, Polygon, Rect};
use crate::handle::{Ref, RefTag, Slot};
use crate::physics::body::BodyRef;

/// Tag for collider handles
#[derive(Debug)]
pub struct ColliderTag;

impl RefTag for ColliderTag {
    const KIND: &'static str = "Collider";
}

/// Handle to a collider in a [`World`](crate::world::World)
pub type ColliderRef = Ref<ColliderTag>;

/// Bounciness of a freshly created collider
pub const DEFAULT_BOUNCINESS: f32 = 0.5;

/// Friction coefficient of a freshly created collider
pub const DEFAULT_FRICTION: f32 = 0.3;

/// Discriminant of [`Shape`], used in diagnostics and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    /// Circle
    Circle,
    /// Axis-aligned rectangle
    Rectangle,
    /// Convex polygon
    Polygon,
    /// No shape assigned yet
    None,
}

/// Collision shape in local space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Freshly created collider; never indexed or tested
    #[default]
    None,
    /// Circle centered on the collider origin
    Circle {
        /// Radius
        radius: f32,
    },
    /// Rectangle centered on the collider origin
    Rectangle {
        /// Half of the width and height
        half_extents: Vec2,
    },
    /// Convex polygon with vertices relative to the collider origin
    Polygon(Polygon),
}

impl Shape {
    /// Discriminant of this shape
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::None => ShapeType::None,
            Self::Circle { .. } => ShapeType::Circle,
            Self::Rectangle { .. } => ShapeType::Rectangle,
            Self::Polygon(_) => ShapeType::Polygon,
        }
    }

    /// Move the shape to `origin` in world space
    ///
    /// Returns `None` for [`Shape::None`].
    pub fn to_world_space(&self, origin: Vec2) -> Option<WorldShape> {
        match self {
            Self::None => None,
            Self::Circle { radius } => Some(WorldShape::Circle(Circle::new(origin, *radius))),
            Self::Rectangle { half_extents } => Some(WorldShape::Rectangle(
                Rect::from_center_half_extents(origin, *half_extents),
            )),
            Self::Polygon(polygon) => Some(WorldShape::Polygon(polygon.translated(origin))),
        }
    }
}

/// Collider shape placed in world space
///
/// Built every frame from the local [`Shape`]; the narrow phase and the
/// contact resolver run on it.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldShape {
    /// World-space circle
    Circle(Circle),
    /// World-space rectangle
    Rectangle(Rect),
    /// World-space polygon
    Polygon(Polygon),
}

impl WorldShape {
    /// Discriminant of this shape
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Circle(_) => ShapeType::Circle,
            Self::Rectangle(_) => ShapeType::Rectangle,
            Self::Polygon(_) => ShapeType::Polygon,
        }
    }

    /// Axis-aligned bounding rectangle
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Circle(circle) => circle.bounds(),
            Self::Rectangle(rect) => *rect,
            Self::Polygon(polygon) => polygon.bounds(),
        }
    }

    /// Narrow-phase overlap test; touching shapes do not overlap
    pub fn intersects(&self, other: &WorldShape) -> bool {
        use WorldShape::{Circle as C, Polygon as P, Rectangle as R};
        match (self, other) {
            (C(a), C(b)) => intersect::circle_circle(a, b),
            (R(a), R(b)) => intersect::rect_rect(a, b),
            (C(c), R(r)) | (R(r), C(c)) => intersect::circle_rect(c, r),
            (P(a), P(b)) => intersect::polygon_polygon(a, b),
            (P(p), R(r)) | (R(r), P(p)) => intersect::polygon_rect(p, r),
            (C(c), P(p)) | (P(p), C(c)) => intersect::circle_polygon(c, p),
        }
    }
}

bitflags! {
    /// Lifecycle and behaviour flags of a collider
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColliderFlags: u8 {
        /// Slot is free for reuse
        const FREE = 1 << 0;
        /// Collider takes part in the pipeline this frame
        const ENABLED = 1 << 1;
        /// Overlaps are reported but never resolved
        const TRIGGER = 1 << 2;
    }
}

/// Shaped collider owned by a body
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    body: BodyRef,
    shape: Shape,
    offset: Vec2,
    bounciness: f32,
    friction: f32,
    flags: ColliderFlags,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            body: BodyRef::new(0, 0),
            shape: Shape::None,
            offset: Vec2::zeros(),
            bounciness: DEFAULT_BOUNCINESS,
            friction: DEFAULT_FRICTION,
            flags: ColliderFlags::FREE,
        }
    }
}

impl Collider {
    /// Owning body
    #[inline]
    pub fn body(&self) -> BodyRef {
        self.body
    }

    pub(crate) fn attach(&mut self, body: BodyRef) {
        self.body = body;
    }

    /// Local shape
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Discriminant of the local shape
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    /// Use a circle of `radius`
    pub fn set_circle(&mut self, radius: f32) -> &mut Self {
        self.shape = Shape::Circle { radius };
        self
    }

    /// Use a `width` by `height` rectangle centered on the collider origin
    pub fn set_rectangle(&mut self, width: f32, height: f32) -> &mut Self {
        self.shape = Shape::Rectangle {
            half_extents: Vec2::new(width, height) * 0.5,
        };
        self
    }

    /// Use a convex polygon given in local coordinates
    pub fn set_polygon(&mut self, points: Vec<Vec2>) -> Result<&mut Self, GeometryError> {
        self.shape = Shape::Polygon(Polygon::new(points)?);
        Ok(self)
    }

    /// Offset of the collider origin from the body position
    #[inline]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Set the offset from the body position
    pub fn set_offset(&mut self, offset: Vec2) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Restitution coefficient
    #[inline]
    pub fn bounciness(&self) -> f32 {
        self.bounciness
    }

    /// Set the restitution coefficient, clamped to `[0, 1]`
    pub fn set_bounciness(&mut self, bounciness: f32) -> &mut Self {
        self.bounciness = bounciness.clamp(0.0, 1.0);
        self
    }

    /// Friction coefficient
    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Set the friction coefficient; negative values are clamped to zero
    pub fn set_friction(&mut self, friction: f32) -> &mut Self {
        self.friction = friction.max(0.0);
        self
    }

    /// Whether overlaps are only reported
    #[inline]
    pub fn is_trigger(&self) -> bool {
        self.flags.contains(ColliderFlags::TRIGGER)
    }

    /// Mark the collider as a trigger or a solid
    pub fn set_trigger(&mut self, is_trigger: bool) -> &mut Self {
        self.flags.set(ColliderFlags::TRIGGER, is_trigger);
        self
    }

    /// Include the collider in queries again
    pub fn enable(&mut self) -> &mut Self {
        self.flags.insert(ColliderFlags::ENABLED);
        self
    }

    /// Exclude the collider from queries while keeping its owner and tunables
    pub fn disable(&mut self) -> &mut Self {
        self.flags.remove(ColliderFlags::ENABLED);
        self
    }

    /// Whether the collider is enabled
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ColliderFlags::ENABLED)
    }

    /// Whether the collider takes part in the pipeline
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.flags.contains(ColliderFlags::FREE) && self.is_enabled()
    }

    /// Raw flags
    #[inline]
    pub fn flags(&self) -> ColliderFlags {
        self.flags
    }

    /// World-space shape for a body at `body_position`
    pub fn world_shape(&self, body_position: Vec2) -> Option<WorldShape> {
        self.shape.to_world_space(body_position + self.offset)
    }

    /// World-space bounding rectangle for a body at `body_position`
    pub fn world_bounds(&self, body_position: Vec2) -> Option<Rect> {
        self.world_shape(body_position).map(|shape| shape.bounds())
    }
}

impl Slot for Collider {
    fn is_free(&self) -> bool {
        self.flags.contains(ColliderFlags::FREE)
    }

    fn acquire(&mut self) {
        *self = Self::default();
        self.flags = ColliderFlags::ENABLED;
    }

    fn release(&mut self) {
        *self = Self::default();
    }
}
