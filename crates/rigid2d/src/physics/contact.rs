//! Contact generation and impulse resolution
//!
//! The resolver only handles solid pairs. Contact setup supports
//! circle–circle, rectangle–rectangle and circle–rectangle in either order;
//! polygons are limited to overlap detection and report
//! [`GeometryError::UnsupportedPair`].

use crate::core::config::SolverConfig;
use crate::error::GeometryError;
use crate::foundation::math::{try_div_scalar, Vec2, Vec2Ext};
use crate::geometry::{Circle, Rect};
use crate::physics::body::Body;
use crate::physics::collider::{Collider, ColliderRef, WorldShape};

/// Unordered pair of colliders
///
/// The refs are stored lowest first, so `ColliderPair::new(a, b)` and
/// `ColliderPair::new(b, a)` compare and hash the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderPair {
    first: ColliderRef,
    second: ColliderRef,
}

impl ColliderPair {
    /// Create a pair, normalizing the order
    pub fn new(a: ColliderRef, b: ColliderRef) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Lower of the two refs
    #[inline]
    pub fn first(&self) -> ColliderRef {
        self.first
    }

    /// Higher of the two refs
    #[inline]
    pub fn second(&self) -> ColliderRef {
        self.second
    }

    /// Whether `collider` is one of the two
    #[inline]
    pub fn contains(&self, collider: ColliderRef) -> bool {
        self.first == collider || self.second == collider
    }
}

/// Contact between two overlapping shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit vector pointing from shape A towards shape B
    pub normal: Vec2,
    /// Overlap depth along the normal, positive when overlapping
    pub penetration: f32,
}

/// Material properties combined from the two colliders of a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    /// Lower of the two bounciness values
    pub restitution: f32,
    /// Geometric mean of the two friction coefficients
    pub friction: f32,
}

impl ContactMaterial {
    /// Combine the tunables of two colliders
    pub fn combine(a: &Collider, b: &Collider) -> Self {
        Self {
            restitution: a.bounciness().min(b.bounciness()),
            friction: (a.friction() * b.friction()).sqrt(),
        }
    }
}

/// Computes contacts and applies impulses and positional correction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactResolver {
    config: SolverConfig,
}

impl ContactResolver {
    /// Create a resolver with the given tunables
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver tunables
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Compute normal and penetration for an overlapping shape pair
    pub fn setup_contact(&self, a: &WorldShape, b: &WorldShape) -> Result<Contact, GeometryError> {
        match (a, b) {
            (WorldShape::Circle(a), WorldShape::Circle(b)) => circle_circle_contact(a, b),
            (WorldShape::Rectangle(a), WorldShape::Rectangle(b)) => rect_rect_contact(a, b),
            (WorldShape::Circle(c), WorldShape::Rectangle(r)) => circle_rect_contact(c, r),
            (WorldShape::Rectangle(r), WorldShape::Circle(c)) => {
                circle_rect_contact(c, r).map(|contact| Contact {
                    normal: -contact.normal,
                    ..contact
                })
            }
            (WorldShape::Polygon(_), _) | (_, WorldShape::Polygon(_)) => {
                Err(GeometryError::UnsupportedPair(a.shape_type(), b.shape_type()))
            }
        }
    }

    /// Apply restitution and friction impulses
    ///
    /// Returns the magnitude of the normal impulse, zero when the bodies are
    /// already separating or both immovable.
    pub fn resolve_collision(
        &self,
        contact: &Contact,
        a: &mut Body,
        b: &mut Body,
        material: ContactMaterial,
    ) -> f32 {
        let inverse_mass_sum = a.inverse_mass() + b.inverse_mass();
        if inverse_mass_sum <= 0.0 {
            return 0.0;
        }

        let relative_velocity = b.velocity() - a.velocity();
        let velocity_along_normal = relative_velocity.dot(&contact.normal);
        if velocity_along_normal > 0.0 {
            return 0.0;
        }

        let j = -(1.0 + material.restitution) * velocity_along_normal / inverse_mass_sum;
        let impulse = contact.normal * j;
        a.apply_impulse(-impulse);
        b.apply_impulse(impulse);

        // Coulomb friction along the tangent of the post-impulse velocity
        let relative_velocity = b.velocity() - a.velocity();
        let tangential = relative_velocity - contact.normal * relative_velocity.dot(&contact.normal);
        if let Ok(tangent) = tangential.try_unit() {
            let jt = -relative_velocity.dot(&tangent) / inverse_mass_sum;
            let max_friction = j * material.friction;
            let friction_impulse = tangent * jt.clamp(-max_friction, max_friction);
            a.apply_impulse(-friction_impulse);
            b.apply_impulse(friction_impulse);
        }

        j
    }

    /// Push the bodies apart along the contact normal
    pub fn resolve_position(&self, contact: &Contact, a: &mut Body, b: &mut Body) {
        let inverse_mass_a = a.inverse_mass();
        let inverse_mass_b = b.inverse_mass();
        let inverse_mass_sum = inverse_mass_a + inverse_mass_b;
        if inverse_mass_sum <= 0.0 {
            return;
        }

        let depth = (contact.penetration - self.config.slop).max(0.0);
        let correction = contact.normal * (depth / inverse_mass_sum * self.config.correction_percent);
        let position_a = a.position() - correction * inverse_mass_a;
        let position_b = b.position() + correction * inverse_mass_b;
        a.set_position(position_a);
        b.set_position(position_b);
    }
}

fn circle_circle_contact(a: &Circle, b: &Circle) -> Result<Contact, GeometryError> {
    let delta = b.center - a.center;
    let normal = delta.try_unit()?;
    Ok(Contact {
        normal,
        penetration: a.radius + b.radius - delta.magnitude(),
    })
}

fn rect_rect_contact(a: &Rect, b: &Rect) -> Result<Contact, GeometryError> {
    let delta = b.center() - a.center();
    if delta.magnitude_squared() == 0.0 {
        return Err(GeometryError::DegenerateNormal);
    }

    let extents = a.half_extents() + b.half_extents();
    let overlap_x = extents.x - delta.x.abs();
    let overlap_y = extents.y - delta.y.abs();

    // Separate along the axis of least penetration
    Ok(if overlap_x < overlap_y {
        Contact {
            normal: Vec2::new(delta.x.signum(), 0.0),
            penetration: overlap_x,
        }
    } else {
        Contact {
            normal: Vec2::new(0.0, delta.y.signum()),
            penetration: overlap_y,
        }
    })
}

fn circle_rect_contact(circle: &Circle, rect: &Rect) -> Result<Contact, GeometryError> {
    let closest = rect.clamp_point(circle.center);
    let delta = closest - circle.center;

    if delta.magnitude_squared() > 0.0 {
        let distance = delta.magnitude();
        return Ok(Contact {
            normal: try_div_scalar(delta, distance)?,
            penetration: circle.radius - distance,
        });
    }

    // Center inside the rectangle: leave through the nearest face
    let to_min = circle.center - rect.min;
    let to_max = rect.max - circle.center;
    let faces = [
        (to_min.x, Vec2::new(1.0, 0.0)),
        (to_max.x, Vec2::new(-1.0, 0.0)),
        (to_min.y, Vec2::new(0.0, 1.0)),
        (to_max.y, Vec2::new(0.0, -1.0)),
    ];
    let (distance, normal) = faces
        .into_iter()
        .min_by(|(d1, _), (d2, _)| d1.total_cmp(d2))
        .ok_or(GeometryError::DegenerateNormal)?;

    Ok(Contact {
        normal,
        penetration: circle.radius + distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;
    use crate::geometry::Polygon;
    use crate::handle::Slot;
    use crate::physics::collider::ShapeType;
    use approx::assert_relative_eq;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(pair: &ColliderPair) -> u64 {
        let mut hasher = DefaultHasher::new();
        pair.hash(&mut hasher);
        hasher.finish()
    }

    fn body_at(position: Vec2, velocity: Vec2) -> Body {
        let mut body = Body::default();
        body.acquire();
        body.set_position(position).set_velocity(velocity);
        body
    }

    fn resolver() -> ContactResolver {
        ContactResolver::new(SolverConfig::default())
    }

    #[test]
    fn test_pair_is_order_independent() {
        let a = ColliderRef::new(3, 1);
        let b = ColliderRef::new(7, 0);

        assert_eq!(ColliderPair::new(a, b), ColliderPair::new(b, a));
        assert_eq!(hash_of(&ColliderPair::new(a, b)), hash_of(&ColliderPair::new(b, a)));
        assert_eq!(ColliderPair::new(b, a).first(), a);
        assert!(ColliderPair::new(a, b).contains(b));
    }

    #[test]
    fn test_circle_circle_penetration() {
        let a = WorldShape::Circle(Circle::new(vec2(0.0, 0.0), 2.0));
        let b = WorldShape::Circle(Circle::new(vec2(3.0, 4.0), 1.0));

        let contact = resolver().setup_contact(&a, &b).unwrap();
        assert_relative_eq!(contact.penetration, 2.0 + 1.0 - 5.0);
        assert_relative_eq!(contact.normal, vec2(0.6, 0.8));
    }

    #[test]
    fn test_coincident_circles_are_degenerate() {
        let a = WorldShape::Circle(Circle::new(vec2(1.0, 1.0), 1.0));
        assert_eq!(
            resolver().setup_contact(&a, &a.clone()),
            Err(GeometryError::DegenerateNormal)
        );
    }

    #[test]
    fn test_rect_rect_least_penetration_axis() {
        let a = WorldShape::Rectangle(Rect::new(vec2(0.0, 0.0), vec2(4.0, 4.0)));
        let b = WorldShape::Rectangle(Rect::new(vec2(3.0, 1.0), vec2(7.0, 5.0)));

        let contact = resolver().setup_contact(&a, &b).unwrap();
        assert_relative_eq!(contact.normal, vec2(1.0, 0.0));
        assert_relative_eq!(contact.penetration, 1.0);
    }

    #[test]
    fn test_circle_rect_both_orders() {
        let circle = WorldShape::Circle(Circle::new(vec2(-0.5, 2.0), 1.0));
        let rect = WorldShape::Rectangle(Rect::new(vec2(0.0, 0.0), vec2(4.0, 4.0)));

        let forward = resolver().setup_contact(&circle, &rect).unwrap();
        assert_relative_eq!(forward.normal, vec2(1.0, 0.0));
        assert_relative_eq!(forward.penetration, 0.5);

        let backward = resolver().setup_contact(&rect, &circle).unwrap();
        assert_relative_eq!(backward.normal, vec2(-1.0, 0.0));
        assert_relative_eq!(backward.penetration, 0.5);
    }

    #[test]
    fn test_circle_center_inside_rect() {
        let circle = WorldShape::Circle(Circle::new(vec2(3.5, 2.0), 1.0));
        let rect = WorldShape::Rectangle(Rect::new(vec2(0.0, 0.0), vec2(4.0, 4.0)));

        let contact = resolver().setup_contact(&circle, &rect).unwrap();
        assert_relative_eq!(contact.normal, vec2(-1.0, 0.0));
        assert_relative_eq!(contact.penetration, 1.5);
    }

    #[test]
    fn test_polygon_pairs_are_unsupported() {
        let polygon = Polygon::new(vec![vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)]).unwrap();
        let a = WorldShape::Polygon(polygon);
        let b = WorldShape::Circle(Circle::new(vec2(0.0, 0.0), 1.0));

        assert_eq!(
            resolver().setup_contact(&b, &a),
            Err(GeometryError::UnsupportedPair(ShapeType::Circle, ShapeType::Polygon))
        );
    }

    #[test]
    fn test_head_on_elastic_collision_swaps_velocities() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 0.1,
        };
        let mut a = body_at(vec2(0.0, 0.0), vec2(1.0, 0.0));
        let mut b = body_at(vec2(1.0, 0.0), vec2(-1.0, 0.0));
        let material = ContactMaterial {
            restitution: 1.0,
            friction: 0.0,
        };

        let j = resolver().resolve_collision(&contact, &mut a, &mut b, material);
        assert_relative_eq!(j, 2.0);
        assert_relative_eq!(a.velocity(), vec2(-1.0, 0.0));
        assert_relative_eq!(b.velocity(), vec2(1.0, 0.0));
    }

    #[test]
    fn test_separating_bodies_are_left_alone() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 0.1,
        };
        let mut a = body_at(vec2(0.0, 0.0), vec2(-1.0, 0.0));
        let mut b = body_at(vec2(1.0, 0.0), vec2(1.0, 0.0));
        let material = ContactMaterial {
            restitution: 1.0,
            friction: 1.0,
        };

        assert_eq!(resolver().resolve_collision(&contact, &mut a, &mut b, material), 0.0);
        assert_eq!(a.velocity(), vec2(-1.0, 0.0));
    }

    #[test]
    fn test_friction_is_clamped_by_normal_impulse() {
        let contact = Contact {
            normal: vec2(0.0, 1.0),
            penetration: 0.1,
        };
        let mut a = body_at(vec2(0.0, 0.0), vec2(10.0, 1.0));
        let mut b = body_at(vec2(0.0, 1.0), Vec2::zeros());
        let material = ContactMaterial {
            restitution: 0.0,
            friction: 0.5,
        };

        let j = resolver().resolve_collision(&contact, &mut a, &mut b, material);
        assert_relative_eq!(j, 0.5);
        // Tangential impulse limited to j * mu = 0.25
        assert_relative_eq!(a.velocity().x, 10.0 - 0.25);
        assert_relative_eq!(b.velocity().x, 0.25);
    }

    #[test]
    fn test_positional_correction() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 1.01,
        };
        let mut a = body_at(vec2(0.0, 0.0), Vec2::zeros());
        let mut b = body_at(vec2(1.0, 0.0), Vec2::zeros());

        resolver().resolve_position(&contact, &mut a, &mut b);
        // 0.4 * (1.01 - 0.01) split evenly
        assert_relative_eq!(a.position(), vec2(-0.2, 0.0), epsilon = 1e-6);
        assert_relative_eq!(b.position(), vec2(1.2, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_material_combination() {
        let mut a = Collider::default();
        let mut b = Collider::default();
        a.set_bounciness(0.2).set_friction(0.25);
        b.set_bounciness(0.8).set_friction(1.0);

        let material = ContactMaterial::combine(&a, &b);
        assert_relative_eq!(material.restitution, 0.2);
        assert_relative_eq!(material.friction, 0.5);
    }

    #[test]
    fn test_heavier_body_recoils_less() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 0.1,
        };
        let mut heavy = body_at(vec2(0.0, 0.0), vec2(1.0, 0.0));
        heavy.set_mass(4.0);
        let mut light = body_at(vec2(1.0, 0.0), vec2(-1.0, 0.0));
        let material = ContactMaterial {
            restitution: 0.5,
            friction: 0.0,
        };

        let j = resolver().resolve_collision(&contact, &mut heavy, &mut light, material);
        // j = (1 + e) * 2 / (1/4 + 1)
        assert_relative_eq!(j, 2.4, epsilon = 1e-6);
        assert_relative_eq!(heavy.velocity(), vec2(0.4, 0.0), epsilon = 1e-6);
        assert_relative_eq!(light.velocity(), vec2(1.4, 0.0), epsilon = 1e-6);
        assert_relative_eq!(4.0 * heavy.velocity().x + light.velocity().x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_position_correction_split_by_inverse_mass() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 1.01,
        };
        let mut heavy = body_at(vec2(0.0, 0.0), Vec2::zeros());
        heavy.set_mass(4.0);
        let mut light = body_at(vec2(1.0, 0.0), Vec2::zeros());

        resolver().resolve_position(&contact, &mut heavy, &mut light);
        // 0.4 * (1.01 - 0.01) / 1.25 = 0.32, shared 1:4
        assert_relative_eq!(heavy.position(), vec2(-0.08, 0.0), epsilon = 1e-6);
        assert_relative_eq!(light.position(), vec2(1.32, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_immovable_side_takes_nothing() {
        let contact = Contact {
            normal: vec2(1.0, 0.0),
            penetration: 1.01,
        };
        let mut wall = Body::default();
        let mut ball = body_at(vec2(1.0, 0.0), vec2(-1.0, 0.0));
        let material = ContactMaterial {
            restitution: 0.5,
            friction: 0.0,
        };

        let j = resolver().resolve_collision(&contact, &mut wall, &mut ball, material);
        resolver().resolve_position(&contact, &mut wall, &mut ball);

        assert_relative_eq!(j, 3.0, epsilon = 1e-6);
        assert_relative_eq!(ball.velocity(), vec2(2.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(ball.position(), vec2(1.4, 0.0), epsilon = 1e-6);
        assert_eq!(wall.velocity(), Vec2::zeros());
        assert_eq!(wall.position(), Vec2::zeros());
    }
}
