//! Overlap predicates between primitive shapes
//!
//! All predicates are strict: shapes that merely touch do not overlap.
//! Polygon tests use the separating axis theorem and assume convex input.

use super::primitives::{Circle, Polygon, Rect};
use crate::foundation::math::Vec2Ext;

/// Circle against circle
pub fn circle_circle(a: &Circle, b: &Circle) -> bool {
    let radii = a.radius + b.radius;
    (b.center - a.center).magnitude_squared() < radii * radii
}

/// Rectangle against rectangle
pub fn rect_rect(a: &Rect, b: &Rect) -> bool {
    a.overlaps(b)
}

/// Circle against rectangle
pub fn circle_rect(circle: &Circle, rect: &Rect) -> bool {
    let closest = rect.clamp_point(circle.center);
    (circle.center - closest).magnitude_squared() < circle.radius * circle.radius
}

/// Convex polygon against convex polygon
pub fn polygon_polygon(a: &Polygon, b: &Polygon) -> bool {
    a.axes()
        .iter()
        .chain(b.axes().iter())
        .all(|axis| intervals_overlap(a.project(axis), b.project(axis)))
}

/// Convex polygon against rectangle
pub fn polygon_rect(polygon: &Polygon, rect: &Rect) -> bool {
    rect.overlaps(&polygon.bounds()) && polygon_polygon(polygon, &Polygon::from_rect(rect))
}

/// Circle against convex polygon
pub fn circle_polygon(circle: &Circle, polygon: &Polygon) -> bool {
    let mut axes = polygon.axes();

    // The axis towards the nearest vertex covers the corner regions
    let nearest = polygon.points().iter().min_by(|p, q| {
        let dp = (*p - circle.center).magnitude_squared();
        let dq = (*q - circle.center).magnitude_squared();
        dp.total_cmp(&dq)
    });
    if let Some(axis) = nearest.and_then(|vertex| (vertex - circle.center).try_unit().ok()) {
        axes.push(axis);
    }

    axes.iter().all(|axis| {
        let center = circle.center.dot(axis);
        intervals_overlap(polygon.project(axis), (center - circle.radius, center + circle.radius))
    })
}

#[inline]
fn intervals_overlap((min_a, max_a): (f32, f32), (min_b, max_b): (f32, f32)) -> bool {
    min_a < max_b && min_b < max_a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;

    fn square(x: f32, y: f32, side: f32) -> Polygon {
        Polygon::from_rect(&Rect::from_position_size(vec2(x, y), vec2(side, side)))
    }

    #[test]
    fn test_circle_circle() {
        let a = Circle::new(vec2(0.0, 0.0), 1.0);
        assert!(circle_circle(&a, &Circle::new(vec2(1.5, 0.0), 1.0)));
        // Touching is not overlapping
        assert!(!circle_circle(&a, &Circle::new(vec2(2.0, 0.0), 1.0)));
    }

    #[test]
    fn test_circle_rect_corner_region() {
        let rect = Rect::new(vec2(0.0, 0.0), vec2(10.0, 10.0));
        // Inside the bounding box of the corner but outside the circle reach
        assert!(!circle_rect(&Circle::new(vec2(11.0, 11.0), 1.2), &rect));
        assert!(circle_rect(&Circle::new(vec2(11.0, 11.0), 1.5), &rect));
        assert!(circle_rect(&Circle::new(vec2(5.0, 5.0), 0.5), &rect));
    }

    #[test]
    fn test_polygon_polygon_separating_axis() {
        let a = Polygon::new(vec![vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(0.0, 4.0)]).unwrap();
        // Bounding boxes overlap but the hypotenuse separates them
        let b = square(3.0, 3.0, 2.0);
        assert!(!polygon_polygon(&a, &b));

        let c = square(1.0, 1.0, 2.0);
        assert!(polygon_polygon(&a, &c));
    }

    #[test]
    fn test_polygon_rect() {
        let triangle = Polygon::new(vec![vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(2.0, 3.0)]).unwrap();
        assert!(polygon_rect(&triangle, &Rect::new(vec2(1.0, 1.0), vec2(2.0, 2.0))));
        assert!(!polygon_rect(&triangle, &Rect::new(vec2(5.0, 0.0), vec2(6.0, 1.0))));
    }

    #[test]
    fn test_circle_polygon() {
        let triangle = Polygon::new(vec![vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(0.0, 4.0)]).unwrap();
        assert!(circle_polygon(&Circle::new(vec2(1.0, 1.0), 0.5), &triangle));
        assert!(!circle_polygon(&Circle::new(vec2(4.0, 4.0), 1.0), &triangle));
        assert!(!circle_polygon(&Circle::new(vec2(-1.0, -1.0), 1.0), &triangle));
    }
}
