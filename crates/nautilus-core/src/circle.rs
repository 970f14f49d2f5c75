use serde::{Deserialize, Serialize};

use crate::geom::{Point, Vector, point};

const EPSILON: f64 = 1e-9;

/// A circle in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn with_radius(&self, radius: f64) -> Self {
        Self {
            center: self.center,
            radius,
        }
    }

    pub fn with_center(&self, center: Point) -> Self {
        Self {
            center,
            radius: self.radius,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        self.with_radius(self.radius * factor)
    }

    pub fn translated(&self, v: Vector) -> Self {
        self.with_center(self.center + v)
    }

    pub fn contains_point(&self, p: Point) -> bool {
        (p - self.center).length() <= self.radius + EPSILON
    }

    /// Closest point on the circle boundary to `p`. Falls back to the
    /// rightmost boundary point when `p` coincides with the center.
    pub fn closest_boundary_point(&self, p: Point) -> Point {
        let v = p - self.center;
        let len = v.length();
        if len < EPSILON {
            return point(self.center.x + self.radius, self.center.y);
        }
        self.center + v * (self.radius / len)
    }

    /// Intersection points with another circle. Tangency yields a single
    /// point; disjoint or concentric circles yield none.
    pub fn intersect_circle(&self, other: &Circle) -> Vec<Point> {
        let delta = other.center - self.center;
        let d = delta.length();
        if d < EPSILON {
            return Vec::new();
        }
        if d > self.radius + other.radius + EPSILON {
            return Vec::new();
        }
        if d < (self.radius - other.radius).abs() - EPSILON {
            return Vec::new();
        }
        let a = (self.radius * self.radius - other.radius * other.radius + d * d) / (2.0 * d);
        let h_sq = self.radius * self.radius - a * a;
        let base = self.center + delta * (a / d);
        if h_sq < EPSILON {
            return vec![base];
        }
        let h = h_sq.sqrt();
        let perp = Vector::new(-delta.y, delta.x) * (h / d);
        vec![base + perp, base - perp]
    }

    /// Intersection points with the segment from `a` to `b`.
    pub fn intersect_segment(&self, a: Point, b: Point) -> Vec<Point> {
        self.intersect_parametric(a, b, true)
    }

    /// Intersection points with the infinite line through `a` and `b`.
    pub fn intersect_line(&self, a: Point, b: Point) -> Vec<Point> {
        self.intersect_parametric(a, b, false)
    }

    fn intersect_parametric(&self, a: Point, b: Point, clamp: bool) -> Vec<Point> {
        let d = b - a;
        let f = a - self.center;
        let qa = d.dot(d);
        if qa < EPSILON {
            return Vec::new();
        }
        let qb = 2.0 * f.dot(d);
        let qc = f.dot(f) - self.radius * self.radius;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return Vec::new();
        }
        let sqrt_disc = disc.sqrt();
        let mut out = Vec::new();
        for t in [(-qb - sqrt_disc) / (2.0 * qa), (-qb + sqrt_disc) / (2.0 * qa)] {
            if clamp && !(-EPSILON..=1.0 + EPSILON).contains(&t) {
                continue;
            }
            let p = a + d * t;
            if !out
                .iter()
                .any(|q: &Point| (*q - p).length() < EPSILON)
            {
                out.push(p);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_overlapping_circles_intersect_in_two_points() {
        let a = Circle::new(point(0.0, 0.0), 2.0);
        let b = Circle::new(point(2.0, 0.0), 2.0);
        let pts = a.intersect_circle(&b);
        assert_eq!(pts.len(), 2);
        for p in pts {
            assert!((p.x - 1.0).abs() < 1e-9);
            assert!(((p - a.center).length() - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn tangent_circles_intersect_in_one_point() {
        let a = Circle::new(point(0.0, 0.0), 1.0);
        let b = Circle::new(point(2.0, 0.0), 1.0);
        let pts = a.intersect_circle(&b);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn segment_through_center_hits_both_sides() {
        let c = Circle::new(point(0.0, 0.0), 1.0);
        let pts = c.intersect_segment(point(-2.0, 0.0), point(2.0, 0.0));
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn segment_ending_inside_hits_once() {
        let c = Circle::new(point(0.0, 0.0), 1.0);
        let pts = c.intersect_segment(point(-2.0, 0.0), point(0.0, 0.0));
        assert_eq!(pts.len(), 1);
        assert!((pts[0].x + 1.0).abs() < 1e-9);
    }
}
