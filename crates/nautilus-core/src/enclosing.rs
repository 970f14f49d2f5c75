//! Minimum enclosing circle (Welzl's algorithm).
//!
//! Runs on the given point order without shuffling so repeated layouts of the
//! same graph produce identical results.

use crate::circle::Circle;
use crate::geom::{Point, point};

const EPSILON: f64 = 1e-9;

pub fn minimum_enclosing_circle(points: &[Point]) -> Circle {
    match points {
        [] => Circle::new(point(0.0, 0.0), 0.0),
        [p] => Circle::new(*p, 0.0),
        _ => {
            let mut circle = circle_from_two(points[0], points[1]);
            for (i, &p) in points.iter().enumerate().skip(2) {
                if !contains(&circle, p) {
                    circle = circle_with_point(&points[..i], p);
                }
            }
            circle
        }
    }
}

fn circle_with_point(points: &[Point], p: Point) -> Circle {
    let mut circle = circle_from_two(points[0], p);
    for (i, &q) in points.iter().enumerate().skip(1) {
        if !contains(&circle, q) {
            circle = circle_with_two_points(&points[..i], p, q);
        }
    }
    circle
}

fn circle_with_two_points(points: &[Point], p: Point, q: Point) -> Circle {
    let mut circle = circle_from_two(p, q);
    for &r in points {
        if !contains(&circle, r) {
            circle = circumcircle(p, q, r);
        }
    }
    circle
}

fn contains(circle: &Circle, p: Point) -> bool {
    (p - circle.center).length() <= circle.radius + EPSILON
}

fn circle_from_two(a: Point, b: Point) -> Circle {
    let center = point((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    Circle::new(center, (b - a).length() / 2.0)
}

fn circumcircle(a: Point, b: Point, c: Point) -> Circle {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < EPSILON {
        // Collinear: fall back to the widest pair.
        let ab = circle_from_two(a, b);
        let ac = circle_from_two(a, c);
        let bc = circle_from_two(b, c);
        let mut widest = ab;
        for candidate in [ac, bc] {
            if candidate.radius > widest.radius {
                widest = candidate;
            }
        }
        return widest;
    }
    let a_sq = a.x * a.x + a.y * a.y;
    let b_sq = b.x * b.x + b.y * b.y;
    let c_sq = c.x * c.x + c.y * c.y;
    let ux = (a_sq * (b.y - c.y) + b_sq * (c.y - a.y) + c_sq * (a.y - b.y)) / d;
    let uy = (a_sq * (c.x - b.x) + b_sq * (a.x - c.x) + c_sq * (b.x - a.x)) / d;
    let center = point(ux, uy);
    Circle::new(center, (a - center).length())
}
