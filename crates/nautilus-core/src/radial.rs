//! Angle arithmetic on circles.
//!
//! Angles ("rads") are measured counter-clockwise from positive x and kept
//! normalized to `[0, 2*PI)`. "Forward" always means the direction of
//! increasing angle.

use std::f64::consts::{PI, TAU};

use crate::anchor::Anchor;
use crate::circle::Circle;
use crate::geom::{Point, rotate90_ccw, slope, unit_vector};

/// Sweep direction of an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

impl ArcDirection {
    pub fn opposite(self) -> Self {
        match self {
            ArcDirection::Clockwise => ArcDirection::CounterClockwise,
            ArcDirection::CounterClockwise => ArcDirection::Clockwise,
        }
    }
}

/// How [`put_rad_between`] resolves an angle outside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadClamp {
    /// Snap to whichever range end is angularly closer.
    Closer,
    /// Snap to the start of the range.
    TowardStart,
    /// Snap to the end of the range.
    TowardEnd,
}

pub fn normalize_rad(rad: f64) -> f64 {
    let r = rad % TAU;
    if r < 0.0 { r + TAU } else { r }
}

/// Angular distance walked forward from `start` to `end`, in `[0, 2*PI)`.
pub fn forward_rad(start: f64, end: f64) -> f64 {
    let diff = end - start;
    if diff < 0.0 {
        normalize_rad(diff)
    } else {
        diff % TAU
    }
}

/// Angle of `p` as seen from `center`.
pub fn rad_of_point(center: Point, p: Point) -> f64 {
    normalize_rad(slope(p - center))
}

pub fn position_on_circle_at_rad(rad: f64, radius: f64, center: Point) -> Point {
    center + unit_vector(rad) * radius
}

/// True when walking forward from `start` reaches `rad` no later than `end`.
pub fn rad_is_between(rad: f64, start: f64, end: f64) -> bool {
    forward_rad(start, rad) <= forward_rad(start, end)
}

/// Middle of the forward range from `start` to `end`.
pub fn middle_rad(start: f64, end: f64) -> f64 {
    normalize_rad(start + forward_rad(start, end) / 2.0)
}

/// True when `rad` lies after `other` relative to `reference`, i.e. walking
/// forward from `other` hits `rad` before it hits `reference`.
pub fn rad_comes_after(rad: f64, other: f64, reference: f64) -> bool {
    forward_rad(other, rad) < forward_rad(other, reference)
}

/// Keeps `rad` when it already lies in the forward range, otherwise snaps it
/// to a range end according to `clamp`.
pub fn put_rad_between(rad: f64, start: f64, end: f64, clamp: RadClamp) -> f64 {
    if rad_is_between(rad, start, end) {
        return normalize_rad(rad);
    }
    match clamp {
        RadClamp::TowardStart => normalize_rad(start),
        RadClamp::TowardEnd => normalize_rad(end),
        RadClamp::Closer => {
            let past_end = forward_rad(end, rad);
            let before_start = forward_rad(rad, start);
            if past_end < before_start {
                normalize_rad(end)
            } else {
                normalize_rad(start)
            }
        }
    }
}

/// Touch points of the two tangent lines from `p` to `circle`, or `None`
/// when `p` is on or inside the circle. The points are returned at
/// `base - alpha` and `base + alpha` where `base` is the angle of `p` seen
/// from the circle center.
pub fn tangents_from_point(circle: &Circle, p: Point) -> Option<(Point, Point)> {
    let v = p - circle.center;
    let d = v.length();
    if d <= circle.radius {
        return None;
    }
    let base = normalize_rad(slope(v));
    let alpha = (circle.radius / d).acos();
    Some((
        position_on_circle_at_rad(base - alpha, circle.radius, circle.center),
        position_on_circle_at_rad(base + alpha, circle.radius, circle.center),
    ))
}

/// Circle through `p` that is tangent to `anchor` at its point. `None` when
/// `p` lies on the tangent line itself.
pub fn circle_from_point_and_tangent_anchor(p: Point, anchor: &Anchor) -> Option<Circle> {
    let normal = rotate90_ccw(anchor.direction);
    let w = p - anchor.point;
    let denom = 2.0 * normal.dot(w);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = w.dot(w) / denom;
    Some(Circle::new(anchor.point + normal * t, t.abs()))
}

/// Whether an anchor runs clockwise or counter-clockwise around the circle
/// it sits on.
pub fn anchor_direction_on_circle(anchor: &Anchor, center: Point) -> ArcDirection {
    let radial = anchor.point - center;
    if radial.x * anchor.direction.y - radial.y * anchor.direction.x >= 0.0 {
        ArcDirection::CounterClockwise
    } else {
        ArcDirection::Clockwise
    }
}

pub fn closest_point_to(points: &[Point], target: Point) -> Option<Point> {
    points
        .iter()
        .copied()
        .min_by(|a, b| {
            (*a - target)
                .length()
                .total_cmp(&(*b - target).length())
        })
}

pub fn furthest_point_to(points: &[Point], target: Point) -> Option<Point> {
    points
        .iter()
        .copied()
        .max_by(|a, b| {
            (*a - target)
                .length()
                .total_cmp(&(*b - target).length())
        })
}

/// True when the forward distance from `start` to `end` is below half a turn,
/// i.e. the forward walk is the short way around.
pub fn forward_is_short(start: f64, end: f64) -> bool {
    forward_rad(start, end) < PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, vector};

    #[test]
    fn normalize_wraps_negative_angles() {
        assert!((normalize_rad(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-12);
        assert!((normalize_rad(TAU + 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn forward_rad_is_directed() {
        assert!((forward_rad(0.0, PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((forward_rad(PI / 2.0, 0.0) - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn rad_is_between_respects_wraparound() {
        assert!(rad_is_between(0.1, 6.0, 1.0));
        assert!(!rad_is_between(3.0, 6.0, 1.0));
    }

    #[test]
    fn put_rad_between_keeps_inside_values() {
        let r = put_rad_between(0.5, 0.0, 1.0, RadClamp::Closer);
        assert!((r - 0.5).abs() < 1e-12);
    }

    #[test]
    fn put_rad_between_clamps_outside_values() {
        assert!((put_rad_between(2.0, 0.0, 1.0, RadClamp::TowardEnd) - 1.0).abs() < 1e-12);
        assert!((put_rad_between(2.0, 0.0, 1.0, RadClamp::TowardStart) - 0.0).abs() < 1e-12);
        // 2.0 is angularly closer to the end (1.0) than to the start (0.0).
        assert!((put_rad_between(2.0, 0.0, 1.0, RadClamp::Closer) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tangents_straddle_the_center_line() {
        let c = Circle::new(point(0.0, 0.0), 1.0);
        let (a, b) = tangents_from_point(&c, point(2.0, 0.0)).unwrap();
        assert!((a.y + b.y).abs() < 1e-9);
        assert!((a.x - b.x).abs() < 1e-9);
        assert!(((a - c.center).length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tangent_from_inside_is_none() {
        let c = Circle::new(point(0.0, 0.0), 2.0);
        assert!(tangents_from_point(&c, point(1.0, 0.0)).is_none());
    }

    #[test]
    fn tangent_circle_passes_through_both_constraints() {
        let anchor = Anchor::new(point(0.0, 0.0), vector(1.0, 0.0));
        let p = point(0.0, 2.0);
        let c = circle_from_point_and_tangent_anchor(p, &anchor).unwrap();
        assert!(((c.center - anchor.point).length() - c.radius).abs() < 1e-9);
        assert!(((p - c.center).length() - c.radius).abs() < 1e-9);
        // Tangency: the center sits on the normal of the anchor.
        assert!(c.center.x.abs() < 1e-9);
    }

    #[test]
    fn rad_comes_after_orders_around_reference() {
        assert!(rad_comes_after(1.0, 0.5, 2.0));
        assert!(!rad_comes_after(3.0, 0.5, 2.0));
    }
}
