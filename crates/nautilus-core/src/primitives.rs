//! Drawable curve primitives.
//!
//! A [`Curve`] carries its primitives plus travel-direction anchors: the
//! start anchor points along the curve at its first point, the end anchor
//! points along the curve at its last point (into the target).

use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::circle::Circle;
use crate::geom::{Point, rotate90_ccw, rotate90_cw, unit_vector};
use crate::radial::{ArcDirection, forward_rad, position_on_circle_at_rad};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Line {
        from: Point,
        to: Point,
    },
    Arc {
        center: Point,
        radius: f64,
        start_rad: f64,
        end_rad: f64,
        direction: ArcDirection,
    },
    Cubic {
        from: Point,
        control1: Point,
        control2: Point,
        to: Point,
    },
}

impl Primitive {
    pub fn reversed(&self) -> Self {
        match *self {
            Primitive::Line { from, to } => Primitive::Line { from: to, to: from },
            Primitive::Arc {
                center,
                radius,
                start_rad,
                end_rad,
                direction,
            } => Primitive::Arc {
                center,
                radius,
                start_rad: end_rad,
                end_rad: start_rad,
                direction: direction.opposite(),
            },
            Primitive::Cubic {
                from,
                control1,
                control2,
                to,
            } => Primitive::Cubic {
                from: to,
                control1: control2,
                control2: control1,
                to: from,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub primitives: Vec<Primitive>,
    pub start: Anchor,
    pub end: Anchor,
}

impl Curve {
    pub fn line(start: Point, end: Point) -> Self {
        let anchor = Anchor::towards(start, end);
        Self {
            primitives: vec![Primitive::Line {
                from: start,
                to: end,
            }],
            start: anchor,
            end: Anchor::new(end, anchor.direction),
        }
    }

    /// Cubic Bezier between two anchors. The control distance is `tension`
    /// times the chord length, measured along each anchor's direction.
    pub fn smooth_spline(start: Anchor, end: Anchor, tension: f64) -> Self {
        let distance = (end.point - start.point).length() * tension;
        Self {
            primitives: vec![Primitive::Cubic {
                from: start.point,
                control1: start.point + start.direction * distance,
                control2: end.point - end.direction * distance,
                to: end.point,
            }],
            start,
            end,
        }
    }

    /// Arc on `circle` from `start_rad` to `end_rad` in the given sweep
    /// direction.
    pub fn arc(circle: Circle, start_rad: f64, end_rad: f64, direction: ArcDirection) -> Self {
        Self {
            primitives: vec![Primitive::Arc {
                center: circle.center,
                radius: circle.radius,
                start_rad,
                end_rad,
                direction,
            }],
            start: arc_anchor(&circle, start_rad, direction),
            end: arc_anchor(&circle, end_rad, direction),
        }
    }

    /// Arc on `lane` that spans the gap between `source` and `target`,
    /// sweeping in `direction`. Of the up-to-four intersection pairs the one
    /// with the smallest sweep is taken, so the arc leaves the source circle
    /// where it faces the target and never re-enters either circle. `None`
    /// when the lane misses one of the circles.
    pub fn arc_between_circles(
        lane: Circle,
        source: &Circle,
        target: &Circle,
        direction: ArcDirection,
    ) -> Option<Self> {
        let source_hits = lane.intersect_circle(source);
        let target_hits = lane.intersect_circle(target);
        if source_hits.is_empty() || target_hits.is_empty() {
            return None;
        }
        let sweep = |start: f64, end: f64| match direction {
            ArcDirection::CounterClockwise => forward_rad(start, end),
            ArcDirection::Clockwise => forward_rad(end, start),
        };
        let mut best: Option<(f64, f64, f64)> = None;
        for s in &source_hits {
            let start = crate::radial::rad_of_point(lane.center, *s);
            for t in &target_hits {
                let end = crate::radial::rad_of_point(lane.center, *t);
                let extent = sweep(start, end);
                if best.map_or(true, |(e, _, _)| extent < e) {
                    best = Some((extent, start, end));
                }
            }
        }
        let (_, start_rad, end_rad) = best?;
        Some(Curve::arc(lane, start_rad, end_rad, direction))
    }

    /// Forward angular extent of an arc curve; zero for other primitives.
    pub fn arc_sweep(&self) -> f64 {
        match self.primitives.first() {
            Some(Primitive::Arc {
                start_rad,
                end_rad,
                direction,
                ..
            }) => match direction {
                ArcDirection::CounterClockwise => forward_rad(*start_rad, *end_rad),
                ArcDirection::Clockwise => forward_rad(*end_rad, *start_rad),
            },
            _ => 0.0,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            primitives: self.primitives.iter().rev().map(Primitive::reversed).collect(),
            start: self.end.reversed(),
            end: self.start.reversed(),
        }
    }

    /// Chains `other` onto this curve. The caller is responsible for the
    /// pieces actually meeting at a shared point.
    pub fn join(mut self, other: Curve) -> Self {
        self.primitives.extend(other.primitives);
        Self {
            primitives: self.primitives,
            start: self.start,
            end: other.end,
        }
    }
}

/// Travel-direction anchor of an arc endpoint: the radial direction rotated
/// a quarter turn with the sweep.
pub fn arc_anchor(circle: &Circle, rad: f64, direction: ArcDirection) -> Anchor {
    let radial = unit_vector(rad);
    let tangent = match direction {
        ArcDirection::CounterClockwise => rotate90_ccw(radial),
        ArcDirection::Clockwise => rotate90_cw(radial),
    };
    Anchor::new(
        position_on_circle_at_rad(rad, circle.radius, circle.center),
        tangent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, vector};
    use std::f64::consts::PI;

    #[test]
    fn spline_controls_follow_anchor_directions() {
        let start = Anchor::new(point(0.0, 0.0), vector(1.0, 0.0));
        let end = Anchor::new(point(10.0, 0.0), vector(1.0, 0.0));
        let curve = Curve::smooth_spline(start, end, 0.4);
        match curve.primitives[0] {
            Primitive::Cubic {
                control1, control2, ..
            } => {
                assert!((control1.x - 4.0).abs() < 1e-9);
                assert!((control2.x - 6.0).abs() < 1e-9);
            }
            _ => panic!("expected a cubic"),
        }
    }

    #[test]
    fn arc_anchors_are_tangent() {
        let circle = Circle::new(point(0.0, 0.0), 2.0);
        let curve = Curve::arc(circle, 0.0, PI / 2.0, ArcDirection::CounterClockwise);
        assert!((curve.start.point.x - 2.0).abs() < 1e-9);
        // Tangent at rad 0 for a counter-clockwise sweep points along +y.
        assert!((curve.start.direction.y - 1.0).abs() < 1e-9);
        assert!((curve.end.point.y - 2.0).abs() < 1e-9);
        assert!((curve.end.direction.x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_swaps_anchors_and_sweep() {
        let circle = Circle::new(point(0.0, 0.0), 1.0);
        let curve = Curve::arc(circle, 0.0, PI, ArcDirection::CounterClockwise);
        let rev = curve.reversed();
        assert_eq!(rev.start.point, curve.end.point);
        assert_eq!(rev.end.point, curve.start.point);
        match rev.primitives[0] {
            Primitive::Arc { direction, .. } => {
                assert_eq!(direction, ArcDirection::Clockwise);
            }
            _ => panic!("expected an arc"),
        }
        assert!((rev.arc_sweep() - PI).abs() < 1e-9);
    }

    #[test]
    fn arc_between_circles_spans_the_gap() {
        let lane = Circle::new(point(0.0, 0.0), 10.0);
        let source = Circle::new(point(10.0, 0.0), 2.0);
        let target = Circle::new(point(0.0, 10.0), 2.0);
        let curve =
            Curve::arc_between_circles(lane, &source, &target, ArcDirection::CounterClockwise)
                .unwrap();
        // Start on the source boundary facing the target, end on the target
        // boundary facing the source; the sweep stays inside the quarter gap.
        assert!(((curve.start.point - source.center).length() - 2.0).abs() < 1e-9);
        assert!(((curve.end.point - target.center).length() - 2.0).abs() < 1e-9);
        assert!(curve.start.point.y > 0.0);
        assert!(curve.end.point.x > 0.0);
        assert!(curve.arc_sweep() < PI / 2.0);
        assert!(curve.arc_sweep() > 0.0);
    }

    #[test]
    fn arc_between_disjoint_circles_is_none() {
        let lane = Circle::new(point(0.0, 0.0), 10.0);
        let near = Circle::new(point(10.0, 0.0), 2.0);
        let far = Circle::new(point(100.0, 0.0), 2.0);
        assert!(
            Curve::arc_between_circles(lane, &near, &far, ArcDirection::Clockwise).is_none()
        );
    }

    #[test]
    fn join_keeps_outer_anchors() {
        let a = Curve::line(point(0.0, 0.0), point(1.0, 0.0));
        let b = Curve::line(point(1.0, 0.0), point(1.0, 1.0));
        let joined = a.clone().join(b.clone());
        assert_eq!(joined.primitives.len(), 2);
        assert_eq!(joined.start, a.start);
        assert_eq!(joined.end, b.end);
    }
}
