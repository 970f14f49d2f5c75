use serde::{Deserialize, Serialize};

use crate::geom::{Point, Vector, slope, unit_vector};

/// A point on a shape boundary together with the direction a curve should
/// leave it in. Directions are kept normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub point: Point,
    pub direction: Vector,
}

impl Anchor {
    pub fn new(point: Point, direction: Vector) -> Self {
        let len = direction.length();
        let direction = if len > f64::EPSILON {
            direction / len
        } else {
            Vector::new(1.0, 0.0)
        };
        Self { point, direction }
    }

    pub fn at_angle(point: Point, rad: f64) -> Self {
        Self {
            point,
            direction: unit_vector(rad),
        }
    }

    /// Anchor at `from` pointing towards `to`.
    pub fn towards(from: Point, to: Point) -> Self {
        Self::new(from, to - from)
    }

    /// Same direction, point moved `distance` along it.
    pub fn moved(&self, distance: f64) -> Self {
        Self {
            point: self.point + self.direction * distance,
            direction: self.direction,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            point: self.point,
            direction: -self.direction,
        }
    }

    pub fn point_in_direction(&self, distance: f64) -> Point {
        self.point + self.direction * distance
    }

    /// Angle of the direction, counter-clockwise from positive x.
    pub fn direction_rad(&self) -> f64 {
        slope(self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, vector};

    #[test]
    fn direction_is_normalized() {
        let a = Anchor::new(point(0.0, 0.0), vector(3.0, 4.0));
        assert!((a.direction.length() - 1.0).abs() < 1e-12);
        assert!((a.direction.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn moved_advances_along_direction() {
        let a = Anchor::new(point(1.0, 1.0), vector(0.0, 2.0));
        let b = a.moved(3.0);
        assert!((b.point.y - 4.0).abs() < 1e-12);
        assert_eq!(b.direction, a.direction);
    }

    #[test]
    fn reversed_flips_direction_only() {
        let a = Anchor::new(point(1.0, 0.0), vector(1.0, 0.0));
        let r = a.reversed();
        assert_eq!(r.point, a.point);
        assert!((r.direction.x + 1.0).abs() < 1e-12);
    }
}
