pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// Unit vector for an angle measured counter-clockwise from positive x.
pub fn unit_vector(rad: f64) -> Vector {
    vector(rad.cos(), rad.sin())
}

/// Rotates `v` by 90 degrees counter-clockwise.
pub fn rotate90_ccw(v: Vector) -> Vector {
    vector(-v.y, v.x)
}

/// Rotates `v` by 90 degrees clockwise.
pub fn rotate90_cw(v: Vector) -> Vector {
    vector(v.y, -v.x)
}

/// Rotates `v` by an arbitrary angle (counter-clockwise, radians).
pub fn rotate(v: Vector, rad: f64) -> Vector {
    let (sin, cos) = rad.sin_cos();
    vector(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotates `p` around `pivot` by `rad` (counter-clockwise).
pub fn rotate_around(p: Point, pivot: Point, rad: f64) -> Point {
    pivot + rotate(p - pivot, rad)
}

/// Angle of `v` in radians, counter-clockwise from positive x.
pub fn slope(v: Vector) -> f64 {
    v.y.atan2(v.x)
}
