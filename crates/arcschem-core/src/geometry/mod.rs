//! Planar geometry: tolerances, circles, lines, curves and their
//! intersections.

mod curve;
mod intersect;

pub use curve::Curve;
pub use intersect::{Intersections, intersect, intersect_circle, intersect_support};

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Absolute tolerance for every geometric comparison.
pub const EPS: f64 = 1e-6;

/// A circle, also used as a disk when testing containment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center point.
    pub center: Point,
    /// Radius, never negative.
    pub radius: f64,
}

impl Circle {
    /// Create a circle.
    #[must_use]
    pub const fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// The circle having segment `a`–`b` as diameter.
    #[must_use]
    pub fn with_diameter(a: Point, b: Point) -> Self {
        Self::new(a.lerp(b, 0.5), a.distance(b) / 2.0)
    }

    /// The unique circle through three points, or `None` if they are
    /// collinear.
    #[must_use]
    pub fn through(a: Point, b: Point, c: Point) -> Option<Self> {
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * ab.cross(ac);
        if d.abs() < EPS * EPS {
            return None;
        }
        let ab2 = ab.dot(ab);
        let ac2 = ac.dot(ac);
        let offset = Point::new(
            ac.y.mul_add(ab2, -(ab.y * ac2)) / d,
            ab.x.mul_add(ac2, -(ac.x * ab2)) / d,
        );
        let center = a + offset;
        Some(Self::new(center, center.distance(a)))
    }

    /// Whether `p` lies in the closed disk, with [`EPS`] slack.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius + EPS
    }

    /// Distance from `p` to the circle's boundary.
    #[must_use]
    pub fn distance_to(&self, p: Point) -> f64 {
        (self.center.distance(p) - self.radius).abs()
    }

    /// Closest boundary point to `p`. For `p` at the center this picks
    /// the topmost point.
    #[must_use]
    pub fn closest_point(&self, p: Point) -> Point {
        let dir = p - self.center;
        if dir.length() < EPS {
            self.center + Point::new(0.0, self.radius)
        } else {
            self.center + dir.normalized() * self.radius
        }
    }
}

/// An infinite line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Any point on the line.
    pub through: Point,
    /// Direction, not necessarily unit length. Never zero for lines built
    /// from distinct points.
    pub direction: Point,
}

impl Line {
    /// The line through two points.
    #[must_use]
    pub fn through_points(a: Point, b: Point) -> Self {
        Self {
            through: a,
            direction: b - a,
        }
    }

    /// The line through `p` perpendicular to `direction`.
    #[must_use]
    pub const fn perpendicular_at(p: Point, direction: Point) -> Self {
        Self {
            through: p,
            direction: direction.rotated_ccw90(),
        }
    }

    /// Orthogonal projection of `p` onto the line.
    #[must_use]
    pub fn project(&self, p: Point) -> Point {
        let len2 = self.direction.dot(self.direction);
        if len2 == 0.0 {
            return self.through;
        }
        let t = (p - self.through).dot(self.direction) / len2;
        self.through + self.direction * t
    }

    /// Distance from `p` to the line.
    #[must_use]
    pub fn distance_to(&self, p: Point) -> f64 {
        self.project(p).distance(p)
    }
}

/// The infinite support of a curve: the line carrying a segment or the
/// circle carrying an arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Support {
    /// Supporting line.
    Line(Line),
    /// Supporting circle.
    Circle(Circle),
}
