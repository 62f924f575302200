use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::{Circle, EPS, Line, Support};
use crate::types::Point;

/// The geometry of a stroke arc: a straight segment, a circular arc, or
/// a full circle anchored at one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    /// Straight segment from `start` to `end`.
    Segment {
        /// First endpoint.
        start: Point,
        /// Last endpoint.
        end: Point,
    },
    /// Circular arc from `start` to `end` around `center`.
    Arc {
        /// Circle center.
        center: Point,
        /// First endpoint, on the circle.
        start: Point,
        /// Last endpoint, at the same distance from `center` as `start`.
        end: Point,
        /// Travel direction.
        clockwise: bool,
    },
    /// Complete circle starting and ending at `point`.
    FullCircle {
        /// Circle center.
        center: Point,
        /// Anchor point where the circle starts and ends.
        point: Point,
        /// Travel direction.
        clockwise: bool,
    },
}

impl Curve {
    /// The arc leaving `start` with direction `tangent` and ending at
    /// `end`; a segment when the tangent points at `end`.
    #[must_use]
    pub fn from_start_tangent(start: Point, tangent: Point, end: Point) -> Self {
        let d = end - start;
        let normal = tangent.rotated_ccw90();
        let denom = 2.0 * normal.dot(d);
        if denom.abs() < EPS * EPS || tangent.length() < EPS {
            return Self::Segment { start, end };
        }
        let lambda = d.dot(d) / denom;
        if !lambda.is_finite() || lambda.abs() * tangent.length() > 1e12 {
            return Self::Segment { start, end };
        }
        Self::Arc {
            center: start + normal * lambda,
            start,
            end,
            clockwise: lambda < 0.0,
        }
    }

    /// The arc from `start` through `via` to `end`.
    ///
    /// Collinear input yields a segment when `via` lies between `start`
    /// and `end`, and `None` otherwise.
    #[must_use]
    pub fn through_point(start: Point, via: Point, end: Point) -> Option<Self> {
        match Circle::through(start, via, end) {
            Some(circle) => Some(Self::Arc {
                center: circle.center,
                start,
                end,
                clockwise: (via - start).cross(end - start) < 0.0,
            }),
            None => {
                let d = end - start;
                let t = (via - start).dot(d) / d.dot(d);
                (d.dot(d) > 0.0 && (-EPS..=1.0 + EPS).contains(&t))
                    .then_some(Self::Segment { start, end })
            }
        }
    }

    /// First point.
    #[must_use]
    pub const fn start(&self) -> Point {
        match *self {
            Self::Segment { start, .. } | Self::Arc { start, .. } => start,
            Self::FullCircle { point, .. } => point,
        }
    }

    /// Last point.
    #[must_use]
    pub const fn end(&self) -> Point {
        match *self {
            Self::Segment { end, .. } | Self::Arc { end, .. } => end,
            Self::FullCircle { point, .. } => point,
        }
    }

    /// Circle center, `None` for segments.
    #[must_use]
    pub const fn center(&self) -> Option<Point> {
        match *self {
            Self::Segment { .. } => None,
            Self::Arc { center, .. } | Self::FullCircle { center, .. } => Some(center),
        }
    }

    /// Circle radius, `None` for segments.
    #[must_use]
    pub fn radius(&self) -> Option<f64> {
        self.center().map(|c| c.distance(self.start()))
    }

    /// Travel direction, `false` for segments.
    #[must_use]
    pub const fn is_clockwise(&self) -> bool {
        match *self {
            Self::Segment { .. } => false,
            Self::Arc { clockwise, .. } | Self::FullCircle { clockwise, .. } => clockwise,
        }
    }

    /// Whether this is a straight segment.
    #[must_use]
    pub const fn is_straight(&self) -> bool {
        matches!(self, Self::Segment { .. })
    }

    /// Signed central angle: positive counterclockwise, `±2π` for full
    /// circles, 0 for segments.
    #[must_use]
    pub fn central_angle(&self) -> f64 {
        match *self {
            Self::Segment { .. } => 0.0,
            Self::Arc {
                center,
                start,
                end,
                clockwise,
            } => {
                if clockwise {
                    -(start - center).cw_angle_to(end - center)
                } else {
                    (start - center).ccw_angle_to(end - center)
                }
            }
            Self::FullCircle { clockwise, .. } => {
                if clockwise {
                    -TAU
                } else {
                    TAU
                }
            }
        }
    }

    /// Length along the curve.
    #[must_use]
    pub fn length(&self) -> f64 {
        match *self {
            Self::Segment { start, end } => start.distance(end),
            _ => self.central_angle().abs() * self.radius().unwrap_or(0.0),
        }
    }

    /// Point at fraction `t` of the way along the curve.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        match *self {
            Self::Segment { start, end } => start.lerp(end, t),
            Self::Arc { center, start, .. } | Self::FullCircle {
                center,
                point: start,
                ..
            } => center + (start - center).rotated(self.central_angle() * t),
        }
    }

    /// Direction of travel at the start.
    #[must_use]
    pub fn start_tangent(&self) -> Point {
        self.tangent_at(self.start())
    }

    /// Direction of travel at the end.
    #[must_use]
    pub fn end_tangent(&self) -> Point {
        self.tangent_at(self.end())
    }

    /// Direction of travel at `p`, which is assumed to lie on the curve.
    #[must_use]
    pub fn tangent_at(&self, p: Point) -> Point {
        match *self {
            Self::Segment { start, end } => end - start,
            Self::Arc {
                center, clockwise, ..
            }
            | Self::FullCircle {
                center, clockwise, ..
            } => {
                let arm = p - center;
                if clockwise {
                    arm.rotated_cw90()
                } else {
                    arm.rotated_ccw90()
                }
            }
        }
    }

    /// Whether the direction from the center to `p` falls within the
    /// angular range swept by the curve. Segments test the projection
    /// onto the segment instead.
    #[must_use]
    pub fn in_range(&self, p: Point) -> bool {
        match *self {
            Self::Segment { start, end } => {
                let d = end - start;
                let len2 = d.dot(d);
                if len2 == 0.0 {
                    return p.distance(start) < EPS;
                }
                let len = len2.sqrt();
                let t = (p - start).dot(d) / len2;
                t >= -EPS / len && t <= 1.0 + EPS / len
            }
            Self::Arc {
                center, start, end, ..
            } => {
                if p.distance(start) < EPS || p.distance(end) < EPS {
                    return true;
                }
                let arm = p - center;
                if arm.length() < EPS {
                    return false;
                }
                let sweep = self.central_angle().abs();
                let angle = if self.is_clockwise() {
                    (start - center).cw_angle_to(arm)
                } else {
                    (start - center).ccw_angle_to(arm)
                };
                let slack = EPS / self.radius().unwrap_or(1.0).max(EPS);
                angle <= sweep + slack || angle >= TAU - slack
            }
            Self::FullCircle { .. } => true,
        }
    }

    /// Closest point on the curve to `p`.
    #[must_use]
    pub fn closest_point(&self, p: Point) -> Point {
        match *self {
            Self::Segment { start, end } => {
                let d = end - start;
                let len2 = d.dot(d);
                if len2 == 0.0 {
                    return start;
                }
                let t = ((p - start).dot(d) / len2).clamp(0.0, 1.0);
                start.lerp(end, t)
            }
            Self::Arc {
                center, start, end, ..
            } => {
                let radius = center.distance(start);
                if p.distance(center) < EPS {
                    return start;
                }
                if self.in_range(p) {
                    center + (p - center).normalized() * radius
                } else if p.distance_squared(start) <= p.distance_squared(end) {
                    start
                } else {
                    end
                }
            }
            Self::FullCircle { center, point, .. } => {
                if p.distance(center) < EPS {
                    point
                } else {
                    center + (p - center).normalized() * center.distance(point)
                }
            }
        }
    }

    /// Distance from `p` to the curve.
    #[must_use]
    pub fn distance_to(&self, p: Point) -> f64 {
        self.closest_point(p).distance(p)
    }

    /// Length along the curve between `p` and the start (when
    /// `from_start`) or between `p` and the end. The measurement follows
    /// the curve's travel direction on its support, so points outside
    /// the curve produce lengths exceeding [`length`](Self::length).
    #[must_use]
    pub fn distance_along(&self, p: Point, from_start: bool) -> f64 {
        match *self {
            Self::Segment { start, end } => {
                if from_start {
                    start.distance(p)
                } else {
                    end.distance(p)
                }
            }
            Self::Arc {
                center,
                start,
                end,
                clockwise,
            } => {
                let piece = if from_start {
                    Self::Arc {
                        center,
                        start,
                        end: p,
                        clockwise,
                    }
                } else {
                    Self::Arc {
                        center,
                        start: p,
                        end,
                        clockwise,
                    }
                };
                piece.central_angle().abs() * center.distance(start)
            }
            Self::FullCircle {
                center,
                point,
                clockwise,
            } => {
                let piece = if from_start {
                    Self::Arc {
                        center,
                        start: point,
                        end: p,
                        clockwise,
                    }
                } else {
                    Self::Arc {
                        center,
                        start: p,
                        end: point,
                        clockwise,
                    }
                };
                piece.central_angle().abs() * center.distance(point)
            }
        }
    }

    /// Same support and orientation, new endpoints.
    #[must_use]
    pub const fn with_endpoints(&self, start: Point, end: Point) -> Self {
        match *self {
            Self::Segment { .. } => Self::Segment { start, end },
            Self::Arc {
                center, clockwise, ..
            }
            | Self::FullCircle {
                center, clockwise, ..
            } => Self::Arc {
                center,
                start,
                end,
                clockwise,
            },
        }
    }

    /// The infinite line or circle carrying this curve.
    #[must_use]
    pub fn support(&self) -> Support {
        match *self {
            Self::Segment { start, end } => Support::Line(Line::through_points(start, end)),
            Self::Arc { center, start, .. } | Self::FullCircle {
                center,
                point: start,
                ..
            } => Support::Circle(Circle::new(center, center.distance(start))),
        }
    }

    /// Sample the curve: the start, `extra` evenly spaced interior
    /// points, then the end.
    #[must_use]
    pub fn sample(&self, extra: usize) -> Vec<Point> {
        let mut points = Vec::with_capacity(extra + 2);
        points.push(self.start());
        #[allow(clippy::cast_precision_loss)]
        let divisions = (extra + 1) as f64;
        for k in 1..=extra {
            #[allow(clippy::cast_precision_loss)]
            points.push(self.point_at(k as f64 / divisions));
        }
        points.push(self.end());
        points
    }
}
