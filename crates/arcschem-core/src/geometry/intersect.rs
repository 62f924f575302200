use super::{Circle, Curve, EPS, Line, Support};
use crate::types::Point;

/// Result of intersecting two shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersections {
    /// Finitely many crossing or touching points.
    Points(Vec<Point>),
    /// The shapes share a piece of positive length.
    Overlap,
}

impl Intersections {
    /// No contact at all. An overlap is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Points(points) if points.is_empty())
    }

    /// Whether the shapes overlap.
    #[must_use]
    pub const fn is_overlap(&self) -> bool {
        matches!(self, Self::Overlap)
    }

    /// The isolated intersection points; empty for an overlap.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        match self {
            Self::Points(points) => points,
            Self::Overlap => &[],
        }
    }

    /// Consume into the isolated points, `None` for an overlap.
    #[must_use]
    pub fn into_points(self) -> Option<Vec<Point>> {
        match self {
            Self::Points(points) => Some(points),
            Self::Overlap => None,
        }
    }
}

/// Raw intersection of two infinite supports.
enum SupportContact {
    Points(Vec<Point>),
    Coincident,
}

fn line_line(a: &Line, b: &Line) -> SupportContact {
    let denom = a.direction.cross(b.direction);
    let scale = a.direction.length() * b.direction.length();
    if denom.abs() <= scale * 1e-12 {
        if a.distance_to(b.through) < EPS {
            return SupportContact::Coincident;
        }
        return SupportContact::Points(Vec::new());
    }
    let t = (b.through - a.through).cross(b.direction) / denom;
    SupportContact::Points(vec![a.through + a.direction * t])
}

fn line_circle(line: &Line, circle: &Circle) -> SupportContact {
    let foot = line.project(circle.center);
    let h = foot.distance(circle.center);
    if h > circle.radius + EPS {
        return SupportContact::Points(Vec::new());
    }
    let offset = circle
        .radius
        .mul_add(circle.radius, -(h * h))
        .max(0.0)
        .sqrt();
    if offset < EPS {
        return SupportContact::Points(vec![foot]);
    }
    let u = line.direction.normalized();
    SupportContact::Points(vec![foot - u * offset, foot + u * offset])
}

fn circle_circle(a: &Circle, b: &Circle) -> SupportContact {
    let d = a.center.distance(b.center);
    if d < EPS {
        if (a.radius - b.radius).abs() < EPS {
            return SupportContact::Coincident;
        }
        return SupportContact::Points(Vec::new());
    }
    if d > a.radius + b.radius + EPS || d < (a.radius - b.radius).abs() - EPS {
        return SupportContact::Points(Vec::new());
    }
    let along = (a.radius.mul_add(a.radius, -(b.radius * b.radius)) + d * d) / (2.0 * d);
    let h = a.radius.mul_add(a.radius, -(along * along)).max(0.0).sqrt();
    let u = (b.center - a.center) * (1.0 / d);
    let base = a.center + u * along;
    if h < EPS {
        return SupportContact::Points(vec![base]);
    }
    let n = u.rotated_ccw90();
    SupportContact::Points(vec![base + n * h, base - n * h])
}

fn supports(a: &Support, b: &Support) -> SupportContact {
    match (a, b) {
        (Support::Line(la), Support::Line(lb)) => line_line(la, lb),
        (Support::Line(l), Support::Circle(c)) | (Support::Circle(c), Support::Line(l)) => {
            line_circle(l, c)
        }
        (Support::Circle(ca), Support::Circle(cb)) => circle_circle(ca, cb),
    }
}

fn push_unique(points: &mut Vec<Point>, p: Point) {
    if !points.iter().any(|q| q.distance(p) < EPS) {
        points.push(p);
    }
}

fn is_endpoint(curve: &Curve, p: Point) -> bool {
    p.distance(curve.start()) < EPS || p.distance(curve.end()) < EPS
}

fn is_interior(curve: &Curve, p: Point) -> bool {
    curve.in_range(p) && !is_endpoint(curve, p)
}

/// Two curves on the same support: positive-length overlap or shared
/// endpoints.
fn common_support(a: &Curve, b: &Curve) -> Intersections {
    match (a, b) {
        (Curve::FullCircle { .. }, _) | (_, Curve::FullCircle { .. }) => Intersections::Overlap,
        (Curve::Segment { start, end }, Curve::Segment { .. }) => {
            let d = *end - *start;
            let len2 = d.dot(d);
            if len2 == 0.0 {
                return Intersections::Points(Vec::new());
            }
            let tol = EPS / len2.sqrt();
            let t1 = (b.start() - *start).dot(d) / len2;
            let t2 = (b.end() - *start).dot(d) / len2;
            let lo = t1.min(t2).max(0.0);
            let hi = t1.max(t2).min(1.0);
            if hi - lo > tol {
                Intersections::Overlap
            } else if hi - lo >= -tol {
                Intersections::Points(vec![start.lerp(*end, lo.midpoint(hi))])
            } else {
                Intersections::Points(Vec::new())
            }
        }
        _ => {
            if a.in_range(b.point_at(0.5))
                || b.in_range(a.point_at(0.5))
                || is_interior(a, b.start())
                || is_interior(a, b.end())
                || is_interior(b, a.start())
                || is_interior(b, a.end())
            {
                return Intersections::Overlap;
            }
            let mut points = Vec::new();
            for p in [a.start(), a.end()] {
                if b.in_range(p) {
                    push_unique(&mut points, p);
                }
            }
            Intersections::Points(points)
        }
    }
}

/// Intersect two curves.
///
/// With `closed == false` intersections within [`EPS`] of an endpoint of
/// either curve are dropped.
#[must_use]
pub fn intersect(a: &Curve, b: &Curve, closed: bool) -> Intersections {
    let points = match supports(&a.support(), &b.support()) {
        SupportContact::Coincident => match common_support(a, b) {
            Intersections::Overlap => return Intersections::Overlap,
            Intersections::Points(points) => points,
        },
        SupportContact::Points(raw) => {
            let mut points = Vec::new();
            for p in raw {
                if a.in_range(p) && b.in_range(p) {
                    push_unique(&mut points, p);
                }
            }
            points
        }
    };
    let points = if closed {
        points
    } else {
        points
            .into_iter()
            .filter(|p| !is_endpoint(a, *p) && !is_endpoint(b, *p))
            .collect()
    };
    Intersections::Points(points)
}

/// Intersect a curve with an infinite line or circle.
///
/// With `closed == false` intersections within [`EPS`] of the curve's
/// endpoints are dropped.
#[must_use]
pub fn intersect_support(curve: &Curve, support: &Support, closed: bool) -> Intersections {
    match supports(&curve.support(), support) {
        SupportContact::Coincident => Intersections::Overlap,
        SupportContact::Points(raw) => {
            let mut points = Vec::new();
            for p in raw {
                if curve.in_range(p) && (closed || !is_endpoint(curve, p)) {
                    push_unique(&mut points, p);
                }
            }
            Intersections::Points(points)
        }
    }
}

/// Intersect a curve with a circle boundary.
#[must_use]
pub fn intersect_circle(curve: &Curve, circle: &Circle, closed: bool) -> Intersections {
    intersect_support(curve, &Support::Circle(*circle), closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> Curve {
        Curve::Segment {
            start: Point::new(ax, ay),
            end: Point::new(bx, by),
        }
    }

    fn upper_half_circle() -> Curve {
        Curve::Arc {
            center: Point::ORIGIN,
            start: Point::new(1.0, 0.0),
            end: Point::new(-1.0, 0.0),
            clockwise: false,
        }
    }

    #[test]
    fn crossing_segments() {
        let result = intersect(&seg(0.0, 0.0, 2.0, 2.0), &seg(0.0, 2.0, 2.0, 0.0), false);
        assert_eq!(result.points().len(), 1);
        assert!(result.points()[0].approx_eq(Point::new(1.0, 1.0)));
    }

    #[test]
    fn disjoint_segments() {
        let result = intersect(&seg(0.0, 0.0, 1.0, 0.0), &seg(2.0, -1.0, 2.0, 1.0), true);
        assert!(result.is_empty());
    }

    #[test]
    fn shared_endpoint_open_vs_closed() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(1.0, 0.0, 1.0, 1.0);
        assert_eq!(intersect(&a, &b, true).points().len(), 1);
        assert!(intersect(&a, &b, false).is_empty());
    }

    #[test]
    fn collinear_overlap() {
        let result = intersect(&seg(0.0, 0.0, 2.0, 0.0), &seg(1.0, 0.0, 3.0, 0.0), true);
        assert!(result.is_overlap());
        assert!(!result.is_empty());
    }

    #[test]
    fn collinear_touching_is_a_point() {
        let result = intersect(&seg(0.0, 0.0, 1.0, 0.0), &seg(1.0, 0.0, 3.0, 0.0), true);
        assert_eq!(result.points().len(), 1);
        assert!(result.points()[0].approx_eq(Point::new(1.0, 0.0)));
    }

    #[test]
    fn arc_crosses_segment_once() {
        let arc = upper_half_circle();
        let result = intersect(&arc, &seg(0.0, -2.0, 0.0, 2.0), false);
        assert_eq!(result.points().len(), 1);
        assert!(result.points()[0].approx_eq(Point::new(0.0, 1.0)));
    }

    #[test]
    fn arc_misses_segment_below() {
        let arc = upper_half_circle();
        let result = intersect(&arc, &seg(-2.0, -0.5, 2.0, -0.5), false);
        assert!(result.is_empty());
    }

    #[test]
    fn arcs_on_same_circle() {
        let arc = upper_half_circle();
        let overlapping = Curve::Arc {
            center: Point::ORIGIN,
            start: Point::new(0.0, 1.0),
            end: Point::new(0.0, -1.0),
            clockwise: false,
        };
        assert!(intersect(&arc, &overlapping, true).is_overlap());

        let lower = Curve::Arc {
            center: Point::ORIGIN,
            start: Point::new(-1.0, 0.0),
            end: Point::new(1.0, 0.0),
            clockwise: false,
        };
        let touching = intersect(&arc, &lower, true);
        assert_eq!(touching.points().len(), 2);
        assert!(intersect(&arc, &lower, false).is_empty());
    }

    #[test]
    fn two_circles() {
        let a = Curve::FullCircle {
            center: Point::ORIGIN,
            point: Point::new(1.0, 0.0),
            clockwise: false,
        };
        let b = Curve::FullCircle {
            center: Point::new(1.0, 0.0),
            point: Point::new(2.0, 0.0),
            clockwise: false,
        };
        let result = intersect(&a, &b, true);
        assert_eq!(result.points().len(), 2);
        for p in result.points() {
            assert!((p.x - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn tangent_line_touches_once() {
        let arc = upper_half_circle();
        let result = intersect(&arc, &seg(-2.0, 1.0, 2.0, 1.0), true);
        assert_eq!(result.points().len(), 1);
        assert!(result.points()[0].approx_eq(Point::new(0.0, 1.0)));
    }

    #[test]
    fn segment_against_circle() {
        let disk = Circle::new(Point::ORIGIN, 1.0);
        let through = intersect_circle(&seg(-2.0, 0.0, 2.0, 0.0), &disk, true);
        assert_eq!(through.points().len(), 2);
        let ending = intersect_circle(&seg(0.0, 0.0, 2.0, 0.0), &disk, true);
        assert_eq!(ending.points().len(), 1);
        assert!(ending.points()[0].approx_eq(Point::new(1.0, 0.0)));
    }

    #[test]
    fn arc_against_own_support_overlaps() {
        let arc = upper_half_circle();
        assert!(intersect_support(&arc, &arc.support(), true).is_overlap());
    }

    #[test]
    fn segment_against_extended_line() {
        let s = seg(0.0, 0.0, 1.0, 0.0);
        let line = Support::Line(Line::through_points(Point::new(0.5, -1.0), Point::new(0.5, 1.0)));
        let result = intersect_support(&s, &line, false);
        assert_eq!(result.points().len(), 1);
        assert!(result.points()[0].approx_eq(Point::new(0.5, 0.0)));
    }
}
