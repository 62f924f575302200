//! Where an arc ending on an extensible crossing has to move so that it
//! still meets the stroke being simplified.
//!
//! An arc whose endpoint sits on an extensible crossing is slid along
//! its own support (line or circle) until it meets the replacement arc.
//! Of the candidate meeting points, the one nearest to the arc's fixed
//! end is taken, provided it lies beyond every other crossing the arc
//! already passes through.

use crate::geometry::{Curve, EPS, intersect_support};
use crate::network::{ArcId, StrokeNetwork, VertexId};
use crate::types::Point;

/// Intersections of `replacement` with the support of `arc`, away from
/// the replacement's endpoints. `None` on overlap or no contact.
fn support_hits(net: &StrokeNetwork, arc: ArcId, replacement: &Curve) -> Option<Vec<Point>> {
    let support = net.curve(arc).support();
    let points = intersect_support(replacement, &support, false).into_points()?;
    (!points.is_empty()).then_some(points)
}

/// The hit that comes first along `replacement`, measured from its
/// start (`from_start`) or from its end.
fn first_along(replacement: &Curve, hits: &[Point], from_start: bool) -> Option<Point> {
    hits.iter()
        .copied()
        .min_by(|a, b| {
            replacement
                .distance_along(*a, from_start)
                .total_cmp(&replacement.distance_along(*b, from_start))
        })
}

/// Walking direction along an arc while searching for an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    /// From the end backwards past the start.
    Backward,
    /// From the start forwards past the end.
    Forward,
}

/// How far `p` lies from the arc's fixed end, walking in `sweep`
/// direction: a projection for segments, a turning angle for arcs.
fn progress(curve: &Curve, sweep: Sweep, p: Point) -> f64 {
    let (from, to) = match sweep {
        Sweep::Backward => (curve.end(), curve.start()),
        Sweep::Forward => (curve.start(), curve.end()),
    };
    match curve.center() {
        None => (p - from).dot(to - from),
        Some(center) => {
            let reference = from - center;
            let arm = p - center;
            let turn_clockwise = curve.is_clockwise() == (sweep == Sweep::Forward);
            if turn_clockwise {
                reference.cw_angle_to(arm)
            } else {
                reference.ccw_angle_to(arm)
            }
        }
    }
}

fn single_extension(
    net: &StrokeNetwork,
    arc: ArcId,
    replacement: &Curve,
    vertex: VertexId,
    sweep: Sweep,
) -> Option<Point> {
    let hits = support_hits(net, arc, replacement)?;
    let curve = net.curve(arc);
    let stroke = net.arc_stroke(arc);
    let v = net.vertex(vertex);
    let operated = [v.incoming(), v.outgoing()];

    // Crossings already on the arc must stay between the fixed end and
    // the new endpoint. Those shared with the operated arcs will sit on
    // the replacement, at its first hit.
    let replacement_hit = first_along(replacement, &hits, sweep == Sweep::Forward)?;
    let mut lower = EPS;
    for &sc in net.arc(arc).virtuals() {
        let cross = net.cross(sc);
        let on_operation = cross
            .virtuals()
            .values()
            .any(|a| operated.contains(&Some(*a)));
        let position = if on_operation {
            replacement_hit
        } else {
            cross.virtual_position(stroke)?
        };
        lower = lower.max(progress(&curve, sweep, position) + EPS);
    }

    hits.into_iter()
        .map(|p| (progress(&curve, sweep, p), p))
        .filter(|&(t, _)| t > lower)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| p)
}

/// New start for `arc` when its start slides onto `replacement`, the
/// arc that replaces `vertex`.
#[must_use]
pub fn find_start_extension(
    net: &StrokeNetwork,
    arc: ArcId,
    replacement: &Curve,
    vertex: VertexId,
) -> Option<Point> {
    single_extension(net, arc, replacement, vertex, Sweep::Backward)
}

/// New end for `arc` when its end slides onto `replacement`.
#[must_use]
pub fn find_end_extension(
    net: &StrokeNetwork,
    arc: ArcId,
    replacement: &Curve,
    vertex: VertexId,
) -> Option<Point> {
    single_extension(net, arc, replacement, vertex, Sweep::Forward)
}

/// Where along the operated stroke an arc endpoint's crossing sits:
/// on the incoming arc, at the vertex, or on the outgoing arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Location {
    Incoming,
    Vertex,
    Outgoing,
}

fn location(net: &StrokeNetwork, endpoint: VertexId, vertex: VertexId) -> Option<Location> {
    let cross = net.vertex(endpoint).cross()?;
    let v = net.vertex(vertex);
    if v.cross() == Some(cross) {
        return Some(Location::Vertex);
    }
    if v.incoming().is_some_and(|a| net.arc(a).virtuals().contains(&cross)) {
        return Some(Location::Incoming);
    }
    if v.outgoing().is_some_and(|a| net.arc(a).virtuals().contains(&cross)) {
        return Some(Location::Outgoing);
    }
    None
}

/// New start and end for `arc` when both of its endpoints slide onto
/// `replacement`.
///
/// The two hits are matched to the arc's ends by the order in which the
/// arc's crossings currently occur along the operated stroke. Fails if
/// the moved arc would lose one of the crossings it passes through.
#[must_use]
pub fn find_double_extension(
    net: &StrokeNetwork,
    arc: ArcId,
    replacement: &Curve,
    vertex: VertexId,
) -> Option<[Point; 2]> {
    let hits = support_hits(net, arc, replacement)?;
    let [a, b] = hits.get(..2)? else {
        return None;
    };
    let (first, second) = if replacement.distance_along(*a, true) < replacement.distance_along(*b, true) {
        (*a, *b)
    } else {
        (*b, *a)
    };

    let record = net.arc(arc);
    let start_loc = location(net, record.start(), vertex)?;
    let end_loc = location(net, record.end(), vertex)?;
    let v = net.vertex(vertex);

    let start_before_end = match (start_loc, end_loc) {
        (s, e) if s != e => s < e,
        (Location::Incoming, _) | (Location::Outgoing, _) => {
            let shared = if start_loc == Location::Incoming {
                v.incoming()
            } else {
                v.outgoing()
            };
            let along = net.curve(shared?);
            let position = |endpoint: VertexId| {
                net.vertex(endpoint)
                    .cross()
                    .and_then(|c| net.cross(c).virtual_position(v.stroke()))
            };
            let at_start = position(record.start())?;
            let at_end = position(record.end())?;
            along.distance_along(at_start, true) < along.distance_along(at_end, true)
        }
        (Location::Vertex, _) => return None,
    };

    let ends = if start_before_end {
        [first, second]
    } else {
        [second, first]
    };

    let moved = net.curve(arc).with_endpoints(ends[0], ends[1]);
    let stroke = net.arc_stroke(arc);
    for &sc in record.virtuals() {
        let position = net.cross(sc).virtual_position(stroke)?;
        if moved.distance_to(position) > EPS {
            return None;
        }
    }
    Some(ends)
}
