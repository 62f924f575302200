//! Admissibility of an operation: no new intersections between arcs,
//! and an unchanged cyclic order of arcs around every crossing the
//! operation touches.

use tracing::trace;

use super::extension::{find_double_extension, find_end_extension, find_start_extension};
use super::operation::Operation;
use crate::geometry::{Circle, Curve, EPS, intersect, intersect_circle};
use crate::network::{ArcId, CrossId, StrokeNetwork, VertexId};
use crate::types::Point;

/// How an arc endpoint relates to the operated stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    /// Not on a crossing the operated stroke passes through near the
    /// operation.
    None,
    /// On such a crossing, which stays put.
    Fixed,
    /// On such a crossing, and the arc will slide to follow the
    /// replacement.
    Extensible,
}

/// Role of an operated arc at a crossing whose order is checked.
#[derive(Debug, Clone, Copy)]
enum Role {
    /// The vertex itself sits on the crossing; both of its arcs meet it.
    Vertex { incoming: ArcId, outgoing: ArcId },
    /// The crossing is at the far end of the vertex's incoming arc.
    Incoming(ArcId),
    /// The crossing is at the far end of the vertex's outgoing arc.
    Outgoing(ArcId),
    /// One of the vertex's arcs passes through the crossing.
    Through(ArcId),
}

impl Role {
    fn involves(self, arc: ArcId) -> bool {
        match self {
            Self::Vertex { incoming, outgoing } => arc == incoming || arc == outgoing,
            Self::Incoming(a) | Self::Outgoing(a) | Self::Through(a) => arc == a,
        }
    }
}

/// Arc label and direction from a crossing's disk center.
type Direction = (ArcId, Point);

/// Checks operations against the current network.
#[derive(Debug, Clone, Copy)]
pub struct TopologyChecker<'a> {
    network: &'a StrokeNetwork,
    max_cross_distance: f64,
}

impl<'a> TopologyChecker<'a> {
    /// Checker for `network`, letting crossings drift at most
    /// `max_cross_distance`.
    #[must_use]
    pub const fn new(network: &'a StrokeNetwork, max_cross_distance: f64) -> Self {
        Self {
            network,
            max_cross_distance,
        }
    }

    fn operated_arcs(&self, vertex: VertexId) -> (Option<ArcId>, Option<ArcId>) {
        let v = self.network.vertex(vertex);
        (v.incoming(), v.outgoing())
    }

    /// Recompute every interaction of `op` from scratch.
    pub fn recheck(&self, op: &mut Operation) {
        op.clear();
        let net = self.network;

        for arc in net.arc_ids() {
            self.check_arc(arc, op);
        }

        let v = net.vertex(op.vertex);
        let (Some(inc), Some(out)) = (v.incoming(), v.outgoing()) else {
            return;
        };

        if let Some(cross) = v.cross()
            && !net.is_extensible(cross)
        {
            self.check_order(
                op,
                cross,
                Role::Vertex {
                    incoming: inc,
                    outgoing: out,
                },
            );
        }
        if let Some(cross) = net.vertex(net.arc(inc).start()).cross() {
            self.check_order(op, cross, Role::Incoming(inc));
        }
        if let Some(cross) = net.vertex(net.arc(out).end()).cross() {
            self.check_order(op, cross, Role::Outgoing(out));
        }
        for arc in [inc, out] {
            for &cross in net.arc(arc).virtuals() {
                if !net.is_extensible(cross) {
                    self.check_order(op, cross, Role::Through(arc));
                }
            }
        }

        if op.is_blocked() {
            trace!(vertex = %op.vertex, reasons = ?op.blocks, "operation blocked");
        }
    }

    fn attachment(&self, endpoint: VertexId, op: &Operation) -> Attachment {
        let net = self.network;
        let Some(cross_id) = net.vertex(endpoint).cross() else {
            return Attachment::None;
        };
        let cross = net.cross(cross_id);
        let stroke = net.vertex(op.vertex).stroke();
        let (inc, out) = self.operated_arcs(op.vertex);
        let concrete_here = cross.concrete().get(&stroke) == Some(&op.vertex);
        let passing_here = cross
            .virtuals()
            .get(&stroke)
            .is_some_and(|&a| Some(a) == inc || Some(a) == out);
        if !concrete_here && !passing_here {
            Attachment::None
        } else if net.is_extensible(cross_id) {
            Attachment::Extensible
        } else {
            Attachment::Fixed
        }
    }

    /// Record how `arc` interacts with `op`: as an extension, as an arc
    /// sharing crossings with the operated arcs, or as an unrelated arc
    /// that must not be hit.
    pub fn check_arc(&self, arc: ArcId, op: &mut Operation) {
        let net = self.network;
        let v = net.vertex(op.vertex);
        let (inc, out) = (v.incoming(), v.outgoing());
        if Some(arc) == inc || Some(arc) == out {
            return;
        }
        let operated_virtuals = |a: Option<ArcId>, c: CrossId| {
            a.is_some_and(|a| net.arc(a).virtuals().contains(&c))
        };

        let record = net.arc(arc);
        let shared: Vec<CrossId> = record
            .virtuals()
            .iter()
            .copied()
            .filter(|&c| {
                v.cross() == Some(c) || operated_virtuals(inc, c) || operated_virtuals(out, c)
            })
            .collect();

        let at_start = self.attachment(record.start(), op);
        let at_end = self.attachment(record.end(), op);
        if at_start == Attachment::Extensible {
            op.start_extension.insert(arc);
        }
        if at_end == Attachment::Extensible {
            op.end_extension.insert(arc);
        }
        let attached = usize::from(at_start != Attachment::None) + usize::from(at_end != Attachment::None);

        // Two circles meet at most twice.
        if shared.len() + attached > 2 {
            op.blocks.related_arcs.insert(arc);
            return;
        }

        match (at_start, at_end) {
            (Attachment::Extensible, Attachment::Extensible) => {
                match find_double_extension(net, arc, &op.replacement, op.vertex) {
                    Some([start, end]) => {
                        self.check_extension(arc, op, start, true);
                        self.check_extension(arc, op, end, false);
                    }
                    None => {
                        op.blocks.related_arcs.insert(arc);
                    }
                }
            }
            (Attachment::Extensible, _) => {
                match find_start_extension(net, arc, &op.replacement, op.vertex) {
                    Some(p) => {
                        self.check_extension(arc, op, p, true);
                    }
                    None => {
                        op.blocks.related_arcs.insert(arc);
                    }
                }
            }
            (_, Attachment::Extensible) => {
                match find_end_extension(net, arc, &op.replacement, op.vertex) {
                    Some(p) => {
                        self.check_extension(arc, op, p, false);
                    }
                    None => {
                        op.blocks.related_arcs.insert(arc);
                    }
                }
            }
            _ if shared.len() + attached > 0 => {
                self.check_shared_crossings(arc, &shared, op);
            }
            _ => {
                let curve = net.curve(arc);
                if !intersect(&curve, &op.replacement, false).is_empty() {
                    op.blocks.unrelated_arcs.insert(arc);
                }
            }
        }
    }

    /// An arc sharing crossings with the operated arcs must meet the
    /// replacement exactly once per shared crossing, in the same order,
    /// and close enough to each crossing that does not float freely.
    fn check_shared_crossings(&self, arc: ArcId, shared: &[CrossId], op: &mut Operation) {
        let net = self.network;
        let curve = net.curve(arc);
        let mut hits: Vec<Point> = intersect(&curve, &op.replacement, false)
            .into_points()
            .unwrap_or_default();
        if hits.len() != shared.len() {
            op.blocks.related_arcs.insert(arc);
            return;
        }
        hits.sort_by(|a, b| {
            curve
                .distance_along(*a, true)
                .total_cmp(&curve.distance_along(*b, true))
        });
        for (hit, &cross) in hits.iter().zip(shared) {
            let c = net.cross(cross);
            if !c.is_movable() && c.disk().center.distance(*hit) >= self.max_cross_distance {
                op.blocks.related_arcs.insert(arc);
                return;
            }
        }
    }

    /// Test the piece by which `arc` would grow to reach `ext` against
    /// every other arc and the operation's other extensions. Shrinking
    /// needs no test. Returns `true` if the operation got blocked.
    fn check_extension(&self, arc: ArcId, op: &mut Operation, ext: Point, at_start: bool) -> bool {
        let net = self.network;
        let curve = net.curve(arc);
        if curve.length() >= curve.distance_along(ext, !at_start) {
            return false;
        }
        let piece = if at_start {
            curve.with_endpoints(ext, curve.start())
        } else {
            curve.with_endpoints(curve.end(), ext)
        };

        let (inc, out) = self.operated_arcs(op.vertex);
        for other in net.arc_ids() {
            if other == arc || Some(other) == inc || Some(other) == out {
                continue;
            }
            if !intersect(&piece, &net.curve(other), false).is_empty() {
                op.blocks.related_arcs.insert(other);
                return true;
            }
        }
        if op
            .extensions
            .iter()
            .any(|e| !intersect(&piece, e, false).is_empty())
        {
            op.blocks.related_arcs.insert(arc);
            return true;
        }
        op.extensions.push(piece);
        false
    }

    fn check_order(&self, op: &mut Operation, cross: CrossId, role: Role) {
        if !self.order_preserved(op, cross, role) {
            op.blocks.crosses.insert(cross);
        }
    }

    /// The crossing's disk after `op`: a point where an extended arc
    /// will meet the replacement, or the recomputed smallest disk.
    #[must_use]
    pub fn disk_after(&self, op: &Operation, cross: CrossId) -> Option<Circle> {
        let net = self.network;
        if let Some(ext) = net.extending_arc(cross) {
            let at_start = op.start_extension.contains(&ext);
            let at_end = op.end_extension.contains(&ext);
            let moved = match (at_start, at_end) {
                (true, true) => find_double_extension(net, ext, &op.replacement, op.vertex).map(
                    |[start, end]| {
                        if net.vertex(net.arc(ext).end()).cross() == Some(cross) {
                            end
                        } else {
                            start
                        }
                    },
                ),
                (true, false) => find_start_extension(net, ext, &op.replacement, op.vertex),
                (false, true) => find_end_extension(net, ext, &op.replacement, op.vertex),
                (false, false) => None,
            };
            if let Some(center) = moved {
                return Some(Circle::new(center, 0.0));
            }
        }
        let (inc, out) = self.operated_arcs(op.vertex);
        let replaced: Vec<ArcId> = [inc, out].into_iter().flatten().collect();
        net.disk_after_replacement(cross, &replaced, &op.replacement, Some(op.vertex))
    }

    /// Whether the arcs around `cross` keep their cyclic order when
    /// `op` is applied.
    fn order_preserved(&self, op: &Operation, cross: CrossId, role: Role) -> bool {
        let net = self.network;
        let before = *net.cross(cross).disk();
        let Some(after) = self.disk_after(op, cross) else {
            return false;
        };

        let mut original: Vec<Direction> = Vec::new();
        let mut replaced: Vec<Direction> = Vec::new();

        let ok = match role {
            Role::Through(arc) => {
                directions(&mut original, &before, &net.curve(arc), arc, 2)
                    && directions(&mut replaced, &after, &op.replacement, arc, 2)
            }
            Role::Vertex { incoming, outgoing } => {
                // Both old arcs carry the incoming arc's label, as the
                // replacement will.
                directions(&mut original, &before, &net.curve(incoming), incoming, 1)
                    && directions(&mut original, &before, &net.curve(outgoing), incoming, 1)
                    && directions(&mut replaced, &after, &op.replacement, incoming, 2)
            }
            Role::Incoming(arc) | Role::Outgoing(arc) => {
                directions(&mut original, &before, &net.curve(arc), arc, 1)
                    && directions(&mut replaced, &after, &op.replacement, arc, 1)
            }
        };
        if !ok {
            return false;
        }

        for arc in net.incident_arcs(cross) {
            if role.involves(arc) {
                continue;
            }
            let record = net.arc(arc);
            let ends_here = net.vertex(record.start()).cross() == Some(cross)
                || net.vertex(record.end()).cross() == Some(cross);
            let expect = if ends_here { 1 } else { 2 };
            let mut fixed = Vec::new();
            if !directions(&mut fixed, &before, &net.curve(arc), arc, expect) {
                return false;
            }
            original.extend(fixed.iter().copied());
            replaced.extend(fixed);
        }

        same_cyclic_order(original, replaced)
    }
}

/// Directions in which `curve` meets the boundary of `disk`, labelled
/// `label`. `expect` is 1 for a curve ending in the disk and 2 for one
/// passing through. Point disks use the curve's tangents instead.
/// Returns `false` if the curve misses the disk.
fn directions(
    out: &mut Vec<Direction>,
    disk: &Circle,
    curve: &Curve,
    label: ArcId,
    expect: usize,
) -> bool {
    if disk.radius < EPS {
        let touch = curve.closest_point(disk.center);
        if expect == 1 {
            let dir = if touch.distance(curve.start()) < touch.distance(curve.end()) {
                curve.start_tangent()
            } else {
                -curve.end_tangent()
            };
            out.push((label, dir.normalized()));
        } else {
            let tangent = curve.tangent_at(touch).normalized();
            out.push((label, tangent));
            out.push((label, -tangent));
        }
        return true;
    }

    let Some(points) = intersect_circle(curve, disk, true).into_points() else {
        return false;
    };
    let Some(&first) = points.first() else {
        return false;
    };
    if expect == 1 && points.len() != 1 {
        return false;
    }
    if expect == 2 && points.len() > 2 {
        return false;
    }
    out.push((label, (first - disk.center).normalized()));
    if expect == 2 {
        let second = points.get(1).copied().unwrap_or(first);
        out.push((label, (second - disk.center).normalized()));
    }
    true
}

/// Whether two labelled direction sets read the same around the circle,
/// up to rotation.
fn same_cyclic_order(mut original: Vec<Direction>, mut replaced: Vec<Direction>) -> bool {
    if original.len() != replaced.len() {
        return false;
    }
    let reference = Point::new(0.0, 1.0);
    let by_angle =
        |a: &Direction, b: &Direction| reference.ccw_angle_to(a.1).total_cmp(&reference.ccw_angle_to(b.1));
    original.sort_by(by_angle);
    replaced.sort_by(by_angle);

    let n = original.len();
    n == 0
        || (0..n).any(|shift| {
            original
                .iter()
                .enumerate()
                .all(|(i, (label, _))| *label == replaced[(i + shift) % n].0)
        })
}
