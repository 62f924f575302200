use std::collections::{BTreeMap, BTreeSet};

use super::{ArcId, CrossId, StationId, StrokeId, StrokeNetwork, VertexId};
use crate::geometry::{Circle, Curve, EPS, intersect};
use crate::sec::smallest_enclosing_disk;
use crate::types::Point;

/// A place where strokes meet.
///
/// A stroke takes part either concretely, with a vertex on the crossing,
/// or virtually, with an arc that passes through it. The crossing's
/// disk is the smallest disk around the points where the participating
/// strokes currently meet.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeCross {
    station: StationId,
    concrete: BTreeMap<StrokeId, VertexId>,
    virtuals: BTreeMap<StrokeId, ArcId>,
    virtual_positions: BTreeMap<StrokeId, Point>,
    intersections: Vec<Point>,
    disk: Circle,
    alive: bool,
}

impl StrokeCross {
    pub(super) fn new(station: StationId, position: Point) -> Self {
        Self {
            station,
            concrete: BTreeMap::new(),
            virtuals: BTreeMap::new(),
            virtual_positions: BTreeMap::new(),
            intersections: Vec::new(),
            disk: Circle::new(position, 0.0),
            alive: true,
        }
    }

    /// Returns `false` if the stroke already takes part.
    pub(super) fn add_concrete(&mut self, stroke: StrokeId, vertex: VertexId) -> bool {
        if self.concrete.contains_key(&stroke) || self.virtuals.contains_key(&stroke) {
            return false;
        }
        self.concrete.insert(stroke, vertex);
        true
    }

    pub(super) fn forget_stroke(&mut self, stroke: StrokeId) {
        self.concrete.remove(&stroke);
        self.virtuals.remove(&stroke);
        self.virtual_positions.remove(&stroke);
    }

    pub(super) const fn kill(&mut self) {
        self.alive = false;
    }

    /// Station this crossing was built at.
    #[must_use]
    pub const fn station(&self) -> StationId {
        self.station
    }

    /// Strokes taking part through a vertex.
    #[must_use]
    pub const fn concrete(&self) -> &BTreeMap<StrokeId, VertexId> {
        &self.concrete
    }

    /// Strokes taking part through an arc.
    #[must_use]
    pub const fn virtuals(&self) -> &BTreeMap<StrokeId, ArcId> {
        &self.virtuals
    }

    /// Where a stroke meets this crossing.
    #[must_use]
    pub fn virtual_position(&self, stroke: StrokeId) -> Option<Point> {
        self.virtual_positions.get(&stroke).copied()
    }

    /// Pairwise intersection points of the participating arcs found at
    /// the last disk update.
    #[must_use]
    pub fn intersections(&self) -> &[Point] {
        &self.intersections
    }

    /// Smallest disk around the current meeting points.
    #[must_use]
    pub const fn disk(&self) -> &Circle {
        &self.disk
    }

    /// Every participating stroke.
    #[must_use]
    pub fn strokes(&self) -> BTreeSet<StrokeId> {
        self.concrete
            .keys()
            .chain(self.virtuals.keys())
            .copied()
            .collect()
    }

    /// Number of participating strokes.
    #[must_use]
    pub fn participants(&self) -> usize {
        self.concrete.len() + self.virtuals.len()
    }

    /// Two strokes, both passing through on arcs.
    #[must_use]
    pub fn is_movable(&self) -> bool {
        self.concrete.is_empty() && self.virtuals.len() == 2
    }

    /// Still part of the network.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }
}

/// An arc taking part in a disk computation.
struct Participant {
    curve: Curve,
    stroke: StrokeId,
    virtuals: Vec<CrossId>,
}

/// Meeting points found for one crossing.
struct Settlement {
    intersections: Vec<Point>,
    positions: BTreeMap<StrokeId, Point>,
    disk: Option<Circle>,
}

impl StrokeNetwork {
    /// The arc that could be lengthened to reach this crossing: present
    /// when exactly two strokes meet and one of them ends here.
    #[must_use]
    pub fn extending_arc(&self, id: CrossId) -> Option<ArcId> {
        let cross = self.cross(id);
        if cross.participants() != 2 {
            return None;
        }
        cross.concrete.values().find_map(|&v| {
            let vertex = self.vertex(v);
            match (vertex.incoming, vertex.outgoing) {
                (None, out) => out,
                (inc, None) => inc,
                _ => None,
            }
        })
    }

    /// Whether the crossing has an [`extending_arc`](Self::extending_arc).
    #[must_use]
    pub fn is_extensible(&self, id: CrossId) -> bool {
        self.extending_arc(id).is_some()
    }

    /// Every arc touching the crossing: both arcs of each concrete vertex
    /// followed by the virtual arcs.
    #[must_use]
    pub fn incident_arcs(&self, id: CrossId) -> Vec<ArcId> {
        let cross = self.cross(id);
        let mut arcs = Vec::new();
        for &v in cross.concrete.values() {
            let vertex = self.vertex(v);
            arcs.extend(vertex.incoming);
            arcs.extend(vertex.outgoing);
        }
        arcs.extend(cross.virtuals.values().copied());
        arcs
    }

    /// Route `stroke` through the crossing on `arc` instead of its
    /// previous vertex or arc, then refresh the disk.
    pub(crate) fn change_stroke(&mut self, id: CrossId, stroke: StrokeId, arc: ArcId) {
        {
            let cross = &mut self.crosses[id.index()];
            cross.concrete.remove(&stroke);
            cross.virtuals.insert(stroke, arc);
        }
        self.compute_smallest_disk(id);
        let center = self.cross(id).disk.center;
        let closest = self.curve(arc).closest_point(center);
        self.crosses[id.index()]
            .virtual_positions
            .insert(stroke, closest);
    }

    /// Recompute the meeting points and the disk of a crossing.
    pub(crate) fn compute_smallest_disk(&mut self, id: CrossId) {
        let cross = self.cross(id);
        let mut participants = Vec::new();
        for &v in cross.concrete.values() {
            let vertex = self.vertex(v);
            for arc in [vertex.incoming, vertex.outgoing].into_iter().flatten() {
                participants.push(self.participant(arc));
            }
        }
        for &arc in cross.virtuals.values() {
            participants.push(self.participant(arc));
        }
        let concrete: Vec<(StrokeId, Point)> = cross
            .concrete
            .iter()
            .map(|(&s, &v)| (s, self.vertex(v).position))
            .collect();

        let settled = self.settle(id, &participants, &concrete, |s| {
            cross.virtuals.get(&s).map(|&arc| self.curve(arc))
        });

        let cross = &mut self.crosses[id.index()];
        cross.intersections = settled.intersections;
        cross.virtual_positions.extend(settled.positions);
        if let Some(disk) = settled.disk {
            cross.disk = disk;
        }
    }

    /// The crossing's disk if arcs `replaced` were swapped for
    /// `replacement`, and `removed` (when it sits on the crossing) were no
    /// longer a vertex there.
    ///
    /// Returns `None` when `replaced` is empty.
    #[must_use]
    pub fn disk_after_replacement(
        &self,
        id: CrossId,
        replaced: &[ArcId],
        replacement: &Curve,
        removed: Option<VertexId>,
    ) -> Option<Circle> {
        let replaced_stroke = self.arc_stroke(*replaced.first()?);
        let cross = self.cross(id);

        let mut participants = Vec::new();
        for &v in cross.concrete.values() {
            let vertex = self.vertex(v);
            for arc in [vertex.incoming, vertex.outgoing].into_iter().flatten() {
                if !replaced.contains(&arc) {
                    participants.push(self.participant(arc));
                }
            }
        }
        for &arc in cross.virtuals.values() {
            if !replaced.contains(&arc) {
                participants.push(self.participant(arc));
            }
        }
        participants.push(Participant {
            curve: *replacement,
            stroke: replaced_stroke,
            virtuals: replaced
                .iter()
                .flat_map(|&a| self.arc(a).virtuals.iter().copied())
                .collect(),
        });

        let concrete: Vec<(StrokeId, Point)> = cross
            .concrete
            .iter()
            .filter(|&(_, &v)| Some(v) != removed)
            .map(|(&s, &v)| (s, self.vertex(v).position))
            .collect();

        self.settle(id, &participants, &concrete, |s| {
            if s == replaced_stroke {
                return Some(*replacement);
            }
            cross.virtuals.get(&s).map(|&arc| {
                if replaced.contains(&arc) {
                    *replacement
                } else {
                    self.curve(arc)
                }
            })
        })
        .disk
    }

    fn participant(&self, arc: ArcId) -> Participant {
        Participant {
            curve: self.curve(arc),
            stroke: self.arc_stroke(arc),
            virtuals: self.arc(arc).virtuals.clone(),
        }
    }

    /// Find where the strokes of a crossing meet.
    ///
    /// Pairwise arc intersections away from arc endpoints count, unless
    /// another crossing shared by both arcs lies closer to the point than
    /// this crossing's current center. Concrete vertices count as they
    /// are. Strokes left over meet the crossing at their closest approach
    /// to any point found so far.
    fn settle(
        &self,
        id: CrossId,
        participants: &[Participant],
        concrete: &[(StrokeId, Point)],
        geometry_of: impl Fn(StrokeId) -> Option<Curve>,
    ) -> Settlement {
        let cross = self.cross(id);
        let guess = cross.disk.center;
        let mut remaining = cross.strokes();
        let mut intersections = Vec::new();
        let mut positions = BTreeMap::new();

        for (i, s) in participants.iter().enumerate() {
            for t in &participants[i + 1..] {
                for &p in intersect(&s.curve, &t.curve, true).points() {
                    let away_from_ends = [s.curve.start(), s.curve.end(), t.curve.start(), t.curve.end()]
                        .iter()
                        .all(|e| e.distance(p) > EPS);
                    if !away_from_ends {
                        continue;
                    }
                    let guess_distance = guess.distance(p);
                    let claimed = s.virtuals.iter().any(|&other| {
                        other != id
                            && t.virtuals.contains(&other)
                            && self.cross(other).disk.center.distance(p) < guess_distance
                    });
                    if claimed {
                        continue;
                    }
                    intersections.push(p);
                    positions.insert(s.stroke, p);
                    positions.insert(t.stroke, p);
                    remaining.remove(&s.stroke);
                    remaining.remove(&t.stroke);
                }
            }
        }

        let mut points = intersections.clone();
        for &(stroke, p) in concrete {
            remaining.remove(&stroke);
            points.push(p);
        }
        if points.is_empty() {
            points.push(guess);
        }

        for stroke in remaining {
            let Some(curve) = geometry_of(stroke) else {
                continue;
            };
            let best = points
                .iter()
                .map(|&p| {
                    let q = curve.closest_point(p);
                    (q.distance(p), q)
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, q)| q);
            if let Some(q) = best {
                positions.insert(stroke, q);
                points.push(q);
            }
        }

        Settlement {
            intersections,
            positions,
            disk: smallest_enclosing_disk(&points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A horizontal and a vertical line crossing at the origin station.
    fn plus() -> (StrokeNetwork, CrossId, [VertexId; 2]) {
        let mut net = StrokeNetwork::new();
        let west = net.add_station("w", Point::new(-1.0, 0.0), false);
        let east = net.add_station("e", Point::new(1.0, 0.0), false);
        let south = net.add_station("s", Point::new(0.0, -1.0), false);
        let north = net.add_station("n", Point::new(0.0, 1.0), false);
        let hub = net.add_station("hub", Point::ORIGIN, false);
        let h = net.add_stroke("h", &[west, hub, east], false).unwrap();
        let v = net.add_stroke("v", &[south, hub, north], false).unwrap();
        let hv = net.stroke(h).vertices()[1];
        let vv = net.stroke(v).vertices()[1];
        let cross = net.add_cross(hub, &[hv, vv]).unwrap();
        (net, cross, [hv, vv])
    }

    #[test]
    fn new_cross_has_point_disk() {
        let (net, cross, _) = plus();
        let c = net.cross(cross);
        assert_eq!(c.participants(), 2);
        assert!(c.disk().radius.abs() < f64::EPSILON);
        assert_eq!(c.disk().center, Point::ORIGIN);
        assert!(!c.is_movable());
        assert!(!net.is_extensible(cross));
        assert_eq!(net.incident_arcs(cross).len(), 4);
    }

    #[test]
    fn straightening_both_strokes_makes_cross_movable() {
        let (mut net, cross, [hv, vv]) = plus();
        let h_curve = Curve::Segment {
            start: Point::new(-1.0, 0.0),
            end: Point::new(1.0, 0.0),
        };
        let v_curve = Curve::Segment {
            start: Point::new(0.0, -1.0),
            end: Point::new(0.0, 1.0),
        };
        net.replace_vertex(hv, &h_curve).unwrap();
        net.replace_vertex(vv, &v_curve).unwrap();

        let c = net.cross(cross);
        assert!(c.is_movable());
        assert_eq!(c.intersections().len(), 1);
        assert!(c.intersections()[0].approx_eq(Point::ORIGIN));
        assert!(c.disk().radius < EPS);
        for stroke in c.strokes() {
            assert!(c.virtual_position(stroke).unwrap().approx_eq(Point::ORIGIN));
        }
    }

    #[test]
    fn bent_replacement_moves_meeting_point() {
        let (mut net, cross, [hv, _]) = plus();
        // Arc from west to east bulging up through (0, 0.5).
        let bulge = Curve::through_point(
            Point::new(-1.0, 0.0),
            Point::new(0.0, 0.5),
            Point::new(1.0, 0.0),
        )
        .unwrap();
        net.replace_vertex(hv, &bulge).unwrap();
        let c = net.cross(cross);
        // The vertical stroke is still concrete at the origin and its arcs
        // meet the bulge at (0, 0.5), so the disk spans both points.
        assert!((c.disk().radius - 0.25).abs() < 1e-6);
        assert!(c.disk().center.approx_eq(Point::new(0.0, 0.25)));
    }

    #[test]
    fn disk_after_replacement_is_hypothetical() {
        let (net, cross, [hv, _]) = plus();
        let inc = net.vertex(hv).incoming().unwrap();
        let out = net.vertex(hv).outgoing().unwrap();
        let bulge = Curve::through_point(
            Point::new(-1.0, 0.0),
            Point::new(0.0, 0.5),
            Point::new(1.0, 0.0),
        )
        .unwrap();
        let disk = net
            .disk_after_replacement(cross, &[inc, out], &bulge, Some(hv))
            .unwrap();
        assert!((disk.radius - 0.25).abs() < 1e-6);
        // The network itself is untouched.
        assert!(net.cross(cross).disk().radius.abs() < f64::EPSILON);
        assert!(net.disk_after_replacement(cross, &[], &bulge, None).is_none());
    }

    #[test]
    fn stroke_end_on_cross_is_extensible() {
        let mut net = StrokeNetwork::new();
        let a = net.add_station("a", Point::new(-1.0, 0.0), false);
        let hub = net.add_station("hub", Point::ORIGIN, false);
        let b = net.add_station("b", Point::new(1.0, 0.0), false);
        let c = net.add_station("c", Point::new(0.0, 1.0), false);
        let through = net.add_stroke("through", &[a, hub, b], false).unwrap();
        let spur = net.add_stroke("spur", &[hub, c], false).unwrap();
        let tv = net.stroke(through).vertices()[1];
        let sv = net.stroke(spur).vertices()[0];
        let cross = net.add_cross(hub, &[tv, sv]).unwrap();
        assert_eq!(net.extending_arc(cross), net.vertex(sv).outgoing());
        assert!(net.is_extensible(cross));
    }

    #[test]
    fn remove_cross_detaches() {
        let (mut net, cross, [hv, vv]) = plus();
        net.remove_cross(cross);
        assert!(net.vertex(hv).cross().is_none());
        assert!(net.vertex(vv).cross().is_none());
        assert!(net.cross_ids().is_empty());
    }
}
