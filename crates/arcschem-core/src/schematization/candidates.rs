//! Candidate replacements for a vertex, ranked by Fréchet cost.

use std::f64::consts::PI;

use crate::frechet::FrechetDistance;
use crate::geometry::{Circle, Curve, EPS, Line};
use crate::network::{ArcId, CrossId, StrokeNetwork, VertexId};
use crate::types::Point;

/// Angular sampling density of curved replacements, in samples per
/// radian of turning.
const SAMPLES_PER_RADIAN: f64 = 80.0 / PI;

/// The off-center crossing candidates stay this fraction inside the
/// allowed displacement.
const CROSS_OFFSET_SHRINK: f64 = 0.975;

/// A replacement arc with its cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Replacement geometry.
    pub curve: Curve,
    /// Fréchet cost against the replaced input stations.
    pub cost: f64,
}

/// The `capacity` cheapest candidates seen so far, cheapest first.
/// Ties keep the earlier candidate ahead.
#[derive(Debug, Clone)]
struct TopK {
    capacity: usize,
    entries: Vec<Candidate>,
}

impl TopK {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Cost a new candidate has to beat, once the list is full.
    fn to_beat(&self) -> Option<f64> {
        (self.entries.len() >= self.capacity)
            .then(|| self.entries.last().map(|c| c.cost))
            .flatten()
    }

    fn insert(&mut self, curve: Curve, cost: f64) {
        if self.to_beat().is_some_and(|worst| cost >= worst) {
            return;
        }
        let at = self.entries.partition_point(|c| c.cost <= cost);
        self.entries.insert(at, Candidate { curve, cost });
        self.entries.truncate(self.capacity);
    }

    fn into_vec(self) -> Vec<Candidate> {
        self.entries
    }
}

/// Builds and scores candidate replacements against a network.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator<'a> {
    pub(super) network: &'a StrokeNetwork,
    pub(super) frechet: &'a FrechetDistance,
    pub(super) angles: &'a [f64],
    pub(super) max_cross_distance: f64,
    pub(super) straight_reduction: f64,
    pub(super) capacity: usize,
}

impl CandidateGenerator<'_> {
    /// Candidates for replacing `vertex`, cheapest first.
    ///
    /// Empty for stroke endpoints and for the last vertex of a circular
    /// stroke.
    #[must_use]
    pub fn generate(&self, vertex: VertexId) -> Vec<Candidate> {
        let net = self.network;
        let (Some(start), Some(end)) = (net.previous(vertex), net.next(vertex)) else {
            return Vec::new();
        };
        if end == vertex {
            return Vec::new();
        }

        let original = self.original_stations(vertex);
        let mut best = TopK::new(self.capacity);
        let v = net.vertex(vertex);

        if start == end {
            self.circle_candidates(vertex, start, &original, &mut best);
        } else if let Some(cross) = v.cross()
            && !net.is_extensible(cross)
        {
            self.cross_candidates(cross, start, end, &original, &mut best);
        } else {
            let blocking = |arc: Option<ArcId>| -> Vec<CrossId> {
                arc.map(|a| {
                    net.arc(a)
                        .virtuals()
                        .iter()
                        .copied()
                        .filter(|&c| !net.is_extensible(c) && !net.cross(c).is_movable())
                        .collect()
                })
                .unwrap_or_default()
            };
            let mut crossed = blocking(v.incoming());
            if crossed.is_empty() {
                crossed = blocking(v.outgoing());
            }
            if crossed.is_empty() {
                self.angle_candidates(start, end, &original, &mut best);
            } else {
                for cross in crossed {
                    self.cross_candidates(cross, start, end, &original, &mut best);
                }
            }
        }

        best.into_vec()
    }

    /// Input station positions along the two arcs around `vertex`, from
    /// the previous vertex's station to the next vertex's station.
    #[must_use]
    pub fn original_stations(&self, vertex: VertexId) -> Vec<Point> {
        let net = self.network;
        let v = net.vertex(vertex);
        let edges = [v.incoming(), v.outgoing()]
            .into_iter()
            .flatten()
            .flat_map(|a| net.arc(a).originals().iter().copied());
        let mut points = Vec::new();
        for (i, edge) in edges.enumerate() {
            if i == 0 {
                points.push(net.station(edge.from).position);
            }
            points.push(net.station(edge.to).position);
        }
        points
    }

    /// Fréchet cost of `curve` against `original`. Curved replacements
    /// are sampled by their turning angle; straight ones get the
    /// configured reduction.
    #[must_use]
    pub fn cost(&self, curve: &Curve, original: &[Point]) -> f64 {
        if curve.is_straight() {
            let sampled = curve.sample(0);
            return self.frechet.distance(original, &sampled) * self.straight_reduction;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let extra = (SAMPLES_PER_RADIAN * curve.central_angle().abs()).ceil() as usize;
        let sampled = curve.sample(extra);
        self.frechet.distance(original, &sampled)
    }

    /// Whether some input station lies within `to_beat` of the curve's
    /// midpoint. A candidate failing this cannot beat the list.
    fn passes_precheck(curve: &Curve, original: &[Point], to_beat: Option<f64>) -> bool {
        to_beat.is_none_or(|bound| {
            let mid = curve.point_at(0.5);
            original.iter().any(|p| p.distance(mid) < bound)
        })
    }

    fn angle_candidates(
        &self,
        start: VertexId,
        end: VertexId,
        original: &[Point],
        best: &mut TopK,
    ) {
        let from = self.network.vertex(start).position();
        let to = self.network.vertex(end).position();
        for &angle in self.angles {
            let curve = sweep_candidate(from, to, angle);
            if !Self::passes_precheck(&curve, original, best.to_beat()) {
                continue;
            }
            best.insert(curve, self.cost(&curve, original));
        }
    }

    fn cross_candidates(
        &self,
        cross: CrossId,
        start: VertexId,
        end: VertexId,
        original: &[Point],
        best: &mut TopK,
    ) {
        let from = self.network.vertex(start).position();
        let to = self.network.vertex(end).position();
        let center = self.network.cross(cross).disk().center;

        let through_center = Curve::through_point(from, center, to);
        if let Some(curve) = through_center {
            best.insert(curve, self.cost(&curve, original));
        }

        let reach = self.max_cross_distance;
        if reach <= 0.0 || center.distance(from) <= reach || center.distance(to) <= reach {
            return;
        }
        let line = match through_center.and_then(|c| c.center()) {
            Some(arc_center) => Line::through_points(center, arc_center),
            None => Line::perpendicular_at(center, to - from),
        };
        let offset = line.direction.normalized() * (reach * CROSS_OFFSET_SHRINK);
        for via in [center + offset, center - offset] {
            if let Some(curve) = Curve::through_point(from, via, to) {
                best.insert(curve, self.cost(&curve, original));
            }
        }
    }

    /// Full-circle replacements for the second-to-last vertex of a
    /// circular stroke, passing through the crossings along the stroke.
    fn circle_candidates(
        &self,
        operand: VertexId,
        other: VertexId,
        original: &[Point],
        best: &mut TopK,
    ) {
        let net = self.network;
        let op = net.vertex(operand);
        let center_of = |c: CrossId| net.cross(c).disk().center;
        let passing = |arc: Option<ArcId>| -> Vec<Point> {
            arc.map(|a| {
                net.arc(a)
                    .virtuals()
                    .iter()
                    .copied()
                    .filter(|&c| !net.is_extensible(c))
                    .map(center_of)
                    .collect()
            })
            .unwrap_or_default()
        };

        let other_cross = net.vertex(other).cross();
        let mut constraints: Vec<Point> = Vec::new();
        constraints.extend(other_cross.map(center_of));
        constraints.extend(passing(op.incoming()));
        constraints.extend(op.cross().map(center_of));
        constraints.extend(passing(op.outgoing()));

        match constraints.len() {
            0 => {
                constraints.push(op.position());
                constraints.push(net.vertex(other).position());
            }
            1 => constraints.push(if other_cross.is_some() {
                op.position()
            } else {
                net.vertex(other).position()
            }),
            _ => {}
        }

        let anchor_near = net.vertex(other).position();
        let full_circle = |arc: &Curve| -> Option<Curve> {
            let center = arc.center()?;
            let radius = arc.radius()?;
            Some(Curve::FullCircle {
                center,
                point: Circle::new(center, radius).closest_point(anchor_near),
                clockwise: arc.is_clockwise(),
            })
        };

        if let [c1, c2] = constraints[..] {
            for &angle in self.angles {
                let Some(curve) = full_circle(&sweep_candidate(c1, c2, angle)) else {
                    continue;
                };
                if !Self::passes_precheck(&curve, original, best.to_beat()) {
                    continue;
                }
                best.insert(curve, self.cost(&curve, original));
            }
            return;
        }

        let [c1, c2, c3, rest @ ..] = &constraints[..] else {
            return;
        };
        let Some(curve) = Curve::through_point(*c1, *c2, *c3).as_ref().and_then(full_circle) else {
            return;
        };
        if rest
            .iter()
            .any(|&p| curve.distance_to(p) > self.max_cross_distance - EPS)
        {
            return;
        }
        best.insert(curve, self.cost(&curve, original));
    }
}

/// The arc from `from` to `to` whose start tangent deviates `angle`
/// from the chord.
fn sweep_candidate(from: Point, to: Point, angle: f64) -> Curve {
    let tangent = (to - from).rotated(angle).normalized();
    Curve::from_start_tangent(from, tangent, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frechet::PolyhedralDistance;
    use crate::network::StationId;
    use crate::types::SchematizationConfig;

    fn zigzag() -> (StrokeNetwork, Vec<VertexId>) {
        let mut net = StrokeNetwork::new();
        let ids: Vec<StationId> = [(0.0, 0.0), (1.0, 0.4), (2.0, 0.0), (3.0, 0.4)]
            .iter()
            .map(|&(x, y)| net.add_station("", Point::new(x, y), false))
            .collect();
        let stroke = net.add_stroke("z", &ids, false).unwrap();
        let vertices = net.stroke(stroke).vertices().to_vec();
        (net, vertices)
    }

    fn generator<'a>(
        net: &'a StrokeNetwork,
        frechet: &'a FrechetDistance,
        angles: &'a [f64],
    ) -> CandidateGenerator<'a> {
        CandidateGenerator {
            network: net,
            frechet,
            angles,
            max_cross_distance: 0.05,
            straight_reduction: 1.0,
            capacity: 3,
        }
    }

    #[test]
    fn top_k_keeps_cheapest_in_order() {
        let seg = Curve::Segment {
            start: Point::ORIGIN,
            end: Point::new(1.0, 0.0),
        };
        let mut best = TopK::new(2);
        best.insert(seg, 3.0);
        assert!(best.to_beat().is_none());
        best.insert(seg, 1.0);
        assert_eq!(best.to_beat(), Some(3.0));
        best.insert(seg, 2.0);
        best.insert(seg, 5.0);
        let costs: Vec<f64> = best.into_vec().iter().map(|c| c.cost).collect();
        assert_eq!(costs, vec![1.0, 2.0]);
    }

    #[test]
    fn original_stations_span_both_arcs() {
        let (net, vertices) = zigzag();
        let frechet = FrechetDistance::new(PolyhedralDistance::l_infinity());
        let cg = generator(&net, &frechet, &[0.0]);
        let stations = cg.original_stations(vertices[1]);
        assert_eq!(
            stations,
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.4), Point::new(2.0, 0.0)]
        );
    }

    #[test]
    fn endpoints_get_no_candidates() {
        let (net, vertices) = zigzag();
        let frechet = FrechetDistance::new(PolyhedralDistance::l_infinity());
        let angles = SchematizationConfig::default().sweep_angles();
        let cg = generator(&net, &frechet, &angles);
        assert!(cg.generate(vertices[0]).is_empty());
        assert!(cg.generate(vertices[3]).is_empty());
    }

    #[test]
    fn bend_candidates_are_ranked_and_bounded() {
        let (net, vertices) = zigzag();
        let frechet = FrechetDistance::new(PolyhedralDistance::l_infinity());
        let angles = SchematizationConfig::default().sweep_angles();
        let cg = generator(&net, &frechet, &angles);
        let candidates = cg.generate(vertices[1]);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.windows(2).all(|w| w[0].cost <= w[1].cost));
        // The straight chord misses the bend by 0.4; an arc bulging up
        // does better.
        assert!(candidates[0].cost < 0.4);
        assert!(!candidates[0].curve.is_straight());
        for c in &candidates {
            assert!(c.curve.start().approx_eq(Point::new(0.0, 0.0)));
            assert!(c.curve.end().approx_eq(Point::new(2.0, 0.0)));
        }
    }

    #[test]
    fn straight_reduction_scales_segment_cost() {
        let (net, vertices) = zigzag();
        let frechet = FrechetDistance::new(PolyhedralDistance::l_infinity());
        let mut cg = generator(&net, &frechet, &[0.0]);
        let original = cg.original_stations(vertices[1]);
        let chord = Curve::Segment {
            start: Point::new(0.0, 0.0),
            end: Point::new(2.0, 0.0),
        };
        let full = cg.cost(&chord, &original);
        assert!((full - 0.4).abs() < 1e-9);
        cg.straight_reduction = 0.5;
        assert!((cg.cost(&chord, &original) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn two_vertex_ring_gets_full_circles() {
        let mut net = StrokeNetwork::new();
        let ids: Vec<StationId> = [(0.0, 0.0), (2.0, 0.0)]
            .iter()
            .map(|&(x, y)| net.add_station("", Point::new(x, y), false))
            .collect();
        let stroke = net.add_stroke("ring", &ids, true).unwrap();
        let vertices = net.stroke(stroke).vertices().to_vec();
        let frechet = FrechetDistance::new(PolyhedralDistance::l_infinity());
        let angles = SchematizationConfig::default().sweep_angles();
        let cg = generator(&net, &frechet, &angles);
        let candidates = cg.generate(vertices[1]);
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(matches!(c.curve, Curve::FullCircle { .. }));
            assert!(c.curve.start().approx_eq(Point::new(0.0, 0.0)));
        }
    }
}
