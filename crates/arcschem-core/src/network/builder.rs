//! Building a stroke network from stations and lines.
//!
//! Every line becomes one stroke. Input edges that cross without sharing
//! a station are split at a new virtual station. Stations visited by
//! more than one stroke become crossings, and the vertices at virtual
//! stations are dissolved again so the strokes pass straight through.

use std::collections::BTreeMap;

use geo::Line;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{NetworkError, StationId, StrokeNetwork, VertexId};
use crate::geometry::{Curve, EPS};
use crate::types::Point;

/// Input description of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInput {
    /// Stations, referred to by index.
    pub stations: Vec<StationInput>,
    /// Lines through the stations.
    pub lines: Vec<LineInput>,
}

/// One input station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInput {
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// One input line: a sequence of station indices. A line whose last
/// station equals its first is circular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Station indices in order.
    pub stations: Vec<usize>,
}

const fn point_to_coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

const fn coord_to_point(c: geo::Coord<f64>) -> Point {
    Point::new(c.x, c.y)
}

/// An undirected input edge between two station indices, with the first
/// line that uses it.
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: usize,
    b: usize,
    line: usize,
}

type IndexedEdge = GeomWithData<Line<f64>, usize>;

impl NetworkInput {
    /// Build the stroke network.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] for unknown or repeated stations, lines
    /// shorter than two stations, overlapping edges, or a line crossing
    /// itself.
    pub fn build(&self) -> Result<StrokeNetwork, NetworkError> {
        let lines = self.validated_lines()?;
        let (positions, routes) = self.planarize(&lines)?;

        let mut net = StrokeNetwork::new();
        let original_count = self.stations.len();
        let station_ids: Vec<StationId> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if i < original_count {
                    net.add_station(self.stations[i].label.clone(), p, false)
                } else {
                    net.add_station(format!("virtual {}", i - original_count + 1), p, true)
                }
            })
            .collect();

        let mut at_station: BTreeMap<usize, Vec<VertexId>> = BTreeMap::new();
        for (line, (route, circular)) in routes.iter().enumerate() {
            let stations: Vec<StationId> = route.iter().map(|&s| station_ids[s]).collect();
            let stroke = net
                .add_stroke(self.lines[line].label.clone(), &stations, *circular)
                .map_err(|err| relabel(err, line))?;
            for (&s, &v) in route.iter().zip(net.stroke(stroke).vertices()) {
                at_station.entry(s).or_default().push(v);
            }
        }

        let mut virtual_vertices = Vec::new();
        for (&station, vertices) in &at_station {
            if vertices.len() < 2 {
                continue;
            }
            net.add_cross(station_ids[station], vertices)?;
            if station >= original_count {
                virtual_vertices.extend(vertices.iter().copied());
            }
        }

        for v in virtual_vertices {
            let (Some(prev), Some(next)) = (net.previous(v), net.next(v)) else {
                return Err(NetworkError::Inconsistent(
                    "virtual station at a stroke endpoint",
                ));
            };
            let segment = Curve::Segment {
                start: net.vertex(prev).position(),
                end: net.vertex(next).position(),
            };
            net.replace_vertex(v, &segment)?;
        }

        debug!(
            stations = positions.len(),
            virtual_stations = positions.len() - original_count,
            strokes = routes.len(),
            crosses = net.cross_ids().len(),
            arcs = net.arc_count(),
            "built stroke network"
        );
        Ok(net)
    }

    /// Check station references and split off the closing station of
    /// circular lines.
    fn validated_lines(&self) -> Result<Vec<(Vec<usize>, bool)>, NetworkError> {
        self.lines
            .iter()
            .enumerate()
            .map(|(line, input)| {
                if let Some(&bad) = input.stations.iter().find(|&&s| s >= self.stations.len()) {
                    return Err(NetworkError::UnknownStation(bad));
                }
                let mut route = input.stations.clone();
                let circular = route.len() > 2 && route.first() == route.last();
                if circular {
                    route.pop();
                }
                if route.len() < 2 {
                    return Err(NetworkError::StrokeTooShort { line });
                }
                for (i, s) in route.iter().enumerate() {
                    if route[..i].contains(s) {
                        return Err(NetworkError::RepeatedStation { line, station: *s });
                    }
                }
                Ok((route, circular))
            })
            .collect()
    }

    /// Split crossing edges. Returns all station positions, new virtual
    /// stations appended, and every line's route through them.
    #[allow(clippy::type_complexity)]
    fn planarize(
        &self,
        lines: &[(Vec<usize>, bool)],
    ) -> Result<(Vec<Point>, Vec<(Vec<usize>, bool)>), NetworkError> {
        let mut positions: Vec<Point> = self
            .stations
            .iter()
            .map(|s| Point::new(s.x, s.y))
            .collect();

        let mut edge_index: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut edges: Vec<Edge> = Vec::new();
        for (line, (route, circular)) in lines.iter().enumerate() {
            for (a, b) in route_edges(route, *circular) {
                let key = (a.min(b), a.max(b));
                edge_index.entry(key).or_insert_with(|| {
                    edges.push(Edge {
                        a: key.0,
                        b: key.1,
                        line,
                    });
                    edges.len() - 1
                });
            }
        }

        let geo_line = |e: &Edge| Line::new(point_to_coord(positions[e.a]), point_to_coord(positions[e.b]));
        let indexed: Vec<IndexedEdge> = edges
            .iter()
            .enumerate()
            .map(|(i, e)| GeomWithData::new(geo_line(e), i))
            .collect();
        let tree = RTree::bulk_load(indexed);

        // Per edge: (parameter from `a` towards `b`, station) split points.
        let mut splits: Vec<Vec<(f64, usize)>> = vec![Vec::new(); edges.len()];
        let mut new_points: Vec<Point> = Vec::new();

        for segment in tree.iter() {
            let envelope = segment.envelope();
            let id = segment.data;
            let edge = edges[id];
            for candidate in tree.locate_in_envelope_intersecting(&envelope) {
                if candidate.data <= id {
                    continue;
                }
                let other = edges[candidate.data];
                if edge.a == other.a || edge.a == other.b || edge.b == other.a || edge.b == other.b {
                    continue;
                }
                match line_intersection(*segment.geom(), *candidate.geom()) {
                    None => {}
                    Some(LineIntersection::Collinear { .. }) => {
                        return Err(NetworkError::Overlap {
                            first: edge.line,
                            second: other.line,
                        });
                    }
                    Some(LineIntersection::SinglePoint {
                        intersection,
                        is_proper,
                    }) => {
                        let p = coord_to_point(intersection);
                        if is_proper {
                            let station = positions.len() + new_points.len();
                            new_points.push(p);
                            splits[id].push((parameter(&positions, edge, p), station));
                            splits[candidate.data].push((parameter(&positions, other, p), station));
                        } else {
                            // A station of one edge touches the interior of
                            // the other; route the other edge through it.
                            for (touching, touched, touched_id) in
                                [(edge, other, candidate.data), (other, edge, id)]
                            {
                                for s in [touching.a, touching.b] {
                                    let t = parameter(&positions, touched, p);
                                    if positions[s].distance(p) < EPS && t > EPS && t < 1.0 - EPS {
                                        splits[touched_id].push((t, s));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        positions.extend(new_points);

        for split in &mut splits {
            split.sort_by(|x, y| x.0.total_cmp(&y.0));
        }

        let routes = lines
            .iter()
            .map(|(route, circular)| {
                let mut expanded = Vec::with_capacity(route.len());
                for (a, b) in route_edges(route, *circular) {
                    expanded.push(a);
                    let key = (a.min(b), a.max(b));
                    let Some(&e) = edge_index.get(&key) else {
                        continue;
                    };
                    let stations = splits[e].iter().map(|&(_, s)| s);
                    if a == key.0 {
                        expanded.extend(stations);
                    } else {
                        expanded.extend(stations.rev());
                    }
                }
                if !*circular && let Some(&last) = route.last() {
                    expanded.push(last);
                }
                (expanded, *circular)
            })
            .collect();

        Ok((positions, routes))
    }
}

/// Consecutive station pairs of a route, including the closing pair of a
/// circular route.
fn route_edges(route: &[usize], circular: bool) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = route.windows(2).map(|w| (w[0], w[1])).collect();
    if circular && let (Some(&first), Some(&last)) = (route.first(), route.last()) {
        pairs.push((last, first));
    }
    pairs
}

/// Position of `p` along an edge, 0 at `a` and 1 at `b`.
fn parameter(positions: &[Point], edge: Edge, p: Point) -> f64 {
    let a = positions[edge.a];
    let d = positions[edge.b] - a;
    (p - a).dot(d) / d.dot(d)
}

/// Errors from `add_stroke` number strokes, which match lines here.
fn relabel(err: NetworkError, line: usize) -> NetworkError {
    match err {
        NetworkError::StrokeTooShort { .. } => NetworkError::StrokeTooShort { line },
        NetworkError::RepeatedStation { station, .. } => {
            NetworkError::RepeatedStation { line, station }
        }
        other => other,
    }
}
