//! Stroke network: strokes of vertices joined by arcs, and crossings
//! where strokes meet.
//!
//! Entities live in per-kind arenas and refer to each other through
//! typed handles. Removed entities are tombstoned rather than freed, so
//! a handle never changes meaning during a run.

mod builder;
mod cross;

use std::fmt;

use geo::BoundingRect;
use serde::{Deserialize, Serialize};

pub use builder::{LineInput, NetworkInput, StationInput};
pub use cross::StrokeCross;

use crate::geometry::{Circle, Curve};
use crate::types::Point;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            #[allow(clippy::cast_possible_truncation)]
            pub(crate) const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Position in the owning arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// Handle to a [`Station`].
    StationId,
    "station"
);
handle!(
    /// Handle to a [`Stroke`].
    StrokeId,
    "stroke"
);
handle!(
    /// Handle to a [`StrokeVertex`].
    VertexId,
    "vertex"
);
handle!(
    /// Handle to a [`StrokeArc`].
    ArcId,
    "arc"
);
handle!(
    /// Handle to a [`StrokeCross`].
    CrossId,
    "cross"
);

/// A station of the input network. Immutable once added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Display label.
    pub label: String,
    /// Input position.
    pub position: Point,
    /// Added by planarization where two input edges cross.
    pub is_virtual: bool,
}

/// One edge of the input network, oriented along its stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalEdge {
    /// Station the edge leaves.
    pub from: StationId,
    /// Station the edge reaches.
    pub to: StationId,
}

/// Geometry of an arc, apart from its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArcShape {
    /// Straight segment.
    Straight,
    /// Circular arc.
    Circular {
        /// Circle center.
        center: Point,
        /// Travel direction.
        clockwise: bool,
    },
    /// Complete circle through `anchor`.
    FullCircle {
        /// Circle center.
        center: Point,
        /// Point where the circle starts and ends.
        anchor: Point,
        /// Travel direction.
        clockwise: bool,
    },
}

impl ArcShape {
    /// Shape of a curve, dropping its endpoints.
    #[must_use]
    pub const fn of(curve: &Curve) -> Self {
        match *curve {
            Curve::Segment { .. } => Self::Straight,
            Curve::Arc {
                center, clockwise, ..
            } => Self::Circular { center, clockwise },
            Curve::FullCircle {
                center,
                point,
                clockwise,
            } => Self::FullCircle {
                center,
                anchor: point,
                clockwise,
            },
        }
    }
}

/// A vertex of a stroke, initially at its station's position.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeVertex {
    position: Point,
    station: StationId,
    stroke: StrokeId,
    cross: Option<CrossId>,
    incoming: Option<ArcId>,
    outgoing: Option<ArcId>,
    alive: bool,
}

impl StrokeVertex {
    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Station this vertex represents.
    #[must_use]
    pub const fn station(&self) -> StationId {
        self.station
    }

    /// Owning stroke.
    #[must_use]
    pub const fn stroke(&self) -> StrokeId {
        self.stroke
    }

    /// Crossing this vertex concretely sits on.
    #[must_use]
    pub const fn cross(&self) -> Option<CrossId> {
        self.cross
    }

    /// Arc arriving at this vertex.
    #[must_use]
    pub const fn incoming(&self) -> Option<ArcId> {
        self.incoming
    }

    /// Arc leaving this vertex.
    #[must_use]
    pub const fn outgoing(&self) -> Option<ArcId> {
        self.outgoing
    }

    /// First or last vertex of an open stroke.
    #[must_use]
    pub const fn is_stroke_endpoint(&self) -> bool {
        self.incoming.is_none() || self.outgoing.is_none()
    }

    /// Still part of the network.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }
}

/// An arc between two consecutive vertices of a stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeArc {
    start: VertexId,
    end: VertexId,
    shape: ArcShape,
    virtuals: Vec<CrossId>,
    originals: Vec<OriginalEdge>,
    alive: bool,
}

impl StrokeArc {
    /// Vertex the arc leaves.
    #[must_use]
    pub const fn start(&self) -> VertexId {
        self.start
    }

    /// Vertex the arc reaches.
    #[must_use]
    pub const fn end(&self) -> VertexId {
        self.end
    }

    /// Geometry apart from the endpoints.
    #[must_use]
    pub const fn shape(&self) -> ArcShape {
        self.shape
    }

    /// Crossings this arc passes through without a vertex, in order
    /// along the arc.
    #[must_use]
    pub fn virtuals(&self) -> &[CrossId] {
        &self.virtuals
    }

    /// Input edges this arc stands in for, in stroke order.
    #[must_use]
    pub fn originals(&self) -> &[OriginalEdge] {
        &self.originals
    }

    /// Still part of the network.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }
}

/// An ordered chain of vertices; circular strokes close back on their
/// first vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    label: String,
    vertices: Vec<VertexId>,
    circular: bool,
    alive: bool,
}

impl Stroke {
    /// Display label, taken from the input line.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Vertices in order.
    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Whether the last vertex connects back to the first.
    #[must_use]
    pub const fn is_circular(&self) -> bool {
        self.circular
    }

    /// Number of arcs.
    #[must_use]
    pub const fn arc_count(&self) -> usize {
        if self.circular {
            self.vertices.len()
        } else {
            self.vertices.len().saturating_sub(1)
        }
    }

    /// Still part of the network.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Errors raised while building or mutating a stroke network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// A line refers to a station that does not exist.
    #[error("station index {0} is out of range")]
    UnknownStation(usize),

    /// A line needs at least two stations.
    #[error("line {line} has fewer than two distinct stations")]
    StrokeTooShort {
        /// Offending line.
        line: usize,
    },

    /// A station may appear only once per line, apart from the closing
    /// station of a circular line.
    #[error("station {station} appears more than once on line {line}")]
    RepeatedStation {
        /// Offending line.
        line: usize,
        /// Repeated station.
        station: usize,
    },

    /// Two input edges overlap along a piece of positive length.
    #[error("edges of lines {first} and {second} overlap")]
    Overlap {
        /// One of the overlapping lines.
        first: usize,
        /// The other overlapping line.
        second: usize,
    },

    /// An internal invariant does not hold.
    #[error("network is inconsistent: {0}")]
    Inconsistent(&'static str),
}

/// The mutable stroke network.
#[derive(Debug, Clone, Default)]
pub struct StrokeNetwork {
    stations: Vec<Station>,
    strokes: Vec<Stroke>,
    vertices: Vec<StrokeVertex>,
    arcs: Vec<StrokeArc>,
    crosses: Vec<StrokeCross>,
}

impl StrokeNetwork {
    /// Create an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Stations
    // -----------------------------------------------------------------------

    /// Add a station.
    pub fn add_station(
        &mut self,
        label: impl Into<String>,
        position: Point,
        is_virtual: bool,
    ) -> StationId {
        let id = StationId::from_index(self.stations.len());
        self.stations.push(Station {
            label: label.into(),
            position,
            is_virtual,
        });
        id
    }

    /// Station by handle.
    #[must_use]
    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.index()]
    }

    /// All stations.
    pub fn stations(&self) -> impl Iterator<Item = (StationId, &Station)> {
        self.stations
            .iter()
            .enumerate()
            .map(|(i, s)| (StationId::from_index(i), s))
    }

    // -----------------------------------------------------------------------
    // Strokes
    // -----------------------------------------------------------------------

    /// Add a stroke visiting `stations` in order, joined by straight arcs.
    /// A circular stroke also gets an arc from the last station back to
    /// the first.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StrokeTooShort`] for fewer than two
    /// stations and [`NetworkError::RepeatedStation`] if a station occurs
    /// twice.
    pub fn add_stroke(
        &mut self,
        label: impl Into<String>,
        stations: &[StationId],
        circular: bool,
    ) -> Result<StrokeId, NetworkError> {
        let stroke = StrokeId::from_index(self.strokes.len());
        if stations.len() < 2 {
            return Err(NetworkError::StrokeTooShort {
                line: stroke.index(),
            });
        }
        for (i, s) in stations.iter().enumerate() {
            if s.index() >= self.stations.len() {
                return Err(NetworkError::UnknownStation(s.index()));
            }
            if stations[..i].contains(s) {
                return Err(NetworkError::RepeatedStation {
                    line: stroke.index(),
                    station: s.index(),
                });
            }
        }

        let vertex_ids: Vec<VertexId> = stations
            .iter()
            .map(|&station| {
                let id = VertexId::from_index(self.vertices.len());
                self.vertices.push(StrokeVertex {
                    position: self.stations[station.index()].position,
                    station,
                    stroke,
                    cross: None,
                    incoming: None,
                    outgoing: None,
                    alive: true,
                });
                id
            })
            .collect();

        let mut links: Vec<(VertexId, VertexId)> =
            vertex_ids.windows(2).map(|w| (w[0], w[1])).collect();
        if circular && let (Some(&first), Some(&last)) = (vertex_ids.first(), vertex_ids.last()) {
            links.push((last, first));
        }
        for (from, to) in links {
            let arc = ArcId::from_index(self.arcs.len());
            self.arcs.push(StrokeArc {
                start: from,
                end: to,
                shape: ArcShape::Straight,
                virtuals: Vec::new(),
                originals: vec![OriginalEdge {
                    from: self.vertices[from.index()].station,
                    to: self.vertices[to.index()].station,
                }],
                alive: true,
            });
            self.vertices[from.index()].outgoing = Some(arc);
            self.vertices[to.index()].incoming = Some(arc);
        }

        self.strokes.push(Stroke {
            label: label.into(),
            vertices: vertex_ids,
            circular,
            alive: true,
        });
        Ok(stroke)
    }

    /// Remove a stroke with its vertices and arcs, and drop it from every
    /// crossing.
    pub fn remove_stroke(&mut self, id: StrokeId) {
        let stroke = &mut self.strokes[id.index()];
        if !stroke.alive {
            return;
        }
        stroke.alive = false;
        let vertices = std::mem::take(&mut stroke.vertices);
        for v in vertices {
            let vertex = &mut self.vertices[v.index()];
            vertex.alive = false;
            if let Some(arc) = vertex.outgoing {
                self.arcs[arc.index()].alive = false;
            }
            if let Some(arc) = vertex.incoming {
                self.arcs[arc.index()].alive = false;
            }
        }
        for cross in &mut self.crosses {
            cross.forget_stroke(id);
        }
    }

    /// Stroke by handle.
    #[must_use]
    pub fn stroke(&self, id: StrokeId) -> &Stroke {
        &self.strokes[id.index()]
    }

    /// Live strokes in creation order.
    pub fn strokes(&self) -> impl Iterator<Item = StrokeId> + '_ {
        self.strokes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, _)| StrokeId::from_index(i))
    }

    // -----------------------------------------------------------------------
    // Vertices and arcs
    // -----------------------------------------------------------------------

    /// Vertex by handle.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> &StrokeVertex {
        &self.vertices[id.index()]
    }

    /// Arc by handle.
    #[must_use]
    pub fn arc(&self, id: ArcId) -> &StrokeArc {
        &self.arcs[id.index()]
    }

    /// Live vertices, stroke by stroke in stroke order.
    #[must_use]
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.strokes()
            .flat_map(|s| self.stroke(s).vertices.iter().copied())
            .collect()
    }

    /// Live arcs, stroke by stroke in stroke order.
    #[must_use]
    pub fn arc_ids(&self) -> Vec<ArcId> {
        let mut arcs = Vec::with_capacity(self.arc_count());
        for s in self.strokes() {
            let stroke = self.stroke(s);
            for &v in stroke.vertices.iter().take(stroke.arc_count()) {
                if let Some(arc) = self.vertex(v).outgoing {
                    arcs.push(arc);
                }
            }
        }
        arcs
    }

    /// Total number of arcs: the network's complexity.
    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.strokes().map(|s| self.stroke(s).arc_count()).sum()
    }

    /// Geometry of an arc from its current endpoint positions.
    #[must_use]
    pub fn curve(&self, id: ArcId) -> Curve {
        let arc = self.arc(id);
        let start = self.vertex(arc.start).position;
        let end = self.vertex(arc.end).position;
        match arc.shape {
            ArcShape::Straight => Curve::Segment { start, end },
            ArcShape::Circular { center, clockwise } => Curve::Arc {
                center,
                start,
                end,
                clockwise,
            },
            ArcShape::FullCircle {
                center,
                anchor,
                clockwise,
            } => Curve::FullCircle {
                center,
                point: anchor,
                clockwise,
            },
        }
    }

    /// Stroke owning an arc.
    #[must_use]
    pub fn arc_stroke(&self, id: ArcId) -> StrokeId {
        self.vertex(self.arc(id).start).stroke
    }

    /// Vertex before `id` on its stroke.
    #[must_use]
    pub fn previous(&self, id: VertexId) -> Option<VertexId> {
        self.vertex(id).incoming.map(|a| self.arc(a).start)
    }

    /// Vertex after `id` on its stroke.
    #[must_use]
    pub fn next(&self, id: VertexId) -> Option<VertexId> {
        self.vertex(id).outgoing.map(|a| self.arc(a).end)
    }

    /// Move a vertex.
    pub fn set_vertex_position(&mut self, id: VertexId, position: Point) {
        self.vertices[id.index()].position = position;
    }

    /// Axis-aligned bounds of all live vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Option<geo::Rect<f64>> {
        let points: geo::MultiPoint<f64> = self
            .vertex_ids()
            .into_iter()
            .map(|v| {
                let p = self.vertex(v).position;
                geo::Point::new(p.x, p.y)
            })
            .collect();
        points.bounding_rect()
    }

    /// Length of the bounding box diagonal, 0 for an empty network.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.bounding_box().map_or(0.0, |rect| {
            let (w, h) = (rect.width(), rect.height());
            w.hypot(h)
        })
    }

    /// Replace vertex `id` and its two arcs by a single arc with geometry
    /// `curve` joining its neighbours.
    ///
    /// The new arc inherits the virtual crossings of both old arcs, with
    /// the vertex's own crossing in between, and every one of those
    /// crossings is updated to route the stroke through the new arc.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Inconsistent`] if the vertex is dead or is
    /// a stroke endpoint.
    pub fn replace_vertex(&mut self, id: VertexId, curve: &Curve) -> Result<ArcId, NetworkError> {
        let vertex = self.vertex(id).clone();
        if !vertex.alive {
            return Err(NetworkError::Inconsistent("replacing a removed vertex"));
        }
        let (Some(inc), Some(out)) = (vertex.incoming, vertex.outgoing) else {
            return Err(NetworkError::Inconsistent("replacing a stroke endpoint"));
        };
        let from = self.arc(inc).start;
        let to = self.arc(out).end;

        let mut virtuals = self.arc(inc).virtuals.clone();
        virtuals.extend(vertex.cross);
        virtuals.extend(self.arc(out).virtuals.iter().copied());
        let mut originals = self.arc(inc).originals.clone();
        originals.extend(self.arc(out).originals.iter().copied());

        let arc = ArcId::from_index(self.arcs.len());
        self.arcs.push(StrokeArc {
            start: from,
            end: to,
            shape: ArcShape::of(curve),
            virtuals: virtuals.clone(),
            originals,
            alive: true,
        });
        self.vertices[from.index()].outgoing = Some(arc);
        self.vertices[to.index()].incoming = Some(arc);
        self.arcs[inc.index()].alive = false;
        self.arcs[out.index()].alive = false;

        let removed = &mut self.vertices[id.index()];
        removed.alive = false;
        removed.incoming = None;
        removed.outgoing = None;
        self.strokes[vertex.stroke.index()]
            .vertices
            .retain(|&v| v != id);

        for cross in virtuals {
            self.change_stroke(cross, vertex.stroke, arc);
        }
        Ok(arc)
    }

    // -----------------------------------------------------------------------
    // Crossings
    // -----------------------------------------------------------------------

    /// Add a crossing at `station` where the given vertices meet.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Inconsistent`] if a vertex is dead, already
    /// on a crossing, or shares a stroke with another listed vertex.
    pub fn add_cross(
        &mut self,
        station: StationId,
        vertices: &[VertexId],
    ) -> Result<CrossId, NetworkError> {
        let id = CrossId::from_index(self.crosses.len());
        let mut cross = StrokeCross::new(station, self.station(station).position);
        for &v in vertices {
            let vertex = self.vertex(v);
            if !vertex.alive || vertex.cross.is_some() {
                return Err(NetworkError::Inconsistent(
                    "crossing vertex is removed or already crossed",
                ));
            }
            if !cross.add_concrete(vertex.stroke, v) {
                return Err(NetworkError::Inconsistent(
                    "crossing visits a stroke twice",
                ));
            }
        }
        for &v in vertices {
            self.vertices[v.index()].cross = Some(id);
        }
        self.crosses.push(cross);
        Ok(id)
    }

    /// Remove a crossing, detaching it from its vertices and arcs.
    pub fn remove_cross(&mut self, id: CrossId) {
        let cross = &mut self.crosses[id.index()];
        if !cross.is_alive() {
            return;
        }
        cross.kill();
        for v in self.crosses[id.index()].concrete().values() {
            self.vertices[v.index()].cross = None;
        }
        for arc in &mut self.arcs {
            arc.virtuals.retain(|&c| c != id);
        }
    }

    /// Crossing by handle.
    #[must_use]
    pub fn cross(&self, id: CrossId) -> &StrokeCross {
        &self.crosses[id.index()]
    }

    /// Live crossings.
    #[must_use]
    pub fn cross_ids(&self) -> Vec<CrossId> {
        self.crosses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_alive())
            .map(|(i, _)| CrossId::from_index(i))
            .collect()
    }

    /// Disks of all live crossings.
    #[must_use]
    pub fn cross_disks(&self) -> Vec<(CrossId, Circle)> {
        self.cross_ids()
            .into_iter()
            .map(|c| (c, *self.cross(c).disk()))
            .collect()
    }
}
