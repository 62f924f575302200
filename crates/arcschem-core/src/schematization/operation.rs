use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Curve;
use crate::network::{ArcId, CrossId, VertexId};

/// Why an operation may not be applied right now.
///
/// Reasons accumulate independently; the operation is admissible only
/// while all three sets are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReasons {
    /// Arcs tied to the operation through a shared crossing or an
    /// extension whose expected interaction does not hold.
    pub related_arcs: BTreeSet<ArcId>,
    /// Arcs the replacement would newly intersect.
    pub unrelated_arcs: BTreeSet<ArcId>,
    /// Crossings whose cyclic arc order the replacement would change.
    pub crosses: BTreeSet<CrossId>,
}

impl BlockReasons {
    /// No reason recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.related_arcs.is_empty() && self.unrelated_arcs.is_empty() && self.crosses.is_empty()
    }

    fn clear(&mut self) {
        self.related_arcs.clear();
        self.unrelated_arcs.clear();
        self.crosses.clear();
    }
}

/// Replacement of a vertex and its two arcs by a single arc.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub(super) vertex: VertexId,
    pub(super) replacement: Curve,
    pub(super) cost: f64,
    /// Arcs whose start slides onto the replacement.
    pub(super) start_extension: BTreeSet<ArcId>,
    /// Arcs whose end slides onto the replacement.
    pub(super) end_extension: BTreeSet<ArcId>,
    /// Pieces added to extended arcs, kept to test them against each
    /// other.
    pub(super) extensions: Vec<Curve>,
    pub(super) blocks: BlockReasons,
}

impl Operation {
    pub(super) const fn new(vertex: VertexId, replacement: Curve, cost: f64) -> Self {
        Self {
            vertex,
            replacement,
            cost,
            start_extension: BTreeSet::new(),
            end_extension: BTreeSet::new(),
            extensions: Vec::new(),
            blocks: BlockReasons {
                related_arcs: BTreeSet::new(),
                unrelated_arcs: BTreeSet::new(),
                crosses: BTreeSet::new(),
            },
        }
    }

    /// Vertex the operation removes.
    #[must_use]
    pub const fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Geometry of the arc that replaces the vertex's two arcs.
    #[must_use]
    pub const fn replacement(&self) -> &Curve {
        &self.replacement
    }

    /// Fréchet cost of the replacement against the input stations.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Recorded block reasons.
    #[must_use]
    pub const fn blocks(&self) -> &BlockReasons {
        &self.blocks
    }

    /// Arcs that would be lengthened or shortened alongside the
    /// replacement.
    pub fn extended_arcs(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.start_extension.union(&self.end_extension).copied()
    }

    /// Whether any block reason is recorded.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Forget every interaction, ahead of a full recheck.
    pub(super) fn clear(&mut self) {
        self.start_extension.clear();
        self.end_extension.clear();
        self.extensions.clear();
        self.blocks.clear();
    }

    /// Drop every record of `arc`, which is leaving the network. Returns
    /// `true` when the operation's interactions depended on it and a
    /// full recheck is due.
    pub(super) fn uncheck(&mut self, arc: ArcId) -> bool {
        let mut recheck = self.start_extension.remove(&arc);
        recheck |= self.end_extension.remove(&arc);
        recheck |= self.blocks.related_arcs.remove(&arc);
        self.blocks.unrelated_arcs.remove(&arc);
        recheck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn operation() -> Operation {
        Operation::new(
            VertexId::from_index(1),
            Curve::Segment {
                start: Point::ORIGIN,
                end: Point::new(1.0, 0.0),
            },
            0.5,
        )
    }

    #[test]
    fn unrelated_block_does_not_need_recheck() {
        let mut op = operation();
        let arc = ArcId::from_index(4);
        op.blocks.unrelated_arcs.insert(arc);
        assert!(op.is_blocked());
        assert!(!op.uncheck(arc));
        assert!(!op.is_blocked());
    }

    #[test]
    fn related_block_needs_recheck() {
        let mut op = operation();
        let arc = ArcId::from_index(2);
        op.blocks.related_arcs.insert(arc);
        op.start_extension.insert(arc);
        assert!(op.uncheck(arc));
        assert!(!op.is_blocked());
        assert_eq!(op.extended_arcs().count(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut op = operation();
        op.blocks.crosses.insert(CrossId::from_index(0));
        op.end_extension.insert(ArcId::from_index(1));
        op.clear();
        assert!(!op.is_blocked());
        assert_eq!(op.extended_arcs().count(), 0);
        assert!((op.cost() - 0.5).abs() < f64::EPSILON);
    }
}
