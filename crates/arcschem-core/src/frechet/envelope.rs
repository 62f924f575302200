//! Upper envelope of the facet-distance functions along one segment.

use std::collections::VecDeque;

use super::UpperEnvelope;
use super::distance::PolyhedralDistance;
use crate::types::Point;

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: usize,
    height: f64,
    slope: f64,
}

/// One facet's candidate lines, all parallel. Newest at the front;
/// heights strictly decrease from back to front.
#[derive(Debug, Clone)]
struct FacetList {
    facet: Point,
    slope: f64,
    entries: VecDeque<Entry>,
}

/// Envelope for a polyhedral distance, kept as one list of parallel
/// lines per facet with facets sorted by slope.
#[derive(Debug, Clone)]
pub struct PolyhedralUpperEnvelope {
    p1: Point,
    lists: Vec<FacetList>,
}

impl PolyhedralUpperEnvelope {
    /// Envelope over segment `p1`–`p2` for the given facets.
    #[must_use]
    pub fn new(facets: &[Point], p1: Point, p2: Point) -> Self {
        let mut lists: Vec<FacetList> = facets
            .iter()
            .map(|&facet| FacetList {
                facet,
                slope: PolyhedralDistance::facet_slope(p1, p2, facet),
                entries: VecDeque::new(),
            })
            .collect();
        lists.sort_by(|a, b| a.slope.total_cmp(&b.slope));
        Self { p1, lists }
    }
}

/// Parameter where two lines meet; infinite or NaN for parallel lines.
fn meet(a: &Entry, b: &Entry) -> f64 {
    (b.height - a.height) / (a.slope - b.slope)
}

impl UpperEnvelope for PolyhedralUpperEnvelope {
    fn add(&mut self, index: usize, q: Point) {
        let d = self.p1 - q;
        for list in &mut self.lists {
            let entry = Entry {
                index,
                height: PolyhedralDistance::facet_distance(d, list.facet),
                slope: list.slope,
            };
            while list
                .entries
                .front()
                .is_some_and(|front| front.height <= entry.height)
            {
                list.entries.pop_front();
            }
            list.entries.push_front(entry);
        }
    }

    fn remove_upto(&mut self, index: usize) {
        for list in &mut self.lists {
            while list.entries.back().is_some_and(|back| back.index <= index) {
                list.entries.pop_back();
            }
        }
    }

    fn clear(&mut self) {
        for list in &mut self.lists {
            list.entries.clear();
        }
    }

    fn truncate_last(&mut self) {
        for list in self.lists.iter_mut().rev() {
            if list.slope <= 0.0 {
                break;
            }
            list.entries.clear();
        }
    }

    fn find_minimum(&self, constants: &[f64]) -> f64 {
        let mut lines = Vec::with_capacity(self.lists.len());
        for list in &self.lists {
            match list.entries.back() {
                Some(entry) => lines.push(*entry),
                None => return f64::INFINITY,
            }
        }

        // Keep the decreasing part of the envelope over [0, 1], up to the
        // first increasing line before 1.
        let mut env: Vec<Entry> = Vec::with_capacity(lines.len());
        let mut at: Vec<f64> = Vec::with_capacity(lines.len());
        let Some((&first, rest)) = lines.split_first() else {
            return constants.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        };
        env.push(first);
        at.push(0.0);

        for &line in rest {
            let Some(prev) = env.last() else { break };
            at.push(meet(prev, &line));
            env.push(line);
            let mut n = env.len();

            if !at[n - 1].is_finite() {
                if env[n - 1].height > env[n - 2].height {
                    env[n - 2] = env[n - 1];
                    if n > 2 {
                        at[n - 2] = meet(&env[n - 3], &line);
                    }
                }
                n -= 1;
            }

            while n > 1 && at[n - 1] < at[n - 2] {
                env[n - 2] = env[n - 1];
                if n > 2 {
                    at[n - 2] = meet(&env[n - 3], &line);
                }
                n -= 1;
            }

            if n > 1 && (at[n - 1] > 1.0 || env[n - 2].slope > 0.0) {
                n -= 1;
            }

            env.truncate(n);
            at.truncate(n);
        }

        let last = env.len() - 1;
        let top = env[last];
        let min = if top.slope > 0.0 {
            if last > 0 {
                top.slope.mul_add(at[last], top.height)
            } else {
                top.height
            }
        } else {
            top.slope + top.height
        };

        constants.iter().copied().fold(min, f64::max)
    }
}
