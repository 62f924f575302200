//! Fréchet distance between polylines under a convex polyhedral point
//! distance.
//!
//! The dynamic program walks the free-space diagram cell by cell. For
//! each row and column it keeps a monotone queue of candidate entry
//! points together with an [`UpperEnvelope`] of the distance functions
//! along the current segment, which makes the lowest feasible leash
//! length on every cell boundary available in amortized constant time
//! per facet.

mod distance;
mod envelope;

use std::collections::VecDeque;

pub use distance::{DistanceFunction, PolyhedralDistance};
pub use envelope::PolyhedralUpperEnvelope;

use crate::types::{ConfigError, DistanceKind, Point};

/// Upper envelope of distance functions along one fixed segment
/// `p1`–`p2`, parameterized over `[0, 1]`.
pub trait UpperEnvelope {
    /// Add the distance function to point `q`, tagged with `index`.
    fn add(&mut self, index: usize, q: Point);

    /// Drop every function tagged with an index at or below `index`.
    fn remove_upto(&mut self, index: usize);

    /// Drop every function.
    fn clear(&mut self);

    /// Minimum over `[0, 1]` of the envelope, raised to at least each of
    /// `constants`.
    fn find_minimum(&self, constants: &[f64]) -> f64;

    /// Forget functions that can no longer attain the minimum once the
    /// sweep moves past this segment.
    fn truncate_last(&mut self);
}

/// A distance function that can build upper envelopes.
pub trait EnvelopeDistance: DistanceFunction {
    /// Envelope over segment `p1`–`p2`.
    fn envelope(&self, p1: Point, p2: Point) -> impl UpperEnvelope;
}

/// Fréchet distance calculator.
#[derive(Debug, Clone)]
pub struct FrechetDistance<D = PolyhedralDistance> {
    distance: D,
}

impl FrechetDistance<PolyhedralDistance> {
    /// Calculator for a configured distance kind.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the distance cannot be built.
    pub fn from_kind(kind: &DistanceKind) -> Result<Self, ConfigError> {
        Ok(Self::new(PolyhedralDistance::from_kind(kind)?))
    }
}

impl<D: EnvelopeDistance> FrechetDistance<D> {
    /// Wrap a point distance.
    #[must_use]
    pub const fn new(distance: D) -> Self {
        Self { distance }
    }

    /// The underlying point distance.
    #[must_use]
    pub const fn distance_function(&self) -> &D {
        &self.distance
    }

    /// Fréchet distance between polylines `p` and `q`.
    ///
    /// A single-point polyline is at the largest distance from that point
    /// to any vertex of the other. An empty polyline is infinitely far.
    #[must_use]
    pub fn distance(&self, p: &[Point], q: &[Point]) -> f64 {
        match (p, q) {
            ([], _) | (_, []) => f64::INFINITY,
            ([single], other) | (other, [single]) => other
                .iter()
                .map(|v| self.distance.distance(*single, *v))
                .fold(f64::NEG_INFINITY, f64::max),
            _ => self.free_space(p, q),
        }
    }

    /// Whether the Fréchet distance is at most `bound`.
    #[must_use]
    pub fn within(&self, p: &[Point], q: &[Point], bound: f64) -> bool {
        self.distance(p, q) <= bound
    }

    #[allow(clippy::many_single_char_names, clippy::similar_names)]
    fn free_space(&self, p: &[Point], q: &[Point]) -> f64 {
        let n = p.len() - 1;
        let m = q.len() - 1;

        let mut column_queues: Vec<VecDeque<usize>> = vec![VecDeque::new(); n];
        let mut column_envelopes: Vec<_> = (0..n)
            .map(|i| self.distance.envelope(p[i], p[i + 1]))
            .collect();
        let mut row_queues: Vec<VecDeque<usize>> = vec![VecDeque::new(); m];
        let mut row_envelopes: Vec<_> = (0..m)
            .map(|j| self.distance.envelope(q[j], q[j + 1]))
            .collect();

        // left[i][j]: lowest leash to enter cell (i, j) through its left
        // boundary; bottom[i][j]: through its bottom boundary.
        let mut left = vec![vec![f64::INFINITY; m]; n];
        let mut bottom = vec![vec![f64::INFINITY; m]; n];
        left[0][0] = self.distance.distance(p[0], q[0]);
        bottom[0][0] = left[0][0];

        for i in 0..n {
            for j in 0..m {
                if i + 1 < n {
                    let queue = &mut row_queues[j];
                    let env = &mut row_envelopes[j];

                    while queue.back().is_some_and(|&last| bottom[last][j] > bottom[i][j]) {
                        queue.pop_back();
                    }
                    queue.push_back(i);
                    if queue.len() == 1 {
                        env.clear();
                    }
                    env.add(i + 1, p[i + 1]);

                    let mut h = queue.front().copied().unwrap_or(i);
                    let mut min = row_minimum(&*env, h, i, left[i][j], bottom[h][j]);
                    while queue.len() > 1 && queue.get(1).is_some_and(|&k| bottom[k][j] <= min) {
                        queue.pop_front();
                        h = queue.front().copied().unwrap_or(i);
                        env.remove_upto(h);
                        min = row_minimum(&*env, h, i, left[i][j], bottom[h][j]);
                    }

                    left[i + 1][j] = min;
                    env.truncate_last();
                }

                if j + 1 < m {
                    let queue = &mut column_queues[i];
                    let env = &mut column_envelopes[i];

                    while queue.back().is_some_and(|&last| left[i][last] >= left[i][j]) {
                        queue.pop_back();
                    }
                    queue.push_back(j);
                    if queue.len() == 1 {
                        env.clear();
                    }
                    env.add(j + 1, q[j + 1]);

                    let mut h = queue.front().copied().unwrap_or(j);
                    let mut min = row_minimum(&*env, h, j, bottom[i][j], left[i][h]);
                    while queue.len() > 1 && queue.get(1).is_some_and(|&k| left[i][k] <= min) {
                        queue.pop_front();
                        h = queue.front().copied().unwrap_or(j);
                        env.remove_upto(h);
                        min = row_minimum(&*env, h, j, bottom[i][j], left[i][h]);
                    }

                    bottom[i][j + 1] = min;
                    env.truncate_last();
                }
            }
        }

        self.distance
            .distance(p[n], q[m])
            .max(left[n - 1][m - 1].min(bottom[n - 1][m - 1]))
    }
}

/// Envelope minimum constrained by the queue head's boundary value and,
/// when the head lies behind the current cell, by the current cell's
/// own entry value.
fn row_minimum(
    env: &impl UpperEnvelope,
    head: usize,
    current: usize,
    own: f64,
    head_value: f64,
) -> f64 {
    if head < current {
        env.find_minimum(&[own, head_value])
    } else {
        env.find_minimum(&[head_value])
    }
}
