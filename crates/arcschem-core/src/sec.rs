//! Smallest enclosing disk of a finite point set.
//!
//! Welzl's randomized incremental algorithm over a deterministically
//! shuffled copy of the input, so repeated runs give identical disks.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::geometry::Circle;
use crate::types::Point;

/// Seed for the input shuffle.
const SHUFFLE_SEED: u64 = 0x5EC_D15C;

/// Compute the smallest disk containing every point.
///
/// Points within [`EPS`](crate::geometry::EPS) of each other are merged
/// first. Returns `None` for empty input and a zero-radius disk for a
/// single point.
#[must_use]
pub fn smallest_enclosing_disk(points: &[Point]) -> Option<Circle> {
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if !unique.iter().any(|q| q.approx_eq(p)) {
            unique.push(p);
        }
    }

    match unique.as_slice() {
        [] => None,
        [p] => Some(Circle::new(*p, 0.0)),
        [a, b] => Some(Circle::with_diameter(*a, *b)),
        _ => {
            let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
            unique.shuffle(&mut rng);
            Some(welzl(&unique))
        }
    }
}

fn welzl(points: &[Point]) -> Circle {
    let mut disk = Circle::with_diameter(points[0], points[1]);
    for i in 2..points.len() {
        if !disk.contains(points[i]) {
            disk = with_one_boundary(&points[..i], points[i]);
        }
    }
    disk
}

/// Smallest disk containing `prefix` with `q` on its boundary.
fn with_one_boundary(prefix: &[Point], q: Point) -> Circle {
    let mut disk = Circle::with_diameter(prefix[0], q);
    for j in 1..prefix.len() {
        if !disk.contains(prefix[j]) {
            disk = with_two_boundary(&prefix[..j], prefix[j], q);
        }
    }
    disk
}

/// Smallest disk containing `prefix` with `q1` and `q2` on its boundary.
fn with_two_boundary(prefix: &[Point], q1: Point, q2: Point) -> Circle {
    let mut disk = Circle::with_diameter(q1, q2);
    for &p in prefix {
        if !disk.contains(p) {
            disk = circumscribed(p, q1, q2);
        }
    }
    disk
}

/// Circle through three points; collinear triples fall back to the
/// circle on the farthest pair.
fn circumscribed(a: Point, b: Point, c: Point) -> Circle {
    Circle::through(a, b, c).unwrap_or_else(|| {
        let pairs = [(a, b), (b, c), (a, c)];
        let (p, q) = pairs
            .into_iter()
            .max_by(|x, y| x.0.distance(x.1).total_cmp(&y.0.distance(y.1)))
            .unwrap_or((a, b));
        Circle::with_diameter(p, q)
    })
}
