//! Convex polyhedral point-distance functions.

use std::f64::consts::{PI, SQRT_2, TAU};

use super::envelope::PolyhedralUpperEnvelope;
use super::{EnvelopeDistance, UpperEnvelope};
use crate::types::{ConfigError, DistanceKind, Point};

/// A symmetric point-to-point distance.
pub trait DistanceFunction {
    /// Distance from `p` to `q`.
    fn distance(&self, p: Point, q: Point) -> f64;
}

/// A distance whose unit ball is a convex polygon.
///
/// Each facet is described by the point on it closest to the origin:
/// the vector is the facet normal and its length encodes the facet's
/// offset. The distance of a displacement is the largest of its
/// normalized projections onto the facets.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyhedralDistance {
    facets: Vec<Point>,
}

impl PolyhedralDistance {
    /// Build from a custom facet list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyFacets`] for an empty list and
    /// [`ConfigError::ZeroFacet`] if a facet is the origin.
    pub fn new(facets: Vec<Point>) -> Result<Self, ConfigError> {
        if facets.is_empty() {
            return Err(ConfigError::EmptyFacets);
        }
        if let Some(i) = facets.iter().position(|f| f.dot(*f) == 0.0) {
            return Err(ConfigError::ZeroFacet(i));
        }
        Ok(Self { facets })
    }

    /// Manhattan distance.
    #[must_use]
    pub fn l1() -> Self {
        Self {
            facets: vec![
                Point::new(0.5, 0.5),
                Point::new(-0.5, 0.5),
                Point::new(-0.5, -0.5),
                Point::new(0.5, -0.5),
            ],
        }
    }

    /// Chebyshev distance.
    #[must_use]
    pub fn l_infinity() -> Self {
        Self {
            facets: vec![
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(-1.0, 0.0),
                Point::new(0.0, -1.0),
            ],
        }
    }

    /// Regular `k`-gon inscribed in the unit circle, one vertex on the
    /// positive x axis. `k` is raised to at least 4 and rounded up to
    /// an even count.
    #[must_use]
    pub fn k_regular(k: usize) -> Self {
        let k = k.max(4).next_multiple_of(2);
        #[allow(clippy::cast_precision_loss)]
        let alpha = TAU / k as f64;
        let mut prev = Point::new(1.0, 0.0);
        let mut facets = Vec::with_capacity(k);
        for _ in 0..k {
            let next = prev.rotated(alpha);
            facets.push((prev + next) * 0.5);
            prev = next;
        }
        Self { facets }
    }

    /// Regular polygon approximating the Euclidean distance within a
    /// factor `epsilon`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEpsilon`] unless `epsilon` is finite
    /// and greater than 1.
    pub fn approximating(epsilon: f64) -> Result<Self, ConfigError> {
        if !epsilon.is_finite() || epsilon <= 1.0 {
            return Err(ConfigError::InvalidEpsilon(epsilon));
        }
        let k = if epsilon >= SQRT_2 {
            4
        } else {
            let raw = (PI * 2.0 / (1.0 / epsilon).acos()).ceil();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let k = raw as usize;
            k
        };
        Ok(Self::k_regular(k))
    }

    /// Build the distance a configuration asks for.
    ///
    /// # Errors
    ///
    /// Propagates the constructor's [`ConfigError`].
    pub fn from_kind(kind: &DistanceKind) -> Result<Self, ConfigError> {
        match kind {
            DistanceKind::L1 => Ok(Self::l1()),
            DistanceKind::LInfinity => Ok(Self::l_infinity()),
            DistanceKind::Approximate { epsilon } => Self::approximating(*epsilon),
            DistanceKind::Custom { facets } => Self::new(facets.clone()),
        }
    }

    /// The facet list.
    #[must_use]
    pub fn facets(&self) -> &[Point] {
        &self.facets
    }

    /// Normalized projection of displacement `d` onto `facet`.
    #[must_use]
    pub fn facet_distance(d: Point, facet: Point) -> f64 {
        facet.dot(d) / facet.dot(facet)
    }

    /// Rate at which the facet distance changes when moving from `p1`
    /// to `p2`.
    #[must_use]
    pub fn facet_slope(p1: Point, p2: Point, facet: Point) -> f64 {
        Self::facet_distance(p2 - p1, facet)
    }

    /// Distance of a displacement vector.
    #[must_use]
    pub fn length(&self, d: Point) -> f64 {
        self.facets
            .iter()
            .map(|f| Self::facet_distance(d, *f))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl DistanceFunction for PolyhedralDistance {
    fn distance(&self, p: Point, q: Point) -> f64 {
        self.length(q - p)
    }
}

impl EnvelopeDistance for PolyhedralDistance {
    fn envelope(&self, p1: Point, p2: Point) -> impl UpperEnvelope {
        PolyhedralUpperEnvelope::new(&self.facets, p1, p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l1_distance() {
        let d = PolyhedralDistance::l1();
        let dist = d.distance(Point::new(0.0, 0.0), Point::new(3.0, -4.0));
        assert!((dist - 7.0).abs() < 1e-12);
    }

    #[test]
    fn l_infinity_distance() {
        let d = PolyhedralDistance::l_infinity();
        let dist = d.distance(Point::new(1.0, 1.0), Point::new(4.0, -3.0));
        assert!((dist - 4.0).abs() < 1e-12);
    }

    #[test]
    fn large_epsilon_uses_square() {
        let d = PolyhedralDistance::approximating(2.0).unwrap();
        assert_eq!(d.facets().len(), 4);
    }

    #[test]
    fn facet_count_even_and_growing() {
        let coarse = PolyhedralDistance::approximating(1.1).unwrap();
        let fine = PolyhedralDistance::approximating(1.01).unwrap();
        assert_eq!(coarse.facets().len() % 2, 0);
        assert_eq!(fine.facets().len() % 2, 0);
        assert!(fine.facets().len() > coarse.facets().len());
    }

    #[test]
    fn approximation_is_within_factor() {
        let eps = 1.01;
        let d = PolyhedralDistance::approximating(eps).unwrap();
        for step in 0..360 {
            let angle = f64::from(step).to_radians();
            let v = Point::new(1.0, 0.0).rotated(angle);
            let dist = d.length(v);
            assert!(dist >= 1.0 - 1e-9, "underestimates at {step}°: {dist}");
            assert!(dist <= eps + 1e-9, "overestimates at {step}°: {dist}");
        }
    }

    #[test]
    fn rejects_invalid_epsilon() {
        assert_eq!(
            PolyhedralDistance::approximating(1.0),
            Err(ConfigError::InvalidEpsilon(1.0))
        );
        assert!(PolyhedralDistance::approximating(f64::NAN).is_err());
    }

    #[test]
    fn rejects_bad_custom_facets() {
        assert_eq!(
            PolyhedralDistance::new(vec![]),
            Err(ConfigError::EmptyFacets)
        );
        assert_eq!(
            PolyhedralDistance::new(vec![Point::new(1.0, 0.0), Point::ORIGIN]),
            Err(ConfigError::ZeroFacet(1))
        );
    }

    #[test]
    fn from_kind_dispatch() {
        let l1 = PolyhedralDistance::from_kind(&DistanceKind::L1).unwrap();
        assert_eq!(l1, PolyhedralDistance::l1());
        let custom = PolyhedralDistance::from_kind(&DistanceKind::Custom {
            facets: vec![Point::new(1.0, 0.0), Point::new(-1.0, 0.0)],
        })
        .unwrap();
        assert_eq!(custom.facets().len(), 2);
    }

    #[test]
    fn slope_matches_distance_change() {
        let facet = Point::new(0.5, 0.5);
        let slope = PolyhedralDistance::facet_slope(Point::ORIGIN, Point::new(2.0, 0.0), facet);
        assert!((slope - 2.0).abs() < 1e-12);
    }
}
