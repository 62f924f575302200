//! Shared types for the arcschem schematization engine.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::geometry::EPS;

/// A 2D point (or displacement vector) in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position (y grows upwards).
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Dot product, treating both points as vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// Z component of the 3D cross product of the two vectors.
    ///
    /// Positive when `other` lies counterclockwise of `self`.
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x.mul_add(other.y, -(self.y * other.x))
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or the zero vector unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            self
        }
    }

    /// Rotate counterclockwise about the origin by `angle` radians.
    #[must_use]
    pub fn rotated(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x.mul_add(cos, -(self.y * sin)),
            self.x.mul_add(sin, self.y * cos),
        )
    }

    /// Rotate by a quarter turn counterclockwise.
    #[must_use]
    pub const fn rotated_ccw90(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotate by a quarter turn clockwise.
    #[must_use]
    pub const fn rotated_cw90(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Linear interpolation: `self` at `t = 0`, `other` at `t = 1`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            t.mul_add(other.x - self.x, self.x),
            t.mul_add(other.y - self.y, self.y),
        )
    }

    /// Both coordinates agree within [`EPS`].
    #[must_use]
    pub fn approx_eq(self, other: Self) -> bool {
        (self.x - other.x).abs() < EPS && (self.y - other.y).abs() < EPS
    }

    /// Angle in `[0, 2π)` swept when rotating `self` counterclockwise
    /// onto the direction of `other`.
    ///
    /// Returns 0 if either vector is zero.
    #[must_use]
    pub fn ccw_angle_to(self, other: Self) -> f64 {
        if self == Self::ORIGIN || other == Self::ORIGIN {
            return 0.0;
        }
        let angle = self.cross(other).atan2(self.dot(other));
        if angle < 0.0 {
            let wrapped = angle + std::f64::consts::TAU;
            if wrapped >= std::f64::consts::TAU {
                0.0
            } else {
                wrapped
            }
        } else {
            angle
        }
    }

    /// Angle in `[0, 2π)` swept when rotating `self` clockwise onto
    /// the direction of `other`.
    #[must_use]
    pub fn cw_angle_to(self, other: Self) -> f64 {
        other.ccw_angle_to(self)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A sequence of connected points.
///
/// Used for the original station chain an arc replaces and for the
/// sampled approximation of a candidate arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Which point-distance measure the Fréchet engine uses.
///
/// Every variant is a convex polyhedral distance; see
/// [`PolyhedralDistance`](crate::frechet::PolyhedralDistance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceKind {
    /// Manhattan distance.
    L1,
    /// Chebyshev distance.
    LInfinity,
    /// Regular polygon approximating the Euclidean distance to within a
    /// multiplicative factor `epsilon > 1`.
    Approximate {
        /// Approximation factor.
        epsilon: f64,
    },
    /// Custom facet list; each facet is given by its closest point to
    /// the origin.
    Custom {
        /// Facet points.
        facets: Vec<Point>,
    },
}

impl Default for DistanceKind {
    fn default() -> Self {
        Self::Approximate {
            epsilon: SchematizationConfig::DEFAULT_EPSILON,
        }
    }
}

/// Configuration for the iterative schematization engine.
///
/// Run limits (complexity floor, cost threshold) are passed per step
/// and live in [`RunLimits`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchematizationConfig {
    /// Allow operations on vertices that concretely sit on a crossing.
    pub allow_high_degree: bool,

    /// Maximum displacement of a crossing, as a fraction of the
    /// network's bounding-box diagonal.
    pub max_cross_distance_fraction: f64,

    /// Resolution of the tangent-angle sweep. The angle step is
    /// `1.8π / (angle_steps - 1)`.
    pub angle_steps: usize,

    /// Number of candidate replacements kept per vertex.
    pub candidates: usize,

    /// Multiplier applied to the cost of straight replacements.
    /// Values below 1 favour straight segments.
    pub straight_reduction: f64,

    /// Point-distance measure for the Fréchet engine.
    pub distance: DistanceKind,

    /// Keep a replayable history of every committed step.
    pub record_history: bool,
}

impl SchematizationConfig {
    /// Default for [`allow_high_degree`](Self::allow_high_degree).
    pub const DEFAULT_ALLOW_HIGH_DEGREE: bool = true;
    /// Default for [`max_cross_distance_fraction`](Self::max_cross_distance_fraction).
    pub const DEFAULT_MAX_CROSS_DISTANCE_FRACTION: f64 = 0.0075;
    /// Default for [`angle_steps`](Self::angle_steps).
    pub const DEFAULT_ANGLE_STEPS: usize = 41;
    /// Default for [`candidates`](Self::candidates).
    pub const DEFAULT_CANDIDATES: usize = 3;
    /// Default for [`straight_reduction`](Self::straight_reduction).
    pub const DEFAULT_STRAIGHT_REDUCTION: f64 = 1.0;
    /// Default Euclidean approximation factor.
    pub const DEFAULT_EPSILON: f64 = 1.01;

    /// Check every field against its valid range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.angle_steps < 2 {
            return Err(ConfigError::InvalidAngleSteps(self.angle_steps));
        }
        if self.candidates == 0 {
            return Err(ConfigError::InvalidCandidateCount);
        }
        if !self.max_cross_distance_fraction.is_finite() || self.max_cross_distance_fraction < 0.0
        {
            return Err(ConfigError::InvalidCrossDistance(
                self.max_cross_distance_fraction,
            ));
        }
        if !self.straight_reduction.is_finite() || self.straight_reduction <= 0.0 {
            return Err(ConfigError::InvalidStraightReduction(
                self.straight_reduction,
            ));
        }
        Ok(())
    }

    /// The symmetric list of tangent deviation angles swept by the
    /// candidate generator: `0, step, -step, 2·step, -2·step, …` while
    /// below `0.95π`.
    #[must_use]
    pub fn sweep_angles(&self) -> Vec<f64> {
        let mut angles = vec![0.0];
        #[allow(clippy::cast_precision_loss)]
        let step = 1.8 * std::f64::consts::PI / (self.angle_steps.max(2) - 1) as f64;
        let mut angle = step;
        while angle < 0.95 * std::f64::consts::PI {
            angles.push(angle);
            angles.push(-angle);
            angle += step;
        }
        angles
    }
}

impl Default for SchematizationConfig {
    fn default() -> Self {
        Self {
            allow_high_degree: Self::DEFAULT_ALLOW_HIGH_DEGREE,
            max_cross_distance_fraction: Self::DEFAULT_MAX_CROSS_DISTANCE_FRACTION,
            angle_steps: Self::DEFAULT_ANGLE_STEPS,
            candidates: Self::DEFAULT_CANDIDATES,
            straight_reduction: Self::DEFAULT_STRAIGHT_REDUCTION,
            distance: DistanceKind::default(),
            record_history: false,
        }
    }
}

/// Termination limits for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Stop once the arc count is at or below this floor.
    pub max_complexity: usize,
    /// Stop once the cheapest admissible operation costs more than this.
    pub max_cost: f64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_complexity: 0,
            max_cost: f64::INFINITY,
        }
    }
}

/// Errors raised while validating configuration or building a
/// distance function.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Approximation factor must be finite and greater than 1.
    #[error("approximation factor must be finite and greater than 1, got {0}")]
    InvalidEpsilon(f64),

    /// A custom distance needs at least one facet.
    #[error("distance function needs at least one facet")]
    EmptyFacets,

    /// Facets must not be the origin.
    #[error("facet {0} is the zero vector")]
    ZeroFacet(usize),

    /// The angle sweep needs at least two steps.
    #[error("angle steps must be at least 2, got {0}")]
    InvalidAngleSteps(usize),

    /// At least one candidate must be kept.
    #[error("candidate count must be at least 1")]
    InvalidCandidateCount,

    /// Crossing displacement fraction must be finite and non-negative.
    #[error("crossing distance fraction must be finite and non-negative, got {0}")]
    InvalidCrossDistance(f64),

    /// Straight reduction must be finite and positive.
    #[error("straight reduction must be finite and positive, got {0}")]
    InvalidStraightReduction(f64),
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(a - b, Point::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(-a, Point::new(-1.0, -2.0));
        assert!((a.dot(b) - 1.0).abs() < f64::EPSILON);
        assert!((a.cross(b) + 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rotation_quarter_turns() {
        let v = Point::new(1.0, 0.0);
        assert!(v.rotated(FRAC_PI_2).approx_eq(Point::new(0.0, 1.0)));
        assert_eq!(v.rotated_ccw90(), Point::new(0.0, 1.0));
        assert_eq!(v.rotated_cw90(), Point::new(0.0, -1.0));
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Point::ORIGIN.normalized(), Point::ORIGIN);
        let n = Point::new(3.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ccw_and_cw_angles() {
        let x = Point::new(1.0, 0.0);
        let y = Point::new(0.0, 1.0);
        assert!((x.ccw_angle_to(y) - FRAC_PI_2).abs() < 1e-12);
        assert!((y.ccw_angle_to(x) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((x.cw_angle_to(y) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((x.ccw_angle_to(-x) - PI).abs() < 1e-12);
        assert!(x.ccw_angle_to(x).abs() < 1e-12);
    }

    #[test]
    fn polyline_accessors() {
        let pl = Polyline::new(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        assert_eq!(pl.len(), 2);
        assert_eq!(pl.first(), Some(&Point::new(1.0, 2.0)));
        assert_eq!(pl.last(), Some(&Point::new(3.0, 4.0)));
        assert!(Polyline::new(vec![]).is_empty());
    }

    #[test]
    fn config_defaults() {
        let config = SchematizationConfig::default();
        assert!(config.allow_high_degree);
        assert!((config.max_cross_distance_fraction - 0.0075).abs() < f64::EPSILON);
        assert_eq!(config.angle_steps, 41);
        assert_eq!(config.candidates, 3);
        assert!((config.straight_reduction - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.distance, DistanceKind::Approximate { epsilon: 1.01 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sweep_angles_are_symmetric_and_bounded() {
        let angles = SchematizationConfig::default().sweep_angles();
        assert!(angles[0].abs() < f64::EPSILON);
        assert_eq!(angles.len() % 2, 1);
        for pair in angles[1..].chunks(2) {
            assert!((pair[0] + pair[1]).abs() < 1e-12);
            assert!(pair[0] > 0.0 && pair[0] < 0.95 * PI);
        }
        // step = 1.8π/40 = 0.045π, largest multiple below 0.95π is 21 steps.
        assert_eq!(angles.len(), 1 + 2 * 21);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let bad_steps = SchematizationConfig {
            angle_steps: 1,
            ..SchematizationConfig::default()
        };
        assert_eq!(bad_steps.validate(), Err(ConfigError::InvalidAngleSteps(1)));

        let bad_candidates = SchematizationConfig {
            candidates: 0,
            ..SchematizationConfig::default()
        };
        assert_eq!(
            bad_candidates.validate(),
            Err(ConfigError::InvalidCandidateCount)
        );

        let bad_reduction = SchematizationConfig {
            straight_reduction: 0.0,
            ..SchematizationConfig::default()
        };
        assert!(bad_reduction.validate().is_err());
    }

    #[test]
    fn config_partial_json_uses_defaults() {
        let config: SchematizationConfig =
            serde_json::from_str(r#"{"candidates": 5, "distance": {"kind": "l1"}}"#).unwrap();
        assert_eq!(config.candidates, 5);
        assert_eq!(config.distance, DistanceKind::L1);
        assert_eq!(config.angle_steps, 41);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidEpsilon(0.5);
        assert_eq!(
            err.to_string(),
            "approximation factor must be finite and greater than 1, got 0.5"
        );
    }
}
