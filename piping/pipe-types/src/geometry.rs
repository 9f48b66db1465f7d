//! Geometric primitives for approximate layout checks.
//!
//! The synthesis pipeline never works with solid geometry. Parts are
//! approximated by axis-aligned [`Envelope`]s, and bends are measured as the
//! planar angle between run directions.
//!
//! # Example
//!
//! ```
//! use pipe_types::geometry::{Envelope, turn_angle_deg};
//! use nalgebra::{Point3, Vector2, Vector3};
//!
//! let a = Envelope::from_center(Point3::origin(), Vector3::new(50.0, 50.0, 50.0));
//! let b = Envelope::from_center(Point3::new(80.0, 0.0, 0.0), Vector3::new(50.0, 50.0, 50.0));
//! assert!(a.overlaps(&b));
//!
//! let angle = turn_angle_deg(&Vector2::new(1.0, 0.0), &Vector2::new(0.0, 1.0)).unwrap();
//! assert!((angle - 90.0).abs() < 1e-9);
//! ```

use nalgebra::{Point3, Vector2, Vector3};

/// An axis-aligned bounding box in layout coordinates.
///
/// Used both for part envelopes and for the padded access envelopes
/// around serviceable components.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Envelope {
    /// Creates a new envelope from two corners.
    ///
    /// The corners are automatically ordered.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates an envelope centered at a point with the given half-extents.
    ///
    /// Negative half-extents are treated as their absolute value.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        let h = half_extents.abs();
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// Returns the center of the envelope.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the half-extents of the envelope.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Returns the full size of the envelope along each axis.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Returns the volume of the envelope.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Checks if a point lies inside the envelope (boundary inclusive).
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Checks whether two envelopes overlap.
    ///
    /// Touching faces count as overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the shortest distance between two envelopes.
    ///
    /// Zero when they overlap or touch.
    #[must_use]
    pub fn separation(&self, other: &Self) -> f64 {
        let gap = |a_min: f64, a_max: f64, b_min: f64, b_max: f64| {
            (b_min - a_max).max(a_min - b_max).max(0.0)
        };
        Vector3::new(
            gap(self.min.x, self.max.x, other.min.x, other.max.x),
            gap(self.min.y, self.max.y, other.min.y, other.max.y),
            gap(self.min.z, self.max.z, other.min.z, other.max.z),
        )
        .norm()
    }

    /// Returns a copy grown by `padding` on each side, per axis.
    #[must_use]
    pub fn padded(&self, padding: Vector3<f64>) -> Self {
        let p = padding.abs();
        Self {
            min: self.min - p,
            max: self.max + p,
        }
    }

    /// Returns a copy grown by the same margin in all directions.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        self.padded(Vector3::new(margin, margin, margin))
    }

    /// Returns a copy moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Returns a copy re-centered on `center`, keeping its size.
    #[must_use]
    pub fn recentered(&self, center: Point3<f64>) -> Self {
        Self::from_center(center, self.half_extents())
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

/// Returns `true` when two points are closer than `clearance` on every axis.
///
/// This is the per-axis proximity test used for node collision checks.
#[must_use]
pub fn within_clearance(a: &Point3<f64>, b: &Point3<f64>, clearance: f64) -> bool {
    let d = a - b;
    d.x.abs() < clearance && d.y.abs() < clearance && d.z.abs() < clearance
}

/// Returns the turn angle in degrees between an incoming and an outgoing
/// run direction, in `[0, 180]`.
///
/// Returns `None` if either direction has zero length, since the angle is
/// then undefined.
#[must_use]
pub fn turn_angle_deg(incoming: &Vector2<f64>, outgoing: &Vector2<f64>) -> Option<f64> {
    let m1 = incoming.norm();
    let m2 = outgoing.norm();
    if m1 <= f64::EPSILON || m2 <= f64::EPSILON || !m1.is_finite() || !m2.is_finite() {
        return None;
    }
    let cos = (incoming.dot(outgoing) / (m1 * m2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Returns the heading of a planar direction in degrees, measured
/// counter-clockwise from +X. Zero for a zero vector.
#[must_use]
pub fn heading_deg(direction: &Vector2<f64>) -> f64 {
    if direction.norm() <= f64::EPSILON {
        return 0.0;
    }
    direction.y.atan2(direction.x).to_degrees()
}

/// Lifts a planar run direction into a unit 3D axis (z = 0).
///
/// Falls back to +X for a zero vector.
#[must_use]
pub fn planar_axis(direction: &Vector2<f64>) -> Vector3<f64> {
    let v = Vector3::new(direction.x, direction.y, 0.0);
    let n = v.norm();
    if n <= f64::EPSILON { Vector3::x() } else { v / n }
}

/// Returns the angle in degrees between two axes, ignoring their sense.
///
/// Antiparallel axes are aligned (0°).
#[must_use]
pub fn axis_deviation_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let (na, nb) = (a.norm(), b.norm());
    if na <= f64::EPSILON || nb <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / (na * nb)).abs().clamp(0.0, 1.0).acos().to_degrees()
}
