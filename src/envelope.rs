//! Axis-aligned 3D bounding boxes with incremental union

use crate::mesh_ops::{Point3, Vector3};

/// Axis-aligned 3D bounding box
///
/// An envelope starts empty (invalid) and grows by union with points or other
/// envelopes. It never shrinks. Whenever it is valid, `min <= max` holds
/// component-wise.
///
/// # Example
///
/// ```
/// use citygml::{Envelope, mesh_ops::Point3};
///
/// let mut envelope = Envelope::new();
/// assert!(!envelope.is_valid());
///
/// envelope.union_point(&Point3::new(1.0, 2.0, 3.0));
/// envelope.union_point(&Point3::new(-1.0, 0.0, 5.0));
///
/// assert_eq!(envelope.min(), Some(Point3::new(-1.0, 0.0, 3.0)));
/// assert_eq!(envelope.max(), Some(Point3::new(1.0, 2.0, 5.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    min: Point3,
    max: Point3,
    valid: bool,
}

impl Envelope {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            valid: false,
        }
    }

    /// Create an envelope spanning two corners given in any order
    pub fn from_corners(a: &Point3, b: &Point3) -> Self {
        let mut envelope = Self::new();
        envelope.union_point(a);
        envelope.union_point(b);
        envelope
    }

    /// Create the smallest envelope containing all points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut envelope = Self::new();
        for point in points {
            envelope.union_point(point);
        }
        envelope
    }

    /// Grow the envelope to contain `point`
    ///
    /// Points with non-finite coordinates are ignored.
    pub fn union_point(&mut self, point: &Point3) {
        if !point.iter().all(|c| c.is_finite()) {
            return;
        }

        if self.valid {
            self.min = self.min.inf(point);
            self.max = self.max.sup(point);
        } else {
            self.min = *point;
            self.max = *point;
            self.valid = true;
        }
    }

    /// Grow the envelope to contain `other`
    ///
    /// A no-op when `other` is invalid; adopts `other` when `self` is invalid.
    pub fn union_envelope(&mut self, other: &Envelope) {
        if !other.valid {
            return;
        }

        if self.valid {
            self.min = self.min.inf(&other.min);
            self.max = self.max.sup(&other.max);
        } else {
            *self = *other;
        }
    }

    /// Union of two envelopes as a new value
    pub fn union(a: &Envelope, b: &Envelope) -> Envelope {
        let mut result = *a;
        result.union_envelope(b);
        result
    }

    /// True once at least one point has been added
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Lower corner, or `None` while the envelope is empty
    pub fn min(&self) -> Option<Point3> {
        self.valid.then_some(self.min)
    }

    /// Upper corner, or `None` while the envelope is empty
    pub fn max(&self) -> Option<Point3> {
        self.valid.then_some(self.max)
    }

    /// Center of the box
    pub fn center(&self) -> Option<Point3> {
        self.valid.then(|| nalgebra::center(&self.min, &self.max))
    }

    /// Extent along each axis
    pub fn size(&self) -> Option<Vector3> {
        self.valid.then(|| self.max - self.min)
    }

    /// True if `point` lies inside or on the boundary
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.valid
            && (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }

    /// True if `other` lies entirely inside this envelope
    ///
    /// An invalid `other` is contained by every envelope.
    pub fn contains_envelope(&self, other: &Envelope) -> bool {
        if !other.valid {
            return true;
        }
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
