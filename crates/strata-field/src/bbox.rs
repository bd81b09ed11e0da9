//! Axis-aligned bounding boxes.

use glam::DVec3;

/// 3D axis-aligned bounding box.
///
/// A box that has seen no points is invalid; its center and diagonal are
/// zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    /// A box containing nothing.
    pub const EMPTY: Self = Self {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    /// Creates a box from min and max corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.extend(p);
        }
        bbox
    }

    /// Grows the box to contain `point`.
    pub fn extend(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Returns true if the box contains at least one point.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Returns the center, or zero for an invalid box.
    pub fn center(&self) -> DVec3 {
        if self.is_valid() {
            (self.min + self.max) * 0.5
        } else {
            DVec3::ZERO
        }
    }

    /// Returns `max - min`, or zero for an invalid box.
    pub fn diagonal(&self) -> DVec3 {
        if self.is_valid() {
            self.max - self.min
        } else {
            DVec3::ZERO
        }
    }

    /// Checks if this box contains a point.
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_invalid() {
        let b = BBox::EMPTY;
        assert!(!b.is_valid());
        assert_eq!(b.center(), DVec3::ZERO);
        assert_eq!(b.diagonal(), DVec3::ZERO);
    }

    #[test]
    fn test_from_points() {
        let b = BBox::from_points([DVec3::new(1.0, -2.0, 0.0), DVec3::new(-1.0, 2.0, 4.0)]);
        assert!(b.is_valid());
        assert_eq!(b.center(), DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(b.diagonal(), DVec3::new(2.0, 4.0, 4.0));
        assert!(b.contains_point(DVec3::new(0.5, 1.0, 3.0)));
        assert!(!b.contains_point(DVec3::new(0.5, 1.0, 5.0)));
    }

    #[test]
    fn test_single_point_has_zero_diagonal() {
        let b = BBox::from_points([DVec3::ONE]);
        assert!(b.is_valid());
        assert_eq!(b.diagonal(), DVec3::ZERO);
        assert_eq!(b.center(), DVec3::ONE);
    }
}
