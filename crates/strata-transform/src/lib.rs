//! Affine transforms for positioning generated geometry.
//!
//! [`Transform`] wraps a 4x4 `f64` matrix and is built by composing
//! primitive operations. Every `pre_*` operation left-multiplies: after
//! `t.pre_rotate(..).pre_scale(..).pre_translate(..)` a point is rotated
//! first, then scaled, then translated. Composition order is significant, so
//! algorithms document the exact sequence they apply.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1.0e-12;

/// Errors from transform operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    /// The matrix has no inverse.
    #[error("transform is singular (determinant {0})")]
    Singular(f64),
}

/// A 3D affine transform stored as a column-major 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform {
    matrix: DMat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        matrix: DMat4::IDENTITY,
    };

    /// Wraps an existing matrix.
    pub fn from_matrix(matrix: DMat4) -> Self {
        Self { matrix }
    }

    /// Transform mapping local coordinates in the frame `(x, y, z)` at
    /// `origin` to world coordinates.
    ///
    /// The basis vectors become the first three columns and `origin` the
    /// translation column.
    pub fn from_basis(origin: DVec3, x: DVec3, y: DVec3, z: DVec3) -> Self {
        Self {
            matrix: DMat4::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), origin.extend(1.0)),
        }
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    /// Resets to identity.
    pub fn load_identity(&mut self) -> &mut Self {
        self.matrix = DMat4::IDENTITY;
        self
    }

    /// Applies a rotation of `angle` radians about `axis` after the current
    /// transform.
    ///
    /// A zero angle or a zero-length axis leaves the transform unchanged.
    pub fn pre_rotate(&mut self, angle: f64, axis: DVec3) -> &mut Self {
        let axis = safe_normalize(axis);
        if angle == 0.0 || axis == DVec3::ZERO {
            return self;
        }
        self.pre_multiply(DMat4::from_axis_angle(axis, angle))
    }

    /// Applies a per-axis scale after the current transform.
    pub fn pre_scale(&mut self, scale: DVec3) -> &mut Self {
        self.pre_multiply(DMat4::from_scale(scale))
    }

    /// Applies a translation after the current transform.
    pub fn pre_translate(&mut self, offset: DVec3) -> &mut Self {
        self.pre_multiply(DMat4::from_translation(offset))
    }

    /// Applies `other` after the current transform.
    pub fn pre_transform(&mut self, other: &Transform) -> &mut Self {
        self.pre_multiply(other.matrix)
    }

    /// Applies `other` before the current transform.
    pub fn post_transform(&mut self, other: &Transform) -> &mut Self {
        self.matrix *= other.matrix;
        self
    }

    /// Re-expresses the transform's output in the coordinates of `frame`.
    ///
    /// `frame` maps frame-local coordinates to world coordinates, so this
    /// left-multiplies by its inverse.
    pub fn change_basis(&mut self, frame: &Transform) -> Result<&mut Self, TransformError> {
        let inverse = frame.try_inverse()?;
        Ok(self.pre_multiply(inverse.matrix))
    }

    /// Inverse transform, or `None` if singular.
    pub fn inverse(&self) -> Option<Transform> {
        self.try_inverse().ok()
    }

    /// Inverts in place.
    pub fn invert(&mut self) -> Result<&mut Self, TransformError> {
        *self = self.try_inverse()?;
        Ok(self)
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Returns true if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.is_finite()
    }

    /// Transforms a point (translation applies).
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.matrix.transform_point3(point)
    }

    /// Transforms a direction (translation ignored).
    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.matrix.transform_vector3(vector)
    }

    /// Entries in row-major order.
    pub fn to_rows_array(&self) -> [f64; 16] {
        self.matrix.transpose().to_cols_array()
    }

    fn try_inverse(&self) -> Result<Transform, TransformError> {
        let det = self.matrix.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            log::debug!("refusing to invert singular transform (det {det})");
            return Err(TransformError::Singular(det));
        }
        Ok(Transform::from_matrix(self.matrix.inverse()))
    }

    fn pre_multiply(&mut self, m: DMat4) -> &mut Self {
        self.matrix = m * self.matrix;
        self
    }
}

impl From<DMat4> for Transform {
    fn from(matrix: DMat4) -> Self {
        Self::from_matrix(matrix)
    }
}

impl From<Transform> for DMat4 {
    fn from(t: Transform) -> Self {
        t.matrix
    }
}

/// Normalizes `v`, returning zero instead of dividing by a zero length.
pub fn safe_normalize(v: DVec3) -> DVec3 {
    v.normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1.0e-12;

    #[test]
    fn test_identity() {
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(Transform::IDENTITY.transform_point(p), p);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }

    #[test]
    fn test_pre_order() {
        let mut t = Transform::IDENTITY;
        t.pre_scale(DVec3::splat(2.0))
            .pre_translate(DVec3::new(10.0, 0.0, 0.0));
        // Scale first, then translate.
        assert_eq!(t.transform_point(DVec3::ONE), DVec3::new(12.0, 2.0, 2.0));

        let mut u = Transform::IDENTITY;
        u.pre_translate(DVec3::new(10.0, 0.0, 0.0))
            .pre_scale(DVec3::splat(2.0));
        assert_eq!(u.transform_point(DVec3::ONE), DVec3::new(22.0, 2.0, 2.0));
    }

    #[test]
    fn test_rotate_x_plane_to_yz() {
        let mut t = Transform::IDENTITY;
        t.pre_rotate(-FRAC_PI_2, DVec3::Y);
        let p = t.transform_point(DVec3::new(0.5, 0.25, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(0.0, 0.25, 0.5), EPS));
    }

    #[test]
    fn test_rotate_y_plane_to_xz() {
        let mut t = Transform::IDENTITY;
        t.pre_rotate(FRAC_PI_2, DVec3::X);
        let p = t.transform_point(DVec3::new(0.5, 0.25, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(0.5, 0.0, 0.25), EPS));
    }

    #[test]
    fn test_rotate_degenerate_is_noop() {
        let mut t = Transform::IDENTITY;
        t.pre_rotate(1.0, DVec3::ZERO).pre_rotate(0.0, DVec3::Z);
        assert_eq!(t, Transform::IDENTITY);
    }

    #[test]
    fn test_from_basis() {
        let t = Transform::from_basis(DVec3::new(1.0, 2.0, 3.0), DVec3::Y, DVec3::Z, DVec3::X);
        assert_eq!(t.transform_point(DVec3::X), DVec3::new(1.0, 3.0, 3.0));
        assert_eq!(t.transform_vector(DVec3::Z), DVec3::X);
    }

    #[test]
    fn test_inverse() {
        let mut t = Transform::IDENTITY;
        t.pre_rotate(0.7, DVec3::new(1.0, 1.0, 0.0))
            .pre_scale(DVec3::new(2.0, 3.0, 4.0))
            .pre_translate(DVec3::new(5.0, -1.0, 2.0));
        let inv = t.inverse().unwrap();
        let p = DVec3::new(0.3, -0.2, 9.0);
        assert!(inv.transform_point(t.transform_point(p)).abs_diff_eq(p, 1.0e-9));
    }

    #[test]
    fn test_singular() {
        let mut t = Transform::IDENTITY;
        t.pre_scale(DVec3::new(1.0, 0.0, 1.0));
        assert!(t.inverse().is_none());
        assert!(matches!(t.invert(), Err(TransformError::Singular(_))));
        let mut u = Transform::IDENTITY;
        assert!(u.change_basis(&t).is_err());
        assert_eq!(u, Transform::IDENTITY);
    }

    #[test]
    fn test_change_basis_with_inverted_frame() {
        // Folding in the inverse of a frame maps local z onto the frame's z.
        let frame = Transform::from_basis(DVec3::ZERO, DVec3::Y, DVec3::Z, DVec3::X);
        let inverted = frame.inverse().unwrap();
        let mut t = Transform::IDENTITY;
        t.change_basis(&inverted).unwrap();
        assert!(t.transform_vector(DVec3::Z).abs_diff_eq(DVec3::X, EPS));
        assert!(t.transform_vector(DVec3::X).abs_diff_eq(DVec3::Y, EPS));
    }

    #[test]
    fn test_safe_normalize() {
        assert_eq!(safe_normalize(DVec3::ZERO), DVec3::ZERO);
        assert_eq!(safe_normalize(DVec3::new(0.0, 3.0, 0.0)), DVec3::Y);
    }

    #[test]
    fn test_rows_array() {
        let mut t = Transform::IDENTITY;
        t.pre_translate(DVec3::new(1.0, 2.0, 3.0));
        let rows = t.to_rows_array();
        assert_eq!(rows[3], 1.0);
        assert_eq!(rows[7], 2.0);
        assert_eq!(rows[11], 3.0);
    }

    #[test]
    fn test_finite() {
        assert!(Transform::IDENTITY.is_finite());
        let t = Transform::from_matrix(DMat4::from_scale(DVec3::new(f64::NAN, 1.0, 1.0)));
        assert!(!t.is_finite());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut t = Transform::IDENTITY;
        t.pre_translate(DVec3::new(1.0, 2.0, 3.0));
        let json = serde_json::to_string(&t).unwrap();
        let back: Transform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
