//! Dense matrix payload backed by `ndarray`.

use std::fmt;
use std::ops::{Index, IndexMut, MulAssign};

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::AlgorithmError;
use crate::handle::Payload;

/// A dense matrix of `f64`.
///
/// Deserialization rejects data whose length does not match the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenseMatrix {
    data: Array2<f64>,
}

impl Payload for DenseMatrix {
    const TYPE_NAME: &'static str = "DenseMatrix";
}

impl From<Array2<f64>> for DenseMatrix {
    fn from(data: Array2<f64>) -> Self {
        Self { data }
    }
}

impl DenseMatrix {
    /// Creates a `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Array2::zeros((rows, cols)).into()
    }

    /// Creates an `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Array2::eye(n).into()
    }

    /// Creates a matrix from row-major data.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, AlgorithmError> {
        let len = data.len();
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::from)
            .map_err(|_| {
                AlgorithmError::InvalidInput(format!(
                    "{rows}x{cols} matrix cannot hold {len} values"
                ))
            })
    }

    /// Creates a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[&[f64]]) -> Result<Self, AlgorithmError> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(AlgorithmError::InvalidInput(format!(
                "row {bad} has {} columns, expected {cols}",
                rows[bad].len()
            )));
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_row_major(rows.len(), cols, data)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Returns the element at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    /// View of one row. Panics if `row` is out of range.
    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.data.row(row)
    }

    /// Elements in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    /// The underlying array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Returns a new matrix holding the transpose.
    pub fn transpose(&self) -> Self {
        self.data.t().as_standard_layout().into_owned().into()
    }

    /// Element-wise sum. Shapes must match.
    pub fn add(&self, other: &Self) -> Result<Self, AlgorithmError> {
        self.check_same_shape(other, "add")?;
        Ok((&self.data + &other.data).into())
    }

    /// Element-wise difference. Shapes must match.
    pub fn sub(&self, other: &Self) -> Result<Self, AlgorithmError> {
        self.check_same_shape(other, "subtract")?;
        Ok((&self.data - &other.data).into())
    }

    /// Matrix product `self * other`.
    pub fn matmul(&self, other: &Self) -> Result<Self, AlgorithmError> {
        if self.cols() != other.rows() {
            return Err(AlgorithmError::InvalidInput(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        Ok(self.data.dot(&other.data).into())
    }

    /// Largest absolute element-wise difference, or `None` if shapes differ.
    pub fn max_abs_diff(&self, other: &Self) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            (&self.data - &other.data)
                .iter()
                .fold(0.0, |acc, d| acc.max(d.abs())),
        )
    }

    fn check_same_shape(&self, other: &Self, op: &str) -> Result<(), AlgorithmError> {
        if self.shape() != other.shape() {
            return Err(AlgorithmError::InvalidInput(format!(
                "cannot {op} {}x{} and {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for DenseMatrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[index]
    }
}

impl MulAssign<f64> for DenseMatrix {
    fn mul_assign(&mut self, scalar: f64) {
        self.data *= scalar;
    }
}

impl fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.rows() {
            let row: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            writeln!(f, "[{}]", row.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseMatrix {
        DenseMatrix::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_from_rows_shape() {
        let m = sample();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 2)], 6.0);
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0]]).unwrap_err();
        assert!(matches!(err, AlgorithmError::InvalidInput(_)));
    }

    #[test]
    fn test_from_row_major_length_check() {
        assert!(DenseMatrix::from_row_major(2, 2, vec![1.0; 3]).is_err());
        assert!(DenseMatrix::from_row_major(2, 2, vec![1.0; 4]).is_ok());
    }

    #[test]
    fn test_transpose() {
        let t = sample().transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.row(0).to_vec(), [1.0, 4.0]);
        assert_eq!(t.row(2).to_vec(), [3.0, 6.0]);
        assert_eq!(t.iter().collect::<Vec<_>>(), [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_scale_in_place() {
        let mut m = sample();
        m *= -2.0;
        assert_eq!(m.row(0).to_vec(), [-2.0, -4.0, -6.0]);
    }

    #[test]
    fn test_add_sub_shape_mismatch() {
        let a = sample();
        assert!(a.add(&a.transpose()).is_err());
        let diff = a.sub(&a).unwrap();
        assert!(diff.iter().all(|x| x == 0.0));
    }

    #[test]
    fn test_matmul() {
        let a = sample();
        let p = a.matmul(&a.transpose()).unwrap();
        assert_eq!(p.shape(), (2, 2));
        assert_eq!(p.row(0).to_vec(), [14.0, 32.0]);
        assert_eq!(p.row(1).to_vec(), [32.0, 77.0]);
        assert!(a.matmul(&a).is_err());
    }

    #[test]
    fn test_identity_product() {
        let a = sample();
        let p = DenseMatrix::identity(2).matmul(&a).unwrap();
        assert_eq!(p.max_abs_diff(&a), Some(0.0));
    }

    #[test]
    fn test_serde_roundtrip() {
        let m = sample();
        let json = serde_json::to_string(&m).unwrap();
        let back: DenseMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.row(1).to_vec(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_deserialize_rejects_short_data() {
        let short = r#"{"v":1,"dim":[2,3],"data":[1.0]}"#;
        assert!(serde_json::from_str::<DenseMatrix>(short).is_err());
        let flat = r#"{"rows":2,"cols":3,"data":[1.0]}"#;
        assert!(serde_json::from_str::<DenseMatrix>(flat).is_err());
    }
}
