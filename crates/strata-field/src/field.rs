//! Fields: a mesh plus sample values placed by a basis order.

use glam::{DMat3, DVec3};
use strata_core::{AlgorithmError, Payload};

use crate::mesh::Mesh;

/// Where samples live on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasisOrder {
    /// No samples.
    NoData,
    /// One sample per element (cell or face centered).
    Constant,
    /// One sample per node.
    Linear,
}

impl BasisOrder {
    /// Numeric order: -1, 0 or 1.
    pub fn order(self) -> i32 {
        match self {
            BasisOrder::NoData => -1,
            BasisOrder::Constant => 0,
            BasisOrder::Linear => 1,
        }
    }

    /// Inverse of [`order`](Self::order).
    pub fn from_order(order: i32) -> Option<Self> {
        match order {
            -1 => Some(BasisOrder::NoData),
            0 => Some(BasisOrder::Constant),
            1 => Some(BasisOrder::Linear),
            _ => None,
        }
    }
}

/// Kind of value stored per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// One real per sample.
    #[default]
    Scalar,
    /// One 3-vector per sample.
    Vector,
    /// One 3x3 tensor per sample.
    Tensor,
}

/// Sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    /// Scalar samples.
    Scalar(Vec<f64>),
    /// Vector samples.
    Vector(Vec<DVec3>),
    /// Tensor samples.
    Tensor(Vec<DMat3>),
}

impl FieldValues {
    /// `len` zeroed samples of `data_type`.
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Scalar => FieldValues::Scalar(vec![0.0; len]),
            DataType::Vector => FieldValues::Vector(vec![DVec3::ZERO; len]),
            DataType::Tensor => FieldValues::Tensor(vec![DMat3::ZERO; len]),
        }
    }

    /// The per-sample value type.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValues::Scalar(_) => DataType::Scalar,
            FieldValues::Vector(_) => DataType::Vector,
            FieldValues::Tensor(_) => DataType::Tensor,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Scalar(v) => v.len(),
            FieldValues::Vector(v) => v.len(),
            FieldValues::Tensor(v) => v.len(),
        }
    }

    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A mesh with sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    mesh: Mesh,
    basis: BasisOrder,
    values: FieldValues,
}

impl Payload for Field {
    const TYPE_NAME: &'static str = "Field";
}

/// Sample count `basis` requires on `mesh`.
fn sample_count(mesh: &Mesh, basis: BasisOrder) -> usize {
    match basis {
        BasisOrder::NoData => 0,
        BasisOrder::Constant => mesh.element_count(),
        BasisOrder::Linear => mesh.node_count(),
    }
}

impl Field {
    /// Creates a field with zero-initialised samples.
    pub fn new(mesh: Mesh, basis: BasisOrder, data_type: DataType) -> Self {
        let values = FieldValues::zeros(data_type, sample_count(&mesh, basis));
        Self {
            mesh,
            basis,
            values,
        }
    }

    /// Creates a field from existing samples.
    pub fn with_values(
        mesh: Mesh,
        basis: BasisOrder,
        values: FieldValues,
    ) -> Result<Self, AlgorithmError> {
        let expected = sample_count(&mesh, basis);
        if values.len() != expected {
            return Err(AlgorithmError::InvalidInput(format!(
                "field with basis order {} needs {expected} samples, got {}",
                basis.order(),
                values.len()
            )));
        }
        Ok(Self {
            mesh,
            basis,
            values,
        })
    }

    /// The mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Mutable mesh access. Sample counts are unaffected by transforms.
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    /// Sample placement.
    pub fn basis(&self) -> BasisOrder {
        self.basis
    }

    /// Per-sample value type.
    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    /// Sample storage.
    pub fn values(&self) -> &FieldValues {
        &self.values
    }
}
