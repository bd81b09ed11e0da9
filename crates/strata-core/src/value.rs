//! Dynamic value type for module parameters.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::handle::Handle;
use crate::matrix::DenseMatrix;

/// A matrix payload behind a shared handle.
pub type MatrixHandle = Handle<DenseMatrix>;

/// Runtime value stored in a module's parameter state.
///
/// Enumerated parameters ("Mode", "Axis", ...) are stored as [`Value::String`];
/// the schema that declared them knows the legal options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Double-precision real.
    Real(f64),
    /// Boolean.
    Bool(bool),
    /// Free text or an enumeration option.
    String(String),
    /// Shared matrix.
    Matrix(MatrixHandle),
}

/// Type identifier for parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Signed integer.
    Int,
    /// Double-precision real.
    Real,
    /// Boolean.
    Bool,
    /// Text or enumeration option.
    String,
    /// Shared matrix.
    Matrix,
}

impl Value {
    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Real(_) => ValueType::Real,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Matrix(_) => ValueType::Matrix,
        }
    }

    /// Attempts to extract an integer value.
    pub fn as_int(&self) -> Result<i64, TypeError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(TypeError::expected(ValueType::Int, other.value_type())),
        }
    }

    /// Attempts to extract a real value.
    ///
    /// Integers widen to reals, so a parameter defaulted with `0` still reads
    /// as `0.0`.
    pub fn as_real(&self) -> Result<f64, TypeError> {
        match self {
            Value::Real(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(TypeError::expected(ValueType::Real, other.value_type())),
        }
    }

    /// Attempts to extract a bool value.
    pub fn as_bool(&self) -> Result<bool, TypeError> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(TypeError::expected(ValueType::Bool, other.value_type())),
        }
    }

    /// Attempts to borrow a string value.
    pub fn as_str(&self) -> Result<&str, TypeError> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(TypeError::expected(ValueType::String, other.value_type())),
        }
    }

    /// Attempts to extract a matrix handle. The handle is shared, not copied.
    pub fn as_matrix(&self) -> Result<MatrixHandle, TypeError> {
        match self {
            Value::Matrix(v) => Ok(v.clone()),
            other => Err(TypeError::expected(ValueType::Matrix, other.value_type())),
        }
    }

    /// Converts this value so it can live in a slot of type `target`.
    ///
    /// The only conversion is integer to real.
    pub(crate) fn coerce(self, target: ValueType) -> Result<Value, TypeError> {
        match (self, target) {
            (Value::Int(v), ValueType::Real) => Ok(Value::Real(v as f64)),
            (v, t) if v.value_type() == t => Ok(v),
            (v, t) => Err(TypeError::expected(t, v.value_type())),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "int"),
            ValueType::Real => write!(f, "real"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::String => write!(f, "string"),
            ValueType::Matrix => write!(f, "matrix"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Matrix(m) => write!(f, "matrix {}x{}", m.rows(), m.cols()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Matrix(a), Value::Matrix(b)) => a.ptr_eq(b) || **a == **b,
            _ => false,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Real(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Matrix(m) => {
                m.rows().hash(state);
                m.cols().hash(state);
                for x in m.iter() {
                    x.to_bits().hash(state);
                }
            }
        }
    }
}

// Convenience From impls
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<MatrixHandle> for Value {
    fn from(v: MatrixHandle) -> Self {
        Value::Matrix(v)
    }
}

impl From<DenseMatrix> for Value {
    fn from(v: DenseMatrix) -> Self {
        Value::Matrix(Handle::new(v))
    }
}
