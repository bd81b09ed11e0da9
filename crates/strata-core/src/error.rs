//! Error types for strata-core.

use crate::param::ParameterName;
use crate::value::ValueType;
use thiserror::Error;

/// Broad classification of an execution failure.
///
/// Input validation errors are user-facing: the configuration or the data
/// on the ports is wrong. Logic faults are programming defects and should
/// never be swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input data, bad parameter value or an unrecognized option.
    InputValidation,
    /// Unreachable branch, undeclared parameter or similar defect.
    Logic,
}

/// Error when a value has the wrong type.
#[derive(Debug, Clone, Error)]
#[error("type error: expected {expected}, got {got}")]
pub struct TypeError {
    /// The type that was expected.
    pub expected: ValueType,
    /// The type that was actually provided.
    pub got: ValueType,
}

impl TypeError {
    /// Create a new type error.
    pub fn expected(expected: ValueType, got: ValueType) -> Self {
        Self { expected, got }
    }
}

/// Errors raised by [`ModuleState`](crate::ModuleState) access.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    /// The parameter was never declared in the module's schema.
    #[error("parameter {0} was read or written before being given a default")]
    Undeclared(ParameterName),

    /// The stored or supplied value has the wrong type.
    #[error("parameter {name}: {source}")]
    Type {
        /// Parameter name.
        name: ParameterName,
        /// Underlying type error.
        #[source]
        source: TypeError,
    },

    /// A string value is not one of the parameter's legal options.
    #[error("parameter {name}: unrecognized option {value:?} (expected one of {options:?})")]
    InvalidOption {
        /// Parameter name.
        name: ParameterName,
        /// Rejected value.
        value: String,
        /// Legal option strings.
        options: Vec<&'static str>,
    },

    /// An optional parameter has no value where one is needed.
    #[error("parameter {0} has no value")]
    Absent(ParameterName),

    /// Attempt to clear a parameter that must always hold a value.
    #[error("parameter {0} cannot be cleared")]
    Required(ParameterName),
}

impl StateError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::Undeclared(_) => ErrorKind::Logic,
            StateError::Type { .. }
            | StateError::InvalidOption { .. }
            | StateError::Absent(_)
            | StateError::Required(_) => ErrorKind::InputValidation,
        }
    }
}

/// Errors raised by an algorithm's `run`.
#[derive(Debug, Clone, Error)]
pub enum AlgorithmError {
    /// Missing or malformed input data (wrong matrix shape, missing scalar).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A parameter combination the algorithm cannot honor.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A defect in the algorithm or its caller.
    #[error("logic fault: {0}")]
    Logic(String),

    /// Parameter state access failed.
    #[error(transparent)]
    State(#[from] StateError),
}

impl AlgorithmError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlgorithmError::InvalidInput(_) | AlgorithmError::Configuration(_) => {
                ErrorKind::InputValidation
            }
            AlgorithmError::Logic(_) => ErrorKind::Logic,
            AlgorithmError::State(e) => e.kind(),
        }
    }
}

/// Errors raised at the module boundary.
#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    /// A required input port has no data.
    #[error("{module}: required input {port} has no data")]
    MissingInput {
        /// Module name.
        module: &'static str,
        /// Port name.
        port: String,
    },

    /// Data was addressed to a port the module never declared.
    #[error("{module}: no port named {port}")]
    UnknownPort {
        /// Module name.
        module: &'static str,
        /// Port name.
        port: String,
    },

    /// A port received or produced a payload of the wrong type.
    #[error("{module}: port {port} expects {expected}, got {got}")]
    PortTypeMismatch {
        /// Module name.
        module: &'static str,
        /// Port name.
        port: String,
        /// Declared payload type.
        expected: &'static str,
        /// Actual payload type.
        got: &'static str,
    },

    /// The delegated algorithm failed.
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),
}

impl ModuleError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModuleError::MissingInput { .. } | ModuleError::PortTypeMismatch { .. } => {
                ErrorKind::InputValidation
            }
            ModuleError::UnknownPort { .. } => ErrorKind::Logic,
            ModuleError::Algorithm(e) => e.kind(),
        }
    }
}

impl From<StateError> for ModuleError {
    fn from(e: StateError) -> Self {
        ModuleError::Algorithm(AlgorithmError::State(e))
    }
}
