//! Core types and traits for strata.
//!
//! This crate provides the execution contract every algorithm and module
//! builds on:
//!
//! - [`ModuleState`] - Per-module parameter registry, validated against a [`StateSchema`]
//! - [`Handle`] - Shared, copy-on-write payload reference; [`AnyHandle`] on ports
//! - [`DenseMatrix`] - Row-major matrix payload
//! - [`Algorithm`] - Pure computation over inputs and a parameter view
//! - [`Module`] / [`ModuleInstance`] - Port marshalling and all-or-nothing execution

mod algorithm;
mod error;
mod handle;
mod matrix;
mod module;
mod param;
mod state;
mod value;

pub use algorithm::{Algorithm, AlgorithmOutput, AlgorithmParameters, Warnings};
pub use error::{AlgorithmError, ErrorKind, ModuleError, StateError, TypeError};
pub use handle::{AnyHandle, Handle, Payload, PayloadType};
pub use matrix::DenseMatrix;
pub use module::{
    BoxedModule, ExecutionContext, ExecutionReport, Module, ModuleInfo, ModuleInstance,
    PortData, PortDescriptor,
};
pub use param::{ParameterName, ParameterSpec, StateSchema};
pub use state::{ModuleState, SerialState, StateChange, StateUpdates, SubscriptionId};
pub use value::{MatrixHandle, Value, ValueType};
