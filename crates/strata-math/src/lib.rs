//! Linear-algebra operator algorithms for strata.
//!
//! Operators are selected by an integer code in module state and resolved
//! into a sum type carrying exactly the parameters each variant needs.

pub mod binary;
pub mod unary;

pub use binary::{
    BinaryInputs, BinaryOperator, BinaryParams, EvaluateLinearAlgebraBinary,
    EvaluateLinearAlgebraBinaryModule,
};
pub use unary::{
    EvaluateLinearAlgebraUnary, EvaluateLinearAlgebraUnaryModule, UnaryOperator,
    UnaryOperatorCode, UnaryParams,
};
