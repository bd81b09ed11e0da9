//! Two-matrix operators: add, subtract, multiply.

use strata_core::{
    Algorithm, AlgorithmError, AlgorithmOutput, AlgorithmParameters, DenseMatrix, ExecutionContext,
    Handle, Module, ModuleError, ModuleInfo, ModuleState, ParameterName, PortDescriptor,
    StateSchema,
};

pub const OPERATOR: ParameterName = ParameterName::new("Operator");

pub const LHS: &str = "LHS";
pub const RHS: &str = "RHS";
pub const RESULT: &str = "Result";

/// Binary operator, stored in module state as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
}

impl BinaryOperator {
    /// Stored integer code.
    pub fn code(self) -> i64 {
        match self {
            BinaryOperator::Add => 0,
            BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply => 2,
        }
    }

    /// Decodes a stored code. Codes outside the enumeration are a defect.
    pub fn from_code(code: i64) -> Result<Self, AlgorithmError> {
        match code {
            0 => Ok(BinaryOperator::Add),
            1 => Ok(BinaryOperator::Subtract),
            2 => Ok(BinaryOperator::Multiply),
            _ => Err(AlgorithmError::Logic(format!("unknown binary operator code {code}"))),
        }
    }
}

/// Parameters for [`EvaluateLinearAlgebraBinary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryParams {
    pub operator: BinaryOperator,
}

impl AlgorithmParameters for BinaryParams {
    fn from_state(state: &ModuleState) -> Result<Self, AlgorithmError> {
        Ok(Self {
            operator: BinaryOperator::from_code(state.get_int(&OPERATOR)?)?,
        })
    }
}

/// Both operands.
#[derive(Debug, Clone)]
pub struct BinaryInputs {
    pub lhs: Handle<DenseMatrix>,
    pub rhs: Handle<DenseMatrix>,
}

/// Evaluates `lhs op rhs` into fresh storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateLinearAlgebraBinary;

impl Algorithm for EvaluateLinearAlgebraBinary {
    type Inputs = BinaryInputs;
    type Parameters = BinaryParams;
    type Outputs = Handle<DenseMatrix>;

    fn name(&self) -> &'static str {
        "EvaluateLinearAlgebraBinary"
    }

    fn run(
        &self,
        inputs: &BinaryInputs,
        params: &BinaryParams,
    ) -> Result<AlgorithmOutput<Handle<DenseMatrix>>, AlgorithmError> {
        let (lhs, rhs) = (&*inputs.lhs, &*inputs.rhs);
        let result = match params.operator {
            BinaryOperator::Add => lhs.add(rhs)?,
            BinaryOperator::Subtract => lhs.sub(rhs)?,
            BinaryOperator::Multiply => lhs.matmul(rhs)?,
        };
        Ok(AlgorithmOutput::new(Handle::new(result)))
    }
}

/// Network module wrapping [`EvaluateLinearAlgebraBinary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateLinearAlgebraBinaryModule;

impl Module for EvaluateLinearAlgebraBinaryModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: "EvaluateLinearAlgebraBinary",
            category: "Math",
            package: "strata",
        }
    }

    fn inputs(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::new::<DenseMatrix>(LHS),
            PortDescriptor::new::<DenseMatrix>(RHS),
        ]
    }

    fn outputs(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::new::<DenseMatrix>(RESULT)]
    }

    fn set_state_defaults(&self, schema: &mut StateSchema) {
        schema.declare(&OPERATOR, BinaryOperator::Add.code());
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ModuleError> {
        let inputs = BinaryInputs {
            lhs: ctx.get_input(LHS)?,
            rhs: ctx.get_input(RHS)?,
        };
        let output = EvaluateLinearAlgebraBinary.run_with_state(&inputs, ctx.state())?;
        let result = ctx.accept(output)?;
        ctx.send_output(RESULT, result)
    }
}
