//! Single-matrix operators: negate, transpose, scalar multiply.

use strata_core::{
    Algorithm, AlgorithmError, AlgorithmOutput, AlgorithmParameters, DenseMatrix, ExecutionContext,
    Handle, Module, ModuleError, ModuleInfo, ModuleState, ParameterName, PortDescriptor,
    StateSchema, ValueType,
};

pub const OPERATOR: ParameterName = ParameterName::new("Operator");
pub const SCALAR: ParameterName = ParameterName::new("Scalar");

pub const INPUT_MATRIX: &str = "InputMatrix";
pub const RESULT: &str = "Result";

/// Operator code as stored in module state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperatorCode {
    Negate,
    Transpose,
    ScalarMultiply,
}

impl UnaryOperatorCode {
    /// Stored integer code.
    pub fn code(self) -> i64 {
        match self {
            UnaryOperatorCode::Negate => 0,
            UnaryOperatorCode::Transpose => 1,
            UnaryOperatorCode::ScalarMultiply => 2,
        }
    }

    /// Decodes a stored code. Codes outside the enumeration are a defect.
    pub fn from_code(code: i64) -> Result<Self, AlgorithmError> {
        match code {
            0 => Ok(UnaryOperatorCode::Negate),
            1 => Ok(UnaryOperatorCode::Transpose),
            2 => Ok(UnaryOperatorCode::ScalarMultiply),
            _ => Err(AlgorithmError::Logic(format!("unknown unary operator code {code}"))),
        }
    }
}

/// A fully specified unary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    /// `-M`
    Negate,
    /// `Mᵀ`
    Transpose,
    /// `M * s`
    ScalarMultiply(f64),
}

impl UnaryOperator {
    /// Applies the operator into fresh storage.
    pub fn apply(self, matrix: &Handle<DenseMatrix>) -> Handle<DenseMatrix> {
        match self {
            UnaryOperator::Negate => scaled(matrix, -1.0),
            UnaryOperator::Transpose => Handle::new(matrix.transpose()),
            UnaryOperator::ScalarMultiply(s) => scaled(matrix, s),
        }
    }
}

fn scaled(matrix: &Handle<DenseMatrix>, factor: f64) -> Handle<DenseMatrix> {
    let mut out = matrix.deep_clone();
    *out.make_mut() *= factor;
    out
}

/// Parameters for [`EvaluateLinearAlgebraUnary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryParams {
    pub operator: UnaryOperatorCode,
    pub scalar: Option<f64>,
}

impl UnaryParams {
    /// Pairs the operator with the parameters it needs.
    pub fn resolve(&self) -> Result<UnaryOperator, AlgorithmError> {
        match self.operator {
            UnaryOperatorCode::Negate => Ok(UnaryOperator::Negate),
            UnaryOperatorCode::Transpose => Ok(UnaryOperator::Transpose),
            UnaryOperatorCode::ScalarMultiply => self
                .scalar
                .map(UnaryOperator::ScalarMultiply)
                .ok_or_else(|| {
                    AlgorithmError::InvalidInput("No scalar value available to multiply!".into())
                }),
        }
    }
}

impl AlgorithmParameters for UnaryParams {
    fn from_state(state: &ModuleState) -> Result<Self, AlgorithmError> {
        Ok(Self {
            operator: UnaryOperatorCode::from_code(state.get_int(&OPERATOR)?)?,
            scalar: state.get_optional_real(&SCALAR)?,
        })
    }
}

/// Evaluates a unary operator on an optional matrix.
///
/// A missing input yields a missing result without error.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateLinearAlgebraUnary;

impl Algorithm for EvaluateLinearAlgebraUnary {
    type Inputs = Option<Handle<DenseMatrix>>;
    type Parameters = UnaryParams;
    type Outputs = Option<Handle<DenseMatrix>>;

    fn name(&self) -> &'static str {
        "EvaluateLinearAlgebraUnary"
    }

    fn run(
        &self,
        input: &Option<Handle<DenseMatrix>>,
        params: &UnaryParams,
    ) -> Result<AlgorithmOutput<Option<Handle<DenseMatrix>>>, AlgorithmError> {
        let Some(matrix) = input else {
            return Ok(AlgorithmOutput::new(None));
        };
        let operator = params.resolve()?;
        Ok(AlgorithmOutput::new(Some(operator.apply(matrix))))
    }
}

/// Network module wrapping [`EvaluateLinearAlgebraUnary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateLinearAlgebraUnaryModule;

impl Module for EvaluateLinearAlgebraUnaryModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: "EvaluateLinearAlgebraUnary",
            category: "Math",
            package: "strata",
        }
    }

    fn inputs(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::optional::<DenseMatrix>(INPUT_MATRIX)]
    }

    fn outputs(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::new::<DenseMatrix>(RESULT)]
    }

    fn set_state_defaults(&self, schema: &mut StateSchema) {
        schema
            .declare(&OPERATOR, UnaryOperatorCode::Negate.code())
            .declare_optional(&SCALAR, ValueType::Real);
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ModuleError> {
        let input = ctx.get_optional_input::<DenseMatrix>(INPUT_MATRIX)?;
        let output = EvaluateLinearAlgebraUnary.run_with_state(&input, ctx.state())?;
        if let Some(result) = ctx.accept(output)? {
            ctx.send_output(RESULT, result)?;
        }
        Ok(())
    }
}
