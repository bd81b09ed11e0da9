//! The algorithm execution contract.
//!
//! An [`Algorithm`] is pure computation: it maps immutable inputs and a
//! read-only parameter view to outputs, and knows nothing about ports or the
//! network around it. Its only side channel is [`AlgorithmOutput::updates`],
//! proposed parameter writes (e.g. sizes inferred from an input) that the
//! caller applies explicitly.
//!
//! Failure is all-or-nothing: an `Err` carries no partial outputs.

use crate::error::AlgorithmError;
use crate::state::{ModuleState, StateUpdates};

/// A typed, read-only view over the parameters one algorithm needs.
pub trait AlgorithmParameters: Sized {
    /// Reads and validates the view from a module's state.
    fn from_state(state: &ModuleState) -> Result<Self, AlgorithmError>;
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct AlgorithmOutput<O> {
    /// The computed outputs.
    pub outputs: O,
    /// Parameter values the algorithm proposes writing back.
    pub updates: StateUpdates,
    /// Non-fatal warnings raised while running.
    pub warnings: Vec<String>,
}

impl<O> AlgorithmOutput<O> {
    /// Outputs with no proposed updates and no warnings.
    pub fn new(outputs: O) -> Self {
        Self {
            outputs,
            updates: StateUpdates::new(),
            warnings: Vec::new(),
        }
    }

    /// Attaches proposed parameter updates.
    pub fn with_updates(mut self, updates: StateUpdates) -> Self {
        self.updates = updates;
        self
    }

    /// Attaches warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Transforms the outputs, keeping updates and warnings.
    pub fn map<P>(self, f: impl FnOnce(O) -> P) -> AlgorithmOutput<P> {
        AlgorithmOutput {
            outputs: f(self.outputs),
            updates: self.updates,
            warnings: self.warnings,
        }
    }
}

/// A parameterized computation invoked uniformly by modules.
///
/// Implementations must be deterministic: the same inputs and parameters
/// give the same outputs and the same proposed updates. Outputs never alias
/// input storage.
pub trait Algorithm: Send + Sync {
    /// Input tuple. Optional entries are `Option<Handle<_>>`.
    type Inputs;
    /// Parameter view.
    type Parameters: AlgorithmParameters;
    /// Output tuple.
    type Outputs;

    /// Returns the algorithm name for logging.
    fn name(&self) -> &'static str;

    /// Runs the computation.
    fn run(
        &self,
        inputs: &Self::Inputs,
        params: &Self::Parameters,
    ) -> Result<AlgorithmOutput<Self::Outputs>, AlgorithmError>;

    /// Reads the parameter view from `state` and runs.
    fn run_with_state(
        &self,
        inputs: &Self::Inputs,
        state: &ModuleState,
    ) -> Result<AlgorithmOutput<Self::Outputs>, AlgorithmError> {
        let params = Self::Parameters::from_state(state)?;
        self.run(inputs, &params)
    }
}

/// Collects warnings during a run and mirrors them to the log.
#[derive(Debug, Default)]
pub struct Warnings {
    source: &'static str,
    messages: Vec<String>,
}

impl Warnings {
    /// Creates a collector tagged with the emitting algorithm's name.
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            messages: Vec::new(),
        }
    }

    /// Records a warning.
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", self.source, message);
        self.messages.push(message);
    }

    /// Number of warnings recorded.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consumes the collector.
    pub fn into_vec(self) -> Vec<String> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParameterName, StateSchema};

    const OFFSET: ParameterName = ParameterName::new("Offset");

    struct OffsetParams {
        offset: f64,
    }

    impl AlgorithmParameters for OffsetParams {
        fn from_state(state: &ModuleState) -> Result<Self, AlgorithmError> {
            Ok(Self {
                offset: state.get_real(&OFFSET)?,
            })
        }
    }

    struct AddOffset;

    impl Algorithm for AddOffset {
        type Inputs = Option<f64>;
        type Parameters = OffsetParams;
        type Outputs = Option<f64>;

        fn name(&self) -> &'static str {
            "AddOffset"
        }

        fn run(
            &self,
            input: &Option<f64>,
            params: &OffsetParams,
        ) -> Result<AlgorithmOutput<Option<f64>>, AlgorithmError> {
            let Some(x) = input else {
                return Ok(AlgorithmOutput::new(None));
            };
            let mut warnings = Warnings::new(self.name());
            if params.offset == 0.0 {
                warnings.push("zero offset");
            }
            let mut updates = StateUpdates::new();
            updates.set(&OFFSET, params.offset);
            Ok(AlgorithmOutput::new(Some(x + params.offset))
                .with_updates(updates)
                .with_warnings(warnings.into_vec()))
        }
    }

    fn state(offset: f64) -> ModuleState {
        let mut schema = StateSchema::new();
        schema.declare_real(&OFFSET, offset);
        ModuleState::new(schema)
    }

    #[test]
    fn test_run_with_state() {
        let out = AddOffset.run_with_state(&Some(1.0), &state(2.0)).unwrap();
        assert_eq!(out.outputs, Some(3.0));
        assert!(out.warnings.is_empty());
        assert_eq!(out.updates.len(), 1);
    }

    #[test]
    fn test_null_input_is_silent() {
        let out = AddOffset.run_with_state(&None, &state(2.0)).unwrap();
        assert_eq!(out.outputs, None);
        assert!(out.updates.is_empty());
    }

    #[test_log::test]
    fn test_warnings_collected() {
        let out = AddOffset.run_with_state(&Some(1.0), &state(0.0)).unwrap();
        assert_eq!(out.warnings, vec!["zero offset".to_string()]);
    }

    #[test]
    fn test_missing_parameter_fails_before_run() {
        let empty = ModuleState::new(StateSchema::new());
        let err = AddOffset.run_with_state(&Some(1.0), &empty).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Logic);
    }

    #[test]
    fn test_map_keeps_side_channel() {
        let out = AddOffset.run_with_state(&Some(1.0), &state(0.0)).unwrap();
        let mapped = out.map(|o| o.map(|x| x * 2.0));
        assert_eq!(mapped.outputs, Some(2.0));
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.updates.len(), 1);
    }
}
