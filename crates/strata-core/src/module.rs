//! Module adaptation layer.
//!
//! A [`Module`] is the network-facing side of an algorithm. It declares named
//! ports, declares its parameters once in [`Module::set_state_defaults`], and
//! in [`Module::execute`] marshals port data into algorithm inputs, runs the
//! algorithm and publishes the outputs.
//!
//! [`ModuleInstance`] owns one module together with its [`ModuleState`] and
//! is what a scheduler drives. Taking `&mut self` in
//! [`ModuleInstance::execute`] rules out re-entrant execution, and state
//! written back by the module is committed only when execution succeeds.

use std::collections::BTreeMap;

use crate::algorithm::AlgorithmOutput;
use crate::error::ModuleError;
use crate::handle::{AnyHandle, Handle, Payload, PayloadType};
use crate::param::StateSchema;
use crate::state::{ModuleState, StateUpdates};

/// Static description of a module type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module name, unique within a registry.
    pub name: &'static str,
    /// Menu category (e.g. "NewField", "Math").
    pub category: &'static str,
    /// Owning package.
    pub package: &'static str,
}

/// Port descriptor for a module input or output.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    /// Port name.
    pub name: &'static str,
    /// Payload type this port carries.
    pub payload: PayloadType,
    /// Whether the network may leave this input unconnected.
    pub optional: bool,
}

impl PortDescriptor {
    /// A port that must be connected.
    pub fn new<T: Payload>(name: &'static str) -> Self {
        Self {
            name,
            payload: PayloadType::of::<T>(),
            optional: false,
        }
    }

    /// A port the network may leave unconnected.
    pub fn optional<T: Payload>(name: &'static str) -> Self {
        Self {
            optional: true,
            ..Self::new::<T>(name)
        }
    }
}

/// Data on a set of ports, keyed by port name.
#[derive(Debug, Clone, Default)]
pub struct PortData {
    values: BTreeMap<String, AnyHandle>,
}

impl PortData {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, port: &str, handle: impl Into<AnyHandle>) -> Self {
        self.insert(port, handle);
        self
    }

    /// Places `handle` on `port`, replacing what was there.
    pub fn insert(&mut self, port: &str, handle: impl Into<AnyHandle>) {
        self.values.insert(port.to_string(), handle.into());
    }

    /// Removes and returns the data on `port`.
    pub fn remove(&mut self, port: &str) -> Option<AnyHandle> {
        self.values.remove(port)
    }

    /// Type-erased data on `port`.
    pub fn get(&self, port: &str) -> Option<&AnyHandle> {
        self.values.get(port)
    }

    /// Typed data on `port`; `None` if empty or of another type.
    pub fn get_as<T: Payload>(&self, port: &str) -> Option<Handle<T>> {
        self.get(port).and_then(AnyHandle::downcast)
    }

    /// Iterates `(port, data)` pairs in port-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyHandle)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of ports holding data.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no port holds data.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true if both sets fill the same ports with the same payloads.
    pub fn same_handles(&self, other: &PortData) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|((pa, a), (pb, b))| pa == pb && a.ptr_eq(b))
    }
}

/// Trait for modules that can be placed in a network.
pub trait Module: Send {
    /// Static description.
    fn info(&self) -> ModuleInfo;

    /// Declared input ports.
    fn inputs(&self) -> Vec<PortDescriptor>;

    /// Declared output ports.
    fn outputs(&self) -> Vec<PortDescriptor>;

    /// Declares every parameter `execute` will ever read, with its default.
    fn set_state_defaults(&self, schema: &mut StateSchema);

    /// Runs one execution pass.
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ModuleError>;
}

/// A boxed module.
pub type BoxedModule = Box<dyn Module>;

/// Everything a module may touch during one `execute` call.
pub struct ExecutionContext<'a> {
    module: &'static str,
    state: &'a ModuleState,
    input_ports: &'a [PortDescriptor],
    output_ports: &'a [PortDescriptor],
    inputs: &'a PortData,
    outputs: PortData,
    updates: StateUpdates,
    warnings: Vec<String>,
}

impl<'a> ExecutionContext<'a> {
    /// Name of the executing module.
    pub fn module_name(&self) -> &'static str {
        self.module
    }

    /// The module's parameter state, read-only for the duration of the call.
    pub fn state(&self) -> &ModuleState {
        self.state
    }

    /// Data on an input port, or `None` when the port is unconnected.
    pub fn get_optional_input<T: Payload>(&self, port: &str) -> Result<Option<Handle<T>>, ModuleError> {
        let descriptor = self.input_port(port)?;
        let Some(data) = self.inputs.get(port) else {
            return Ok(None);
        };
        data.downcast::<T>()
            .map(Some)
            .ok_or_else(|| ModuleError::PortTypeMismatch {
                module: self.module,
                port: port.to_string(),
                expected: descriptor.payload.name,
                got: data.payload_type().name,
            })
    }

    /// Data on an input port that must be present.
    pub fn get_input<T: Payload>(&self, port: &str) -> Result<Handle<T>, ModuleError> {
        self.get_optional_input(port)?
            .ok_or_else(|| ModuleError::MissingInput {
                module: self.module,
                port: port.to_string(),
            })
    }

    /// Publishes `handle` on an output port.
    pub fn send_output<T: Payload>(&mut self, port: &str, handle: Handle<T>) -> Result<(), ModuleError> {
        let descriptor = self
            .output_ports
            .iter()
            .find(|p| p.name == port)
            .ok_or_else(|| ModuleError::UnknownPort {
                module: self.module,
                port: port.to_string(),
            })?;
        if descriptor.payload != PayloadType::of::<T>() {
            return Err(ModuleError::PortTypeMismatch {
                module: self.module,
                port: port.to_string(),
                expected: descriptor.payload.name,
                got: T::TYPE_NAME,
            });
        }
        self.outputs.insert(port, handle);
        Ok(())
    }

    /// Stages parameter updates for commit after a successful execution.
    ///
    /// Updates are validated now so a bad proposal fails this execution.
    pub fn accept_updates(&mut self, updates: StateUpdates) -> Result<(), ModuleError> {
        self.state.validate(&updates)?;
        self.updates.extend(updates);
        Ok(())
    }

    /// Records a warning and logs it.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", self.module, message);
        self.warnings.push(message);
    }

    /// Takes an algorithm's result: stages its updates, keeps its warnings
    /// (already logged by the algorithm) and returns its outputs.
    pub fn accept<O>(&mut self, output: AlgorithmOutput<O>) -> Result<O, ModuleError> {
        self.accept_updates(output.updates)?;
        self.warnings.extend(output.warnings);
        Ok(output.outputs)
    }

    fn input_port(&self, port: &str) -> Result<&'a PortDescriptor, ModuleError> {
        self.input_ports
            .iter()
            .find(|p| p.name == port)
            .ok_or_else(|| ModuleError::UnknownPort {
                module: self.module,
                port: port.to_string(),
            })
    }
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Data published on output ports.
    pub outputs: PortData,
    /// Warnings raised during execution.
    pub warnings: Vec<String>,
    /// Number of parameters changed by write-back.
    pub state_changes: usize,
}

/// A module together with its parameter state.
pub struct ModuleInstance {
    module: BoxedModule,
    input_ports: Vec<PortDescriptor>,
    output_ports: Vec<PortDescriptor>,
    state: ModuleState,
    last_run: Option<LastRun>,
}

/// What the last successful execution saw. Holding the inputs keeps their
/// payloads alive, so pointer identity cannot be fooled by address reuse.
struct LastRun {
    fingerprint: u64,
    inputs: PortData,
}

impl ModuleInstance {
    /// Instantiates a module and populates its state defaults.
    pub fn new<M: Module + 'static>(module: M) -> Self {
        Self::from_boxed(Box::new(module))
    }

    /// Instantiates a boxed module and populates its state defaults.
    pub fn from_boxed(module: BoxedModule) -> Self {
        let mut schema = StateSchema::new();
        module.set_state_defaults(&mut schema);
        Self {
            input_ports: module.inputs(),
            output_ports: module.outputs(),
            state: ModuleState::new(schema),
            module,
            last_run: None,
        }
    }

    /// Static description of the module.
    pub fn info(&self) -> ModuleInfo {
        self.module.info()
    }

    /// Declared input ports.
    pub fn input_ports(&self) -> &[PortDescriptor] {
        &self.input_ports
    }

    /// Declared output ports.
    pub fn output_ports(&self) -> &[PortDescriptor] {
        &self.output_ports
    }

    /// The module's parameter state.
    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    /// Mutable access for user edits and restores.
    pub fn state_mut(&mut self) -> &mut ModuleState {
        &mut self.state
    }

    /// Executes the module once.
    ///
    /// On failure nothing is published and no write-back is committed.
    pub fn execute(&mut self, inputs: &PortData) -> Result<ExecutionReport, ModuleError> {
        let name = self.module.info().name;
        let report = self.execute_checked(name, inputs);
        match &report {
            Ok(report) => log::debug!(
                "{name}: executed, {} output(s), {} warning(s), {} parameter(s) written back",
                report.outputs.len(),
                report.warnings.len(),
                report.state_changes
            ),
            Err(e) => log::error!("{name}: execution failed: {e}"),
        }
        report
    }

    fn execute_checked(
        &mut self,
        name: &'static str,
        inputs: &PortData,
    ) -> Result<ExecutionReport, ModuleError> {
        self.check_inputs(name, inputs)?;

        let mut ctx = ExecutionContext {
            module: name,
            state: &self.state,
            input_ports: &self.input_ports,
            output_ports: &self.output_ports,
            inputs,
            outputs: PortData::new(),
            updates: StateUpdates::new(),
            warnings: Vec::new(),
        };
        self.module.execute(&mut ctx)?;
        let ExecutionContext {
            outputs,
            updates,
            warnings,
            ..
        } = ctx;

        let state_changes = self.state.apply(&updates)?;
        self.last_run = Some(LastRun {
            fingerprint: self.state.fingerprint(),
            inputs: inputs.clone(),
        });
        Ok(ExecutionReport {
            outputs,
            warnings,
            state_changes,
        })
    }

    /// Returns true if the last successful execution saw this exact state
    /// and these exact input payloads.
    pub fn is_up_to_date(&self, inputs: &PortData) -> bool {
        self.last_run.as_ref().is_some_and(|last| {
            last.fingerprint == self.state.fingerprint() && last.inputs.same_handles(inputs)
        })
    }

    fn check_inputs(&self, name: &'static str, inputs: &PortData) -> Result<(), ModuleError> {
        for (port, data) in inputs.iter() {
            let descriptor = self
                .input_ports
                .iter()
                .find(|p| p.name == port)
                .ok_or_else(|| ModuleError::UnknownPort {
                    module: name,
                    port: port.to_string(),
                })?;
            if descriptor.payload != data.payload_type() {
                return Err(ModuleError::PortTypeMismatch {
                    module: name,
                    port: port.to_string(),
                    expected: descriptor.payload.name,
                    got: data.payload_type().name,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("module", &self.module.info().name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
