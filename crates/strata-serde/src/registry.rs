//! Module registry for type-based reconstruction.

use std::collections::HashMap;

use strata_core::{BoxedModule, Module, ModuleInstance};
use strata_field::CreateImageModule;
use strata_math::{EvaluateLinearAlgebraBinaryModule, EvaluateLinearAlgebraUnaryModule};

use crate::error::SerdeError;

/// Type alias for module factory functions.
type ModuleFactory = Box<dyn Fn() -> BoxedModule + Send + Sync>;

/// Registry mapping module names to factories.
///
/// Used when restoring a saved network to recreate each module before its
/// state is loaded.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every module this workspace provides.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<CreateImageModule>()
            .register::<EvaluateLinearAlgebraUnaryModule>()
            .register::<EvaluateLinearAlgebraBinaryModule>();
        registry
    }

    /// Registers a module type under its [`ModuleInfo::name`](strata_core::ModuleInfo).
    pub fn register<M>(&mut self) -> &mut Self
    where
        M: Module + Default + 'static,
    {
        let name = M::default().info().name;
        self.register_factory(name, || Box::new(M::default()))
    }

    /// Registers a module using a custom factory function.
    pub fn register_factory<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> BoxedModule + Send + Sync + 'static,
    {
        if self.factories.insert(name.to_string(), Box::new(factory)).is_some() {
            log::debug!("replacing module factory {name}");
        }
        self
    }

    /// Instantiates a module with default state.
    pub fn create(&self, name: &str) -> Result<ModuleInstance, SerdeError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SerdeError::UnknownModule(name.to_string()))?;
        Ok(ModuleInstance::from_boxed(factory()))
    }

    /// Checks if a module name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
