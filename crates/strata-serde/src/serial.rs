//! Serializable representation of a network's module configuration.

use serde::{Deserialize, Serialize};
use strata_core::SerialState;

/// One saved module: its id, its type name and its parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialModule {
    /// Identifier of the module within the network.
    pub id: u64,
    /// Registered module type name (e.g. "CreateImage").
    pub module: String,
    /// Parameter values keyed by name.
    pub state: SerialState,
}

impl SerialModule {
    /// Creates a saved module.
    pub fn new(id: u64, module: impl Into<String>, state: SerialState) -> Self {
        Self {
            id,
            module: module.into(),
            state,
        }
    }
}

/// Saved configuration of every module in a network.
///
/// Connections belong to the graph layer and are not recorded here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerialNetwork {
    /// Saved modules in network order.
    pub modules: Vec<SerialModule>,
}

impl SerialNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a module by id.
    pub fn get(&self, id: u64) -> Option<&SerialModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Returns the number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if there are no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
