//! Serialization error types.

use strata_core::StateError;
use thiserror::Error;

/// Errors that can occur while saving or restoring module state.
#[derive(Debug, Error)]
pub enum SerdeError {
    /// No factory is registered under this module name.
    #[error("unknown module type: {0}")]
    UnknownModule(String),

    /// Two saved modules share an id.
    #[error("duplicate module id {0}")]
    DuplicateId(u64),

    /// Saved state does not fit the module's schema.
    #[error("module {id} ({module}): {source}")]
    State {
        /// Saved module id.
        id: u64,
        /// Module type name.
        module: String,
        /// Underlying state error.
        #[source]
        source: StateError,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bincode deserialization error.
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::error::DecodeError),

    /// Bincode serialization error.
    #[error("bincode encode error: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),
}
