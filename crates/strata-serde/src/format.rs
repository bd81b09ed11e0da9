//! Format trait for saved state.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SerdeError;

/// A byte encoding for saved networks and module state.
pub trait StateFormat {
    /// Encodes `value` to bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerdeError>;

    /// Decodes bytes produced by [`encode`](Self::encode).
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerdeError>;

    /// Human-readable format name.
    fn name(&self) -> &'static str;

    /// Conventional file extension, without the dot.
    fn extension(&self) -> &'static str;
}
