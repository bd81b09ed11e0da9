//! JSON format implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SerdeError;
use crate::format::StateFormat;

/// JSON serialization format.
///
/// Human-readable, git-diffable, good for hand-edited state files.
#[derive(Debug, Clone, Default)]
pub struct JsonFormat {
    /// Whether to pretty-print with indentation.
    pub pretty: bool,
}

impl JsonFormat {
    /// Creates a new JsonFormat with default settings (compact).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JsonFormat with pretty-printing enabled.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl StateFormat for JsonFormat {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerdeError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerdeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "JSON"
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
