//! Bincode format implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SerdeError;
use crate::format::StateFormat;

/// Bincode serialization format.
///
/// Compact binary format, faster than JSON but not human-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl BincodeFormat {
    /// Creates a new BincodeFormat.
    pub fn new() -> Self {
        Self
    }
}

impl StateFormat for BincodeFormat {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerdeError> {
        Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerdeError> {
        let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(value)
    }

    fn name(&self) -> &'static str {
        "bincode"
    }

    fn extension(&self) -> &'static str {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonFormat;
    use crate::serial::{SerialModule, SerialNetwork};
    use strata_core::{DenseMatrix, SerialState, Value};

    fn network() -> SerialNetwork {
        let mut network = SerialNetwork::new();
        for id in 0..10 {
            let mut state = SerialState::default();
            state.values.insert("Operator".into(), Value::Int(id as i64 % 3));
            state.values.insert("Scalar".into(), Value::Real(0.5 * id as f64));
            network
                .modules
                .push(SerialModule::new(id, "EvaluateLinearAlgebraUnary", state));
        }
        network
    }

    #[test]
    fn test_bincode_roundtrip() {
        let format = BincodeFormat::new();
        let bytes = format.encode(&network()).unwrap();
        let loaded: SerialNetwork = format.decode(&bytes).unwrap();
        assert_eq!(loaded, network());
    }

    #[test]
    fn test_bincode_matrix_value() {
        let mut state = SerialState::default();
        let m = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        state.values.insert("Weights".into(), Value::from(m.clone()));

        let format = BincodeFormat::new();
        let loaded: SerialState = format.decode(&format.encode(&state).unwrap()).unwrap();
        let restored = loaded.values["Weights"].as_matrix().unwrap();
        assert_eq!(*restored, m);
    }

    #[test]
    fn test_bincode_smaller_than_json() {
        let json = JsonFormat::new().encode(&network()).unwrap();
        let bin = BincodeFormat::new().encode(&network()).unwrap();
        assert!(bin.len() < json.len());
    }

    #[test]
    fn test_bincode_truncated() {
        let bytes = BincodeFormat::new().encode(&network()).unwrap();
        let err = BincodeFormat::new()
            .decode::<SerialNetwork>(&bytes[..bytes.len() / 2])
            .unwrap_err();
        assert!(matches!(err, SerdeError::Bincode(_)));
    }
}
