//! Saving and restoring module configuration.
//!
//! Module instances hold trait objects and live state that cannot be
//! serialized directly. This crate converts them to an intermediate
//! [`SerialNetwork`] where each module is a `(id, module name, state)` triple,
//! and uses a [`ModuleRegistry`] to map names back to module factories.
//!
//! # Example
//!
//! ```ignore
//! use strata_serde::{JsonFormat, ModuleRegistry, load_network, save_network};
//!
//! let registry = ModuleRegistry::with_builtin();
//! let bytes = save_network(modules.iter().map(|(id, m)| (*id, m)), &JsonFormat::pretty())?;
//! let restored = load_network(&bytes, &registry, &JsonFormat::new())?;
//! ```

mod bincode;
mod error;
mod format;
mod json;
mod registry;
mod serial;

pub use crate::bincode::BincodeFormat;
pub use crate::error::SerdeError;
pub use crate::format::StateFormat;
pub use crate::json::JsonFormat;
pub use crate::registry::ModuleRegistry;
pub use crate::serial::{SerialModule, SerialNetwork};

use std::collections::HashSet;

use strata_core::ModuleInstance;

/// Captures one module's configuration.
pub fn module_to_serial(id: u64, instance: &ModuleInstance) -> SerialModule {
    SerialModule::new(id, instance.info().name, instance.state().to_serial())
}

/// Recreates one module from its saved configuration.
pub fn restore_module(
    saved: &SerialModule,
    registry: &ModuleRegistry,
) -> Result<ModuleInstance, SerdeError> {
    let mut instance = registry.create(&saved.module)?;
    instance
        .state_mut()
        .load_serial(&saved.state)
        .map_err(|source| SerdeError::State {
            id: saved.id,
            module: saved.module.clone(),
            source,
        })?;
    Ok(instance)
}

/// Captures the configuration of every module in a network.
pub fn network_to_serial<'a>(
    modules: impl IntoIterator<Item = (u64, &'a ModuleInstance)>,
) -> SerialNetwork {
    SerialNetwork {
        modules: modules
            .into_iter()
            .map(|(id, instance)| module_to_serial(id, instance))
            .collect(),
    }
}

/// Recreates every module of a saved network, in saved order.
///
/// Fails on the first module that is unknown or whose state does not fit
/// its schema; nothing is returned in that case.
pub fn serial_to_network(
    network: &SerialNetwork,
    registry: &ModuleRegistry,
) -> Result<Vec<(u64, ModuleInstance)>, SerdeError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(network.len());
    for saved in &network.modules {
        if !seen.insert(saved.id) {
            return Err(SerdeError::DuplicateId(saved.id));
        }
        out.push((saved.id, restore_module(saved, registry)?));
    }
    log::debug!("restored {} module(s)", out.len());
    Ok(out)
}

/// Serializes a network's configuration to bytes.
pub fn save_network<'a, Fmt: StateFormat>(
    modules: impl IntoIterator<Item = (u64, &'a ModuleInstance)>,
    format: &Fmt,
) -> Result<Vec<u8>, SerdeError> {
    format.encode(&network_to_serial(modules))
}

/// Deserializes bytes and recreates the network's modules.
pub fn load_network<Fmt: StateFormat>(
    bytes: &[u8],
    registry: &ModuleRegistry,
    format: &Fmt,
) -> Result<Vec<(u64, ModuleInstance)>, SerdeError> {
    let network: SerialNetwork = format.decode(bytes)?;
    serial_to_network(&network, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use strata_core::{DenseMatrix, Handle, PortData, SerialState, StateError, Value};
    use strata_field::create_image::{AXIS, INPUT_FIELD, MODE, WIDTH};
    use strata_field::{BasisOrder, DataType, Field, LatVolMesh};
    use strata_math::unary::{INPUT_MATRIX, OPERATOR, RESULT, SCALAR};
    use strata_math::UnaryOperatorCode;

    fn network() -> Vec<(u64, ModuleInstance)> {
        let registry = ModuleRegistry::with_builtin();

        let mut image = registry.create("CreateImage").unwrap();
        image.state_mut().set(&WIDTH, 64).unwrap();
        image.state_mut().set(&AXIS, "Custom").unwrap();

        let mut scale = registry.create("EvaluateLinearAlgebraUnary").unwrap();
        scale
            .state_mut()
            .set(&OPERATOR, UnaryOperatorCode::ScalarMultiply.code())
            .unwrap();
        scale.state_mut().set(&SCALAR, 2.5).unwrap();

        let negate = registry.create("EvaluateLinearAlgebraUnary").unwrap();

        vec![(1, image), (2, scale), (5, negate)]
    }

    fn refs(modules: &[(u64, ModuleInstance)]) -> impl Iterator<Item = (u64, &ModuleInstance)> {
        modules.iter().map(|(id, m)| (*id, m))
    }

    fn assert_same_state(a: &[(u64, ModuleInstance)], b: &[(u64, ModuleInstance)]) {
        assert_eq!(a.len(), b.len());
        for ((ia, ma), (ib, mb)) in a.iter().zip(b) {
            assert_eq!(ia, ib);
            assert_eq!(ma.info().name, mb.info().name);
            assert_eq!(ma.state().to_serial(), mb.state().to_serial());
            assert_eq!(ma.state().fingerprint(), mb.state().fingerprint());
        }
    }

    #[test]
    fn test_roundtrip_json() {
        let before = network();
        let format = JsonFormat::pretty();
        let bytes = save_network(refs(&before), &format).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("CreateImage"));
        assert!(text.contains("\"Custom\""));

        let restored = load_network(&bytes, &ModuleRegistry::with_builtin(), &format).unwrap();
        assert_same_state(&before, &restored);
    }

    #[test]
    fn test_roundtrip_bincode() {
        let before = network();
        let format = BincodeFormat::new();
        let bytes = save_network(refs(&before), &format).unwrap();
        let restored = load_network(&bytes, &ModuleRegistry::with_builtin(), &format).unwrap();
        assert_same_state(&before, &restored);
    }

    #[test]
    fn test_absent_optional_stays_absent() {
        let before = network();
        let serial = network_to_serial(refs(&before));
        let negate = serial.get(5).unwrap();
        assert!(!negate.state.values.contains_key("Scalar"));

        let restored = serial_to_network(&serial, &ModuleRegistry::with_builtin()).unwrap();
        assert_eq!(restored[2].1.state().get_optional_real(&SCALAR).unwrap(), None);
        assert_eq!(restored[1].1.state().get_optional_real(&SCALAR).unwrap(), Some(2.5));
    }

    #[test]
    fn test_restored_module_executes() {
        let before = network();
        let bytes = save_network(refs(&before), &JsonFormat::new()).unwrap();
        let mut restored =
            load_network(&bytes, &ModuleRegistry::with_builtin(), &JsonFormat::new()).unwrap();

        let input = Handle::new(DenseMatrix::from_rows(&[&[2.0, 4.0]]).unwrap());
        let report = restored[1]
            .1
            .execute(&PortData::new().with(INPUT_MATRIX, input))
            .unwrap();
        let out = report.outputs.get_as::<DenseMatrix>(RESULT).unwrap();
        assert_eq!(out.row(0).to_vec(), [5.0, 10.0]);
    }

    #[test]
    fn test_write_back_survives_save() {
        let registry = ModuleRegistry::with_builtin();
        let mut image = registry.create("CreateImage").unwrap();
        image.state_mut().set(&MODE, "Auto").unwrap();
        let mesh = LatVolMesh::new(3, 4, 5, DVec3::ZERO, DVec3::new(2.0, 3.0, 4.0));
        let field = Handle::new(Field::new(mesh.into(), BasisOrder::Linear, DataType::Scalar));
        image
            .execute(&PortData::new().with(INPUT_FIELD, field))
            .unwrap();

        let serial = network_to_serial([(7, &image)]);
        assert_eq!(serial.modules[0].state.values["Width"], Value::Int(4));
        let restored = serial_to_network(&serial, &registry).unwrap();
        assert_eq!(restored[0].1.state().get_int(&WIDTH).unwrap(), 4);
    }

    #[test]
    fn test_unknown_module() {
        let serial = SerialNetwork {
            modules: vec![SerialModule::new(0, "Nope", SerialState::default())],
        };
        let err = serial_to_network(&serial, &ModuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(err, SerdeError::UnknownModule(_)));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut state = SerialState::default();
        state.values.insert("Bogus".into(), Value::Int(1));
        let serial = SerialNetwork {
            modules: vec![SerialModule::new(4, "CreateImage", state)],
        };
        let err = serial_to_network(&serial, &ModuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(
            err,
            SerdeError::State {
                id: 4,
                source: StateError::Undeclared(_),
                ..
            }
        ));
    }

    #[test]
    fn test_bad_option_rejected() {
        let mut state = SerialState::default();
        state.values.insert("Mode".into(), Value::from("Mannual"));
        let saved = SerialModule::new(0, "CreateImage", state);
        let err = restore_module(&saved, &ModuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(
            err,
            SerdeError::State {
                source: StateError::InvalidOption { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let before = network();
        let mut serial = network_to_serial(refs(&before));
        serial.modules[1].id = 1;
        let err = serial_to_network(&serial, &ModuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(err, SerdeError::DuplicateId(1)));
    }
}
