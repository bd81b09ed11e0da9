//! Per-module parameter state.
//!
//! A [`ModuleState`] is built once from the module's [`StateSchema`] and holds
//! exactly the declared parameters, starting at their defaults. Reads of
//! undeclared names fail with [`StateError::Undeclared`]; indexing with
//! `state[&NAME]` panics instead, for call sites where a missing declaration
//! can only be a bug.
//!
//! Algorithms never write state directly. They return [`StateUpdates`], which
//! the module applies explicitly after a successful run.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::param::{ParameterName, StateSchema, type_error};
use crate::value::{MatrixHandle, Value};

/// A change to one parameter, delivered to listeners.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Parameter that changed.
    pub name: ParameterName,
    /// Value before the change.
    pub old: Option<Value>,
    /// Value after the change.
    pub new: Option<Value>,
}

/// Identifies a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StateListener = Box<dyn Fn(&StateChange) + Send + Sync>;

/// Proposed parameter writes returned by an algorithm.
///
/// Setting the same name twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdates {
    entries: Vec<(ParameterName, Value)>,
}

impl StateUpdates {
    /// Creates an empty set of updates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Proposes `value` for `name`.
    pub fn set(&mut self, name: &ParameterName, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.clone(), value)),
        }
        self
    }

    /// Returns the proposed value for `name`, if any.
    pub fn get(&self, name: &ParameterName) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates proposals in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, &Value)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    /// Merges `other` into `self`; `other` wins on conflicts.
    pub fn extend(&mut self, other: StateUpdates) {
        for (name, value) in other.entries {
            self.set(&name, value);
        }
    }

    /// Number of proposals.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is proposed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Structured key-value form of a module's state, keyed by parameter name.
///
/// Absent optional parameters are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialState {
    /// Stored values by parameter name.
    pub values: BTreeMap<String, Value>,
}

/// Named, typed configuration for one module instance.
pub struct ModuleState {
    schema: StateSchema,
    values: BTreeMap<ParameterName, Option<Value>>,
    generation: u64,
    listeners: Vec<(SubscriptionId, StateListener)>,
    next_subscription: u64,
}

impl ModuleState {
    /// Creates a state holding every declared parameter at its default.
    pub fn new(schema: StateSchema) -> Self {
        let values = schema
            .iter()
            .map(|spec| (spec.name.clone(), spec.default.clone()))
            .collect();
        Self {
            schema,
            values,
            generation: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The schema this state validates against.
    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Returns the value of `name`.
    ///
    /// Fails for undeclared names and for optional parameters with no value.
    pub fn get(&self, name: &ParameterName) -> Result<&Value, StateError> {
        self.get_optional(name)?
            .ok_or_else(|| StateError::Absent(name.clone()))
    }

    /// Returns the value of `name`, or `None` if it is an empty optional.
    pub fn get_optional(&self, name: &ParameterName) -> Result<Option<&Value>, StateError> {
        self.values
            .get(name)
            .map(Option::as_ref)
            .ok_or_else(|| StateError::Undeclared(name.clone()))
    }

    /// Reads an integer parameter.
    pub fn get_int(&self, name: &ParameterName) -> Result<i64, StateError> {
        self.get(name)?.as_int().map_err(|e| type_error(name, e))
    }

    /// Reads a real parameter. Integer values widen.
    pub fn get_real(&self, name: &ParameterName) -> Result<f64, StateError> {
        self.get(name)?.as_real().map_err(|e| type_error(name, e))
    }

    /// Reads an optional real parameter.
    pub fn get_optional_real(&self, name: &ParameterName) -> Result<Option<f64>, StateError> {
        self.get_optional(name)?
            .map(|v| v.as_real().map_err(|e| type_error(name, e)))
            .transpose()
    }

    /// Reads a bool parameter.
    pub fn get_bool(&self, name: &ParameterName) -> Result<bool, StateError> {
        self.get(name)?.as_bool().map_err(|e| type_error(name, e))
    }

    /// Reads a string parameter.
    pub fn get_string(&self, name: &ParameterName) -> Result<&str, StateError> {
        self.get(name)?.as_str().map_err(|e| type_error(name, e))
    }

    /// Reads an enumerated parameter's current option.
    ///
    /// The option was validated against the declared set when stored.
    pub fn get_option(&self, name: &ParameterName) -> Result<&str, StateError> {
        self.get_string(name)
    }

    /// Reads a matrix parameter. The returned handle shares the stored matrix.
    pub fn get_matrix(&self, name: &ParameterName) -> Result<MatrixHandle, StateError> {
        self.get(name)?.as_matrix().map_err(|e| type_error(name, e))
    }

    /// Stores `value` under `name`.
    ///
    /// Returns `true` if the stored value changed. Listeners are notified only
    /// for actual changes.
    pub fn set(&mut self, name: &ParameterName, value: impl Into<Value>) -> Result<bool, StateError> {
        let value = self.schema.require(name.as_str())?.check(value.into())?;
        Ok(self.store(name, Some(value)))
    }

    /// Removes the value of an optional parameter.
    pub fn clear(&mut self, name: &ParameterName) -> Result<bool, StateError> {
        if !self.schema.require(name.as_str())?.is_optional() {
            return Err(StateError::Required(name.clone()));
        }
        Ok(self.store(name, None))
    }

    /// Checks that every proposal would be accepted, without storing any.
    pub fn validate(&self, updates: &StateUpdates) -> Result<(), StateError> {
        for (name, value) in updates.iter() {
            self.schema.require(name.as_str())?.check(value.clone())?;
        }
        Ok(())
    }

    /// Applies proposed updates atomically: either all are stored or none.
    ///
    /// Returns the number of parameters whose value changed. Applying the
    /// same updates twice changes nothing the second time.
    pub fn apply(&mut self, updates: &StateUpdates) -> Result<usize, StateError> {
        self.validate(updates)?;
        let mut changed = 0;
        for (name, value) in updates.iter() {
            if self.set(name, value.clone())? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Restores every parameter to its declared default.
    pub fn reset_to_defaults(&mut self) {
        let defaults: Vec<_> = self
            .schema
            .iter()
            .map(|spec| (spec.name.clone(), spec.default.clone()))
            .collect();
        for (name, value) in defaults {
            self.store(&name, value);
        }
    }

    /// Counter bumped on every effective change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Content hash of all stored values.
    ///
    /// Equal states produce equal fingerprints regardless of how they were
    /// reached.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (name, value) in &self.values {
            name.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Registers a listener called after each effective change.
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&StateChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, Option<&Value>)> {
        self.values.iter().map(|(n, v)| (n, v.as_ref()))
    }

    /// Converts to the structured key-value form used for persistence.
    pub fn to_serial(&self) -> SerialState {
        SerialState {
            values: self
                .values
                .iter()
                .filter_map(|(n, v)| v.as_ref().map(|v| (n.to_string(), v.clone())))
                .collect(),
        }
    }

    /// Restores the configuration saved in `serial`, verbatim.
    ///
    /// Every entry is validated before anything is stored. Declared
    /// parameters missing from `serial` fall back to their defaults, so
    /// optional parameters saved as absent come back absent.
    pub fn load_serial(&mut self, serial: &SerialState) -> Result<(), StateError> {
        let mut restored = BTreeMap::new();
        for (key, value) in &serial.values {
            let spec = self.schema.require(key)?;
            restored.insert(spec.name.clone(), spec.check(value.clone())?);
        }
        let target: Vec<_> = self
            .schema
            .iter()
            .map(|spec| {
                let value = restored
                    .remove(spec.name.as_str())
                    .or_else(|| spec.default.clone());
                (spec.name.clone(), value)
            })
            .collect();
        for (name, value) in target {
            self.store(&name, value);
        }
        Ok(())
    }

    fn store(&mut self, name: &ParameterName, value: Option<Value>) -> bool {
        let Some(slot) = self.values.get_mut(name) else {
            return false;
        };
        if *slot == value {
            return false;
        }
        let old = std::mem::replace(slot, value.clone());
        self.generation += 1;
        log::debug!(
            "parameter {name}: {} -> {}",
            display_opt(old.as_ref()),
            display_opt(value.as_ref())
        );
        let change = StateChange {
            name: name.clone(),
            old,
            new: value,
        };
        for (_, listener) in &self.listeners {
            listener(&change);
        }
        true
    }
}

fn display_opt(value: Option<&Value>) -> String {
    value.map_or_else(|| "<none>".to_string(), |v| v.to_string())
}

impl Index<&ParameterName> for ModuleState {
    type Output = Value;

    fn index(&self, name: &ParameterName) -> &Value {
        match self.get(name) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl fmt::Debug for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleState")
            .field("values", &self.values)
            .field("generation", &self.generation)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;
    use crate::value::ValueType;
    use std::sync::{Arc, Mutex};

    const WIDTH: ParameterName = ParameterName::new("Width");
    const PAD: ParameterName = ParameterName::new("PadPercent");
    const MODE: ParameterName = ParameterName::new("Mode");
    const SCALAR: ParameterName = ParameterName::new("Scalar");
    const KERNEL: ParameterName = ParameterName::new("Kernel");
    const MISSING: ParameterName = ParameterName::new("Missing");

    fn state() -> ModuleState {
        let mut schema = StateSchema::new();
        schema
            .declare(&WIDTH, 20)
            .declare_real(&PAD, 0.0)
            .declare_option(&MODE, "Manual", &["Manual", "Auto"])
            .declare_optional(&SCALAR, ValueType::Real)
            .declare(&KERNEL, DenseMatrix::identity(2));
        ModuleState::new(schema)
    }

    #[test]
    fn test_defaults_populated() {
        let state = state();
        assert_eq!(state.get_int(&WIDTH).unwrap(), 20);
        assert_eq!(state.get_real(&PAD).unwrap(), 0.0);
        assert_eq!(state.get_option(&MODE).unwrap(), "Manual");
        assert_eq!(state.get_optional_real(&SCALAR).unwrap(), None);
        assert_eq!(state.get_matrix(&KERNEL).unwrap().shape(), (2, 2));
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_undeclared_read_is_logic_fault() {
        let err = state().get(&MISSING).unwrap_err();
        assert!(matches!(err, StateError::Undeclared(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Logic);
    }

    #[test]
    #[should_panic(expected = "before being given a default")]
    fn test_index_undeclared_panics() {
        let state = state();
        let _ = &state[&MISSING];
    }

    #[test]
    fn test_absent_optional_read_as_required() {
        let err = state().get_real(&SCALAR).unwrap_err();
        assert!(matches!(err, StateError::Absent(_)));
    }

    #[test]
    fn test_set_and_change_detection() {
        let mut state = state();
        assert!(state.set(&WIDTH, 32).unwrap());
        assert!(!state.set(&WIDTH, 32).unwrap());
        assert_eq!(state.generation(), 1);
        assert_eq!(state[&WIDTH], Value::Int(32));
    }

    #[test]
    fn test_set_rejects_wrong_type_and_option() {
        let mut state = state();
        assert!(matches!(
            state.set(&WIDTH, "wide"),
            Err(StateError::Type { .. })
        ));
        assert!(matches!(
            state.set(&MODE, "Sideways"),
            Err(StateError::InvalidOption { .. })
        ));
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_set_real_accepts_int() {
        let mut state = state();
        state.set(&PAD, 5).unwrap();
        assert_eq!(state[&PAD], Value::Real(5.0));
    }

    #[test]
    fn test_clear_only_optional() {
        let mut state = state();
        state.set(&SCALAR, 2.5).unwrap();
        assert!(state.clear(&SCALAR).unwrap());
        assert_eq!(state.get_optional_real(&SCALAR).unwrap(), None);
        assert!(matches!(state.clear(&WIDTH), Err(StateError::Required(_))));
    }

    #[test]
    fn test_listeners_see_changes() {
        let mut state = state();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = state.subscribe(move |change| {
            sink.lock().unwrap().push(change.name.to_string());
        });

        state.set(&WIDTH, 40).unwrap();
        state.set(&WIDTH, 40).unwrap();
        state.set(&MODE, "Auto").unwrap();
        assert!(state.unsubscribe(id));
        state.set(&WIDTH, 41).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["Width", "Mode"]);
        assert!(!state.unsubscribe(id));
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut state = state();
        let mut updates = StateUpdates::new();
        updates.set(&WIDTH, 64).set(&MODE, "Bogus");
        assert!(state.apply(&updates).is_err());
        assert_eq!(state.get_int(&WIDTH).unwrap(), 20);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut state = state();
        let mut updates = StateUpdates::new();
        updates.set(&WIDTH, 64).set(&MODE, "Auto");
        assert_eq!(state.apply(&updates).unwrap(), 2);
        let fingerprint = state.fingerprint();
        assert_eq!(state.apply(&updates).unwrap(), 0);
        assert_eq!(state.fingerprint(), fingerprint);
    }

    #[test]
    fn test_updates_last_write_wins() {
        let mut updates = StateUpdates::new();
        updates.set(&WIDTH, 1).set(&WIDTH, 2);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates.get(&WIDTH), Some(&Value::Int(2)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut a = state();
        let b = state();
        assert_eq!(a.fingerprint(), b.fingerprint());
        a.set(&WIDTH, 21).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        a.set(&WIDTH, 20).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut state = state();
        state.set(&WIDTH, 3).unwrap();
        state.set(&SCALAR, 1.0).unwrap();
        state.reset_to_defaults();
        assert_eq!(state.get_int(&WIDTH).unwrap(), 20);
        assert_eq!(state.get_optional_real(&SCALAR).unwrap(), None);
    }

    #[test]
    fn test_serial_roundtrip_verbatim() {
        let mut state = state();
        state.set(&WIDTH, 7).unwrap();
        state.set(&MODE, "Auto").unwrap();
        state.set(&SCALAR, 0.5).unwrap();

        let json = serde_json::to_string(&state.to_serial()).unwrap();
        let serial: SerialState = serde_json::from_str(&json).unwrap();

        let mut restored = self::state();
        restored.load_serial(&serial).unwrap();
        assert_eq!(restored.fingerprint(), state.fingerprint());

        state.clear(&SCALAR).unwrap();
        restored.load_serial(&state.to_serial()).unwrap();
        assert_eq!(restored.get_optional_real(&SCALAR).unwrap(), None);
    }

    #[test]
    fn test_load_serial_rejects_unknown_key() {
        let mut serial = SerialState::default();
        serial.values.insert("Width".into(), Value::Int(5));
        serial.values.insert("Nope".into(), Value::Int(5));

        let mut state = state();
        assert!(matches!(
            state.load_serial(&serial),
            Err(StateError::Undeclared(_))
        ));
        assert_eq!(state.get_int(&WIDTH).unwrap(), 20);
    }
}
