//! Parameter identifiers and the per-module parameter schema.
//!
//! Every module declares the parameters it will ever read in
//! [`Module::set_state_defaults`](crate::Module::set_state_defaults). The
//! resulting [`StateSchema`] is the registry [`ModuleState`](crate::ModuleState)
//! validates against: a parameter that was never declared cannot be read or
//! written, stored values keep the declared type, and enumerated string
//! parameters only accept their declared options.

use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{StateError, TypeError};
use crate::value::{Value, ValueType};

/// Immutable, string-backed parameter identifier.
///
/// Two names are the same parameter when their text is equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterName(Cow<'static, str>);

impl ParameterName {
    /// Creates a name from a static string. Usable in `const` items.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a name from runtime text, e.g. when loading saved state.
    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterName({})", self.0)
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ParameterName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for ParameterName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ParameterName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ParameterName::owned)
    }
}

/// Declaration of one parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: ParameterName,
    /// Declared value type.
    pub value_type: ValueType,
    /// Default value. `None` only for optional parameters.
    pub default: Option<Value>,
    /// Legal options for enumerated string parameters.
    pub options: Option<&'static [&'static str]>,
}

impl ParameterSpec {
    /// Returns true if the parameter may hold no value.
    pub fn is_optional(&self) -> bool {
        self.default.is_none()
    }

    /// Validates a candidate value and converts it to the declared type.
    pub fn check(&self, value: Value) -> Result<Value, StateError> {
        let value = value.coerce(self.value_type).map_err(|source| StateError::Type {
            name: self.name.clone(),
            source,
        })?;
        if let (Some(options), Value::String(s)) = (self.options, &value)
            && !options.contains(&s.as_str())
        {
            return Err(StateError::InvalidOption {
                name: self.name.clone(),
                value: s.clone(),
                options: options.to_vec(),
            });
        }
        Ok(value)
    }
}

/// The set of parameters a module declares, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    specs: BTreeMap<ParameterName, ParameterSpec>,
}

impl StateSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter with a default; its type is the default's type.
    ///
    /// Declaring the same name again replaces the earlier declaration.
    pub fn declare(&mut self, name: &ParameterName, default: impl Into<Value>) -> &mut Self {
        let default = default.into();
        self.insert(ParameterSpec {
            name: name.clone(),
            value_type: default.value_type(),
            default: Some(default),
            options: None,
        })
    }

    /// Declares a real-valued parameter. Integer literals are widened.
    pub fn declare_real(&mut self, name: &ParameterName, default: f64) -> &mut Self {
        self.declare(name, default)
    }

    /// Declares an enumerated string parameter with its closed option set.
    pub fn declare_option(
        &mut self,
        name: &ParameterName,
        default: &'static str,
        options: &'static [&'static str],
    ) -> &mut Self {
        debug_assert!(
            options.contains(&default),
            "default {default:?} for {name} is not one of {options:?}"
        );
        self.insert(ParameterSpec {
            name: name.clone(),
            value_type: ValueType::String,
            default: Some(Value::String(default.to_string())),
            options: Some(options),
        })
    }

    /// Declares a parameter that starts with no value.
    pub fn declare_optional(&mut self, name: &ParameterName, value_type: ValueType) -> &mut Self {
        self.insert(ParameterSpec {
            name: name.clone(),
            value_type,
            default: None,
            options: None,
        })
    }

    /// Looks up a declaration.
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.get(name)
    }

    /// Looks up a declaration, failing for undeclared names.
    pub fn require(&self, name: &str) -> Result<&ParameterSpec, StateError> {
        self.get(name)
            .ok_or_else(|| StateError::Undeclared(ParameterName::owned(name)))
    }

    /// Returns true if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Iterates declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.values()
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn insert(&mut self, spec: ParameterSpec) -> &mut Self {
        if self.specs.contains_key(spec.name.as_str()) {
            log::debug!("redeclaring parameter {}", spec.name);
        }
        self.specs.insert(spec.name.clone(), spec);
        self
    }
}

/// Converts a type error on `name` into a state error.
pub(crate) fn type_error(name: &ParameterName, source: TypeError) -> StateError {
    StateError::Type {
        name: name.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: ParameterName = ParameterName::new("Width");
    const SCALE: ParameterName = ParameterName::new("Scale");
    const MODE: ParameterName = ParameterName::new("Mode");
    const SCALAR: ParameterName = ParameterName::new("Scalar");

    fn schema() -> StateSchema {
        let mut schema = StateSchema::new();
        schema
            .declare(&WIDTH, 20)
            .declare_real(&SCALE, 1.0)
            .declare_option(&MODE, "Manual", &["Manual", "Auto"])
            .declare_optional(&SCALAR, ValueType::Real);
        schema
    }

    #[test]
    fn test_names_compare_by_text() {
        assert_eq!(ParameterName::new("Width"), ParameterName::owned("Width"));
        assert_ne!(WIDTH, SCALE);
    }

    #[test]
    fn test_name_serializes_as_string() {
        let json = serde_json::to_string(&WIDTH).unwrap();
        assert_eq!(json, "\"Width\"");
        let back: ParameterName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WIDTH);
    }

    #[test]
    fn test_declared_types() {
        let schema = schema();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.get("Width").unwrap().value_type, ValueType::Int);
        assert_eq!(schema.get("Scale").unwrap().value_type, ValueType::Real);
        assert!(schema.get("Scalar").unwrap().is_optional());
        assert!(schema.get("Missing").is_none());
    }

    #[test]
    fn test_require_undeclared() {
        let err = schema().require("Missing").unwrap_err();
        assert!(matches!(err, StateError::Undeclared(_)));
    }

    #[test]
    fn test_check_coerces_int_to_real() {
        let schema = schema();
        let v = schema.get("Scale").unwrap().check(Value::Int(3)).unwrap();
        assert_eq!(v, Value::Real(3.0));
    }

    #[test]
    fn test_check_rejects_wrong_type() {
        let schema = schema();
        let err = schema.get("Width").unwrap().check(Value::Bool(true)).unwrap_err();
        assert!(matches!(err, StateError::Type { .. }));
    }

    #[test]
    fn test_check_rejects_unknown_option() {
        let schema = schema();
        let spec = schema.get("Mode").unwrap();
        assert!(spec.check(Value::from("Auto")).is_ok());
        let err = spec.check(Value::from("Mannual")).unwrap_err();
        assert!(matches!(err, StateError::InvalidOption { .. }));
    }

    #[test]
    fn test_redeclare_replaces() {
        let mut schema = schema();
        schema.declare(&WIDTH, 64);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.get("Width").unwrap().default, Some(Value::Int(64)));
    }
}
