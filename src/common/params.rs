//! Key/value parameter mapping carried by actions, verifications and plan steps.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Ordered JSON object of command parameters.
///
/// Semantics of each key depend on the command and the capability channel that
/// receives it; the core only reads a handful of well-known keys (`wait_time`,
/// `duration`, `target_node`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed read of `key`; `None` when absent or of another shape.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.0.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Read `key` as a string, accepting numbers and booleans as their text form.
    pub fn get_str(
        &self,
        key: &str,
    ) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Read `key` as milliseconds, accepting integers, floats and numeric strings.
    pub fn get_millis(
        &self,
        key: &str,
    ) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64),
            _ => None,
        }
    }

    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn with(
        mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Params(map),
            _ => Params::default(),
        }
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        Value::Object(params.0)
    }
}
