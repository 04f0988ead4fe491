use super::{Variant, WireShape};
use crate::core::AzureError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Typed representation of an arbitrary JSON document.
///
/// Integers, unsigned integers and floats are kept apart so that a tree
/// survives a round trip without numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTree {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Array(Vec<JsonTree>),
    Object(BTreeMap<String, JsonTree>),
}

impl JsonTree {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::from_number(&n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_value).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from_value(value)))
                    .collect(),
            ),
        }
    }

    fn from_number(number: &Number) -> Self {
        if let Some(i) = number.as_i64() {
            Self::Integer(i)
        } else if let Some(u) = number.as_u64() {
            Self::Unsigned(u)
        } else {
            number.as_f64().map_or(Self::Null, Self::Float)
        }
    }

    /// Encodes the tree. Non-finite floats have no JSON form.
    pub fn to_value(&self) -> Result<Value, AzureError> {
        let value = match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Unsigned(u) => Value::from(*u),
            Self::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| AzureError::EncodingError(format!("{f} is not a JSON number")))?,
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Self::to_value)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_value()?)))
                    .collect::<Result<Map<_, _>, AzureError>>()?,
            ),
        };
        Ok(value)
    }

    /// Builds a tree from any serializable value.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, AzureError> {
        serde_json::to_value(value)
            .map(Self::from_value)
            .map_err(|e| AzureError::EncodingError(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }
}

impl Serialize for JsonTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// JSON Schema describing a function's parameters. Always an object.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameters(JsonTree);

impl FunctionParameters {
    pub fn new(schema: JsonTree) -> Result<Self, AzureError> {
        match schema {
            JsonTree::Object(_) => Ok(Self(schema)),
            other => Err(AzureError::EncodingError(format!(
                "function parameters must be a JSON object, got {other:?}"
            ))),
        }
    }

    pub const fn schema(&self) -> &JsonTree {
        &self.0
    }
}

impl TryFrom<Value> for FunctionParameters {
    type Error = AzureError;

    fn try_from(value: Value) -> Result<Self, AzureError> {
        Self::new(JsonTree::from_value(value))
    }
}

impl Variant for FunctionParameters {
    const NAME: &'static str = "FunctionParameters";
    const SHAPES: &'static [WireShape] = &[WireShape::Object];

    fn to_wire(&self) -> Result<Value, AzureError> {
        self.0.to_value()
    }

    fn from_shape(_shape: WireShape, value: &Value) -> Result<Self, AzureError> {
        Self::new(JsonTree::from_value(value.clone()))
    }
}

impl_serde_via_variant!(FunctionParameters);
