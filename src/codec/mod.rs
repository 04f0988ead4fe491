//! Shape-driven codec for fields with more than one legal wire representation.
//!
//! Encoding is tag-driven: each variant maps to exactly one JSON shape.
//! Decoding probes shapes in the fixed order of [`SHAPE_PRIORITY`] and
//! accepts the first structural decode that succeeds. The order is part of
//! the wire contract.

use crate::core::AzureError;
use log::trace;
use serde_json::Value;

macro_rules! impl_serde_via_variant {
    ($($ty:ty),+ $(,)?) => {$(
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let wire = $crate::codec::Variant::to_wire(self).map_err(serde::ser::Error::custom)?;
                serde::Serialize::serialize(&wire, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                $crate::codec::decode_variant(value).map_err(serde::de::Error::custom)
            }
        }
    )+};
}

mod embedding;
mod json_tree;
mod variants;

pub use embedding::{EmbeddingInput, EmbeddingVector};
pub use json_tree::{FunctionParameters, JsonTree};
pub use variants::{ContentPart, ImageDetail, ImageUrl, MessageContent, StopSequences, ToolChoice};

/// Candidate wire shapes for a polymorphic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    String,
    Number,
    Bool,
    StringArray,
    NumberArray,
    NestedNumberArray,
    ObjectArray,
    Object,
}

/// Order in which shapes are probed while decoding.
pub const SHAPE_PRIORITY: [WireShape; 8] = [
    WireShape::String,
    WireShape::Number,
    WireShape::Bool,
    WireShape::StringArray,
    WireShape::NumberArray,
    WireShape::NestedNumberArray,
    WireShape::ObjectArray,
    WireShape::Object,
];

impl WireShape {
    /// Structural test only. Empty arrays match every array shape.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::StringArray => all_elements(value, Value::is_string),
            Self::NumberArray => all_elements(value, Value::is_number),
            Self::NestedNumberArray => {
                all_elements(value, |inner| all_elements(inner, Value::is_number))
            }
            Self::ObjectArray => all_elements(value, Value::is_object),
            Self::Object => value.is_object(),
        }
    }
}

fn all_elements(value: &Value, predicate: impl Fn(&Value) -> bool) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(predicate))
}

/// A value with a closed set of wire shapes and no discriminator tag.
pub trait Variant: Sized {
    /// Name used in `UnrecognizedShape` errors
    const NAME: &'static str;
    /// Shapes this type may appear as on the wire
    const SHAPES: &'static [WireShape];

    /// Emits the single JSON shape that corresponds to this variant's tag.
    fn to_wire(&self) -> Result<Value, AzureError>;

    /// Structurally decodes `value`, which is known to match `shape`.
    fn from_shape(shape: WireShape, value: &Value) -> Result<Self, AzureError>;
}

/// Decodes `value` by walking [`SHAPE_PRIORITY`] and returning the first
/// accepted shape whose structural decode succeeds.
pub fn decode_variant<T: Variant>(value: Value) -> Result<T, AzureError> {
    for shape in SHAPE_PRIORITY {
        if !T::SHAPES.contains(&shape) || !shape.matches(&value) {
            continue;
        }
        match T::from_shape(shape, &value) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => trace!("{} rejected {shape:?}: {e}", T::NAME),
        }
    }
    Err(AzureError::unrecognized(T::NAME, &value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_order_is_fixed() {
        assert_eq!(SHAPE_PRIORITY[0], WireShape::String);
        assert_eq!(SHAPE_PRIORITY[3], WireShape::StringArray);
        assert_eq!(SHAPE_PRIORITY[SHAPE_PRIORITY.len() - 1], WireShape::Object);
    }

    #[test]
    fn test_shape_matching() {
        assert!(WireShape::String.matches(&json!("a")));
        assert!(!WireShape::String.matches(&json!(["a"])));
        assert!(WireShape::NumberArray.matches(&json!([1, 2.5])));
        assert!(!WireShape::NumberArray.matches(&json!([1, "2"])));
        assert!(WireShape::NestedNumberArray.matches(&json!([[1], [2, 3]])));
        assert!(!WireShape::NestedNumberArray.matches(&json!([1, [2]])));
        assert!(WireShape::ObjectArray.matches(&json!([{"a": 1}])));
        assert!(WireShape::Object.matches(&json!({})));
        assert!(!WireShape::Object.matches(&json!(null)));
    }

    #[test]
    fn test_empty_array_matches_string_array_first() {
        let empty = json!([]);
        let first = SHAPE_PRIORITY
            .into_iter()
            .find(|shape| shape.matches(&empty));
        assert_eq!(first, Some(WireShape::StringArray));
    }

    #[test]
    fn test_unaccepted_shape_is_unrecognized() {
        let err = decode_variant::<StopSequences>(json!(42)).unwrap_err();
        assert!(matches!(
            err,
            AzureError::UnrecognizedShape {
                type_name: "StopSequences",
                ..
            }
        ));
    }
}
